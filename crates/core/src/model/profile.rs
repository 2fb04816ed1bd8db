use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("student name cannot be empty")]
    EmptyName,

    #[error("student age must be between 1 and 120, got {0}")]
    InvalidAge(u32),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("satisfaction rating must be between 1 and 5, got {0}")]
    OutOfRange(u8),
}

//
// ─── STUDENT PROFILE ───────────────────────────────────────────────────────────
//

/// Answers collected by the welcome form.
///
/// Serialized with camelCase keys so previously stored profiles keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    name: String,
    age: u32,
    avatar: String,
    experience_level: String,
    interest_area: String,
}

impl StudentProfile {
    /// Validates and builds a profile. The name is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyName` for a blank name and
    /// `ProfileError::InvalidAge` for an age outside `1..=120`.
    pub fn new(
        name: impl Into<String>,
        age: u32,
        avatar: impl Into<String>,
        experience_level: impl Into<String>,
        interest_area: impl Into<String>,
    ) -> Result<Self, ProfileError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if !(1..=120).contains(&age) {
            return Err(ProfileError::InvalidAge(age));
        }
        Ok(Self {
            name,
            age,
            avatar: avatar.into(),
            experience_level: experience_level.into(),
            interest_area: interest_area.into(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    #[must_use]
    pub fn experience_level(&self) -> &str {
        &self.experience_level
    }

    #[must_use]
    pub fn interest_area(&self) -> &str {
        &self.interest_area
    }
}

//
// ─── THEME ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ProfileError::UnknownTheme(other.to_owned())),
        }
    }
}

//
// ─── SATISFACTION RATING ───────────────────────────────────────────────────────
//

/// Star rating from the closing survey. Zero means "not rated yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SatisfactionRating(u8);

impl SatisfactionRating {
    pub const UNRATED: SatisfactionRating = SatisfactionRating(0);

    /// A submitted rating, `1..=5`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` outside `1..=5`.
    pub fn new(stars: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RatingError::OutOfRange(stars))
        }
    }

    /// Rehydrate a stored value, accepting the unrated `0`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` above 5.
    pub fn from_persisted(stars: u8) -> Result<Self, RatingError> {
        if stars == 0 {
            Ok(Self::UNRATED)
        } else {
            Self::new(stars)
        }
    }

    #[must_use]
    pub fn stars(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Poor 😠",
            2 => "Fair 😐",
            3 => "Good 🙂",
            4 => "Very good 😄",
            5 => "Excellent! 🤩",
            _ => "Click to rate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_trims_name_and_validates() {
        let profile = StudentProfile::new("  Ada Lovelace ", 28, "🐍", "beginner", "backend").unwrap();
        assert_eq!(profile.name(), "Ada Lovelace");

        let err = StudentProfile::new("   ", 28, "🐍", "beginner", "backend").unwrap_err();
        assert_eq!(err, ProfileError::EmptyName);

        let err = StudentProfile::new("Ada", 0, "🐍", "beginner", "backend").unwrap_err();
        assert_eq!(err, ProfileError::InvalidAge(0));
    }

    #[test]
    fn profile_uses_camel_case_keys() {
        let profile = StudentProfile::new("Ada", 28, "🐍", "beginner", "backend").unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"experienceLevel\":\"beginner\""));
        assert!(json.contains("\"interestArea\":\"backend\""));
    }

    #[test]
    fn theme_parses_and_toggles() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[test]
    fn rating_bounds() {
        assert!(SatisfactionRating::new(0).is_err());
        assert!(SatisfactionRating::new(6).is_err());
        assert_eq!(SatisfactionRating::new(5).unwrap().label(), "Excellent! 🤩");
        assert_eq!(SatisfactionRating::from_persisted(0).unwrap(), SatisfactionRating::UNRATED);
        assert_eq!(SatisfactionRating::UNRATED.label(), "Click to rate");
    }
}
