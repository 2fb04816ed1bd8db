use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::StepId;
use crate::model::profile::{StudentProfile, Theme};

//
// ─── COLORS ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Linear interpolation towards `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let value = f32::from(a) + (f32::from(b) - f32::from(a)) * t;
            // Bounded by the two channel values, both within u8.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let channel = value.round() as u8;
            channel
        };
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rgb({})", self.to_hex())
    }
}

//
// ─── TIER & PALETTE ────────────────────────────────────────────────────────────
//

/// Certificate variant. Golden is reserved for a perfect score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateTier {
    Standard,
    Golden,
}

impl CertificateTier {
    #[must_use]
    pub fn for_score(score: u32, max_possible_score: u32) -> Self {
        if score == max_possible_score {
            CertificateTier::Golden
        } else {
            CertificateTier::Standard
        }
    }

    #[must_use]
    pub fn is_golden(self) -> bool {
        self == CertificateTier::Golden
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            CertificateTier::Standard => "Certificate of Completion",
            CertificateTier::Golden => "Certificate of Excellence (Gold)",
        }
    }

    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            CertificateTier::Standard => Palette {
                primary: Rgb::new(0x37, 0x76, 0xAB),
                secondary: Rgb::new(0xFF, 0xD4, 0x3B),
                dark_text: DARK_TEXT,
                light_text: LIGHT_TEXT,
                background: BackgroundStyle::Flat(Rgb::new(0xF0, 0xF8, 0xFF)),
            },
            CertificateTier::Golden => Palette {
                primary: Rgb::new(0xD4, 0xAF, 0x37),
                secondary: Rgb::new(0xFF, 0xD7, 0x00),
                dark_text: DARK_TEXT,
                light_text: LIGHT_TEXT,
                background: BackgroundStyle::VerticalGradient {
                    top: Rgb::new(0xFF, 0xF8, 0xE1),
                    bottom: Rgb::new(0xFF, 0xE0, 0x82),
                },
            },
        }
    }
}

const DARK_TEXT: Rgb = Rgb::new(0x21, 0x25, 0x29);
const LIGHT_TEXT: Rgb = Rgb::new(0x6C, 0x75, 0x7D);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStyle {
    Flat(Rgb),
    VerticalGradient { top: Rgb, bottom: Rgb },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub dark_text: Rgb,
    pub light_text: Rgb,
    pub background: BackgroundStyle,
}

//
// ─── REQUEST & REGISTRY ────────────────────────────────────────────────────────
//

/// Read-only view assembled from the progress store at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub profile: StudentProfile,
    pub score: u32,
    pub max_possible_score: u32,
    pub issued_at: DateTime<Utc>,
}

impl CertificateRequest {
    #[must_use]
    pub fn tier(&self) -> CertificateTier {
        CertificateTier::for_score(self.score, self.max_possible_score)
    }
}

/// Snapshot stored for every student a certificate was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub student_info: StudentProfile,
    pub player_score: u32,
    pub unlocked_step: StepId,
    pub research_notes: String,
    pub selected_theme: Theme,
    pub last_completion_date: DateTime<Utc>,
}

/// Local certificate log, one entry per student name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateRegistry(Vec<RegistryEntry>);

impl CertificateRegistry {
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.0
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RegistryEntry> {
        self.0.iter().find(|e| e.student_info.name() == name)
    }

    /// Replaces the entry with the same student name, or appends a new one.
    pub fn upsert(&mut self, entry: RegistryEntry) {
        match self
            .0
            .iter_mut()
            .find(|e| e.student_info.name() == entry.student_info.name())
        {
            Some(existing) => *existing = entry,
            None => self.0.push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn entry(name: &str, score: u32) -> RegistryEntry {
        RegistryEntry {
            student_info: StudentProfile::new(name, 30, "🐍", "beginner", "web").unwrap(),
            player_score: score,
            unlocked_step: StepId::new(16),
            research_notes: String::new(),
            selected_theme: Theme::Light,
            last_completion_date: fixed_now(),
        }
    }

    #[test]
    fn golden_only_on_exact_max() {
        assert_eq!(CertificateTier::for_score(160, 160), CertificateTier::Golden);
        assert_eq!(CertificateTier::for_score(159, 160), CertificateTier::Standard);
        assert_eq!(CertificateTier::for_score(0, 160), CertificateTier::Standard);
    }

    #[test]
    fn palettes_pick_background_strategy() {
        assert!(matches!(
            CertificateTier::Golden.palette().background,
            BackgroundStyle::VerticalGradient { .. }
        ));
        assert!(matches!(
            CertificateTier::Standard.palette().background,
            BackgroundStyle::Flat(_)
        ));
        assert_eq!(CertificateTier::Golden.palette().primary.to_hex(), "#D4AF37");
    }

    #[test]
    fn lerp_hits_endpoints() {
        let a = Rgb::new(0, 100, 200);
        let b = Rgb::new(100, 200, 0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgb::new(50, 150, 100));
    }

    #[test]
    fn registry_upserts_by_name() {
        let mut registry = CertificateRegistry::default();
        registry.upsert(entry("Ada", 100));
        registry.upsert(entry("Grace", 120));
        registry.upsert(entry("Ada", 160));

        assert_eq!(registry.entries().len(), 2);
        assert_eq!(registry.find("Ada").unwrap().player_score, 160);
    }
}
