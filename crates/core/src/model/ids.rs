use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One-based index of a lesson step.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(u32);

impl StepId {
    /// The first step of every lesson; also the lowest legal watermark.
    pub const FIRST: StepId = StepId(1);

    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The step that unlocking `self` grants access to.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Identifier of a trackable activity, unique across the whole lesson.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(u32);

impl ActivityId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepId({})", self.0)
    }
}

impl fmt::Debug for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for StepId {
    type Err = ParseIdError;

    /// Accepts both `7` and the anchor form `step-7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw.strip_prefix("#").unwrap_or(raw);
        let raw = raw.strip_prefix("step-").unwrap_or(raw);
        raw.parse::<u32>()
            .map(StepId::new)
            .map_err(|_| ParseIdError { kind: "StepId" })
    }
}

impl FromStr for ActivityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(ActivityId::new)
            .map_err(|_| ParseIdError { kind: "ActivityId" })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_parses_anchor_form() {
        let id: StepId = "#step-5".parse().unwrap();
        assert_eq!(id, StepId::new(5));
        let id: StepId = "12".parse().unwrap();
        assert_eq!(id, StepId::new(12));
    }

    #[test]
    fn step_id_rejects_garbage() {
        assert!("step-".parse::<StepId>().is_err());
        assert!("intro".parse::<StepId>().is_err());
    }

    #[test]
    fn next_step_saturates() {
        assert_eq!(StepId::new(3).next(), StepId::new(4));
        assert_eq!(StepId::new(u32::MAX).next(), StepId::new(u32::MAX));
    }

    #[test]
    fn activity_id_display_and_parse() {
        let id = ActivityId::new(1101);
        assert_eq!(id.to_string(), "1101");
        assert_eq!("1101".parse::<ActivityId>().unwrap(), id);
        assert!("x".parse::<ActivityId>().is_err());
    }
}
