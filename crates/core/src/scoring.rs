//! Point values shared by the progression and assessment rules.

use crate::model::ActivityRecord;

/// Awarded for the first correct, unrevealed answer of a scored activity.
pub const POINTS_PER_ACTIVITY: u32 = 10;

/// Awarded for every genuine step unlock.
pub const POINTS_PER_STEP: u32 = 10;

/// Points a freshly completed activity earns.
///
/// Only scored activities earn anything, and only when judged correct without
/// a prior reveal. Repeat completions never reach this function.
#[must_use]
pub fn activity_award(record: &ActivityRecord, scored: bool) -> u32 {
    if scored {
        record.awardable_points(POINTS_PER_ACTIVITY)
    } else {
        0
    }
}

/// Applies a signed delta to a score without going below zero.
#[must_use]
pub fn apply_delta(score: u32, delta: i64) -> u32 {
    let next = i64::from(score).saturating_add(delta).max(0);
    u32::try_from(next).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityId, ActivityKind};

    #[test]
    fn unscored_activity_awards_nothing() {
        let mut record = ActivityRecord::new(ActivityId::new(1), ActivityKind::DragDrop);
        record.record_judgement(true);
        assert_eq!(activity_award(&record, false), 0);
        assert_eq!(activity_award(&record, true), POINTS_PER_ACTIVITY);
    }

    #[test]
    fn score_delta_is_clamped() {
        assert_eq!(apply_delta(30, -50), 0);
        assert_eq!(apply_delta(30, 20), 50);
        assert_eq!(apply_delta(u32::MAX, 1), u32::MAX);
    }
}
