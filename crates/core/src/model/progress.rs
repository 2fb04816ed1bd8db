use chrono::{DateTime, Utc};

use crate::model::bonus::TimeBonus;
use crate::model::ids::StepId;
use crate::model::profile::{SatisfactionRating, StudentProfile, Theme};

/// Everything the progress store knows about the learner, read in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub unlocked_step: StepId,
    pub score: u32,
    pub student_profile: Option<StudentProfile>,
    pub research_notes: String,
    pub theme: Theme,
    pub course_start_time: Option<DateTime<Utc>>,
    pub completion_time_seconds: Option<u64>,
    pub satisfaction_rating: SatisfactionRating,
    pub time_bonus: Option<TimeBonus>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            unlocked_step: StepId::FIRST,
            score: 0,
            student_profile: None,
            research_notes: String::new(),
            theme: Theme::Light,
            course_start_time: None,
            completion_time_seconds: None,
            satisfaction_rating: SatisfactionRating::UNRATED,
            time_bonus: None,
        }
    }
}

impl ProgressSnapshot {
    #[must_use]
    pub fn student_name(&self) -> Option<&str> {
        self.student_profile.as_ref().map(StudentProfile::name)
    }

    #[must_use]
    pub fn final_results(&self) -> FinalResults {
        FinalResults {
            score: self.score,
            completion_time_seconds: self.completion_time_seconds,
        }
    }
}

/// Data shown on the closing results panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalResults {
    pub score: u32,
    pub completion_time_seconds: Option<u64>,
}

impl FinalResults {
    #[must_use]
    pub fn score_display(&self) -> String {
        format!("{} Points", self.score)
    }

    /// `mm:ss`, or `None` when the course timer never finished.
    #[must_use]
    pub fn time_display(&self) -> Option<String> {
        self.completion_time_seconds
            .map(|secs| format!("{:02}:{:02}", secs / 60, secs % 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_starts_at_first_step() {
        let snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.unlocked_step, StepId::FIRST);
        assert_eq!(snapshot.student_name(), None);
    }

    #[test]
    fn final_results_formatting() {
        let results = FinalResults {
            score: 140,
            completion_time_seconds: Some(1865),
        };
        assert_eq!(results.score_display(), "140 Points");
        assert_eq!(results.time_display().as_deref(), Some("31:05"));

        let unfinished = FinalResults {
            score: 0,
            completion_time_seconds: None,
        };
        assert_eq!(unfinished.time_display(), None);
    }
}
