use std::collections::BTreeSet;

use crate::model::ids::{ActivityId, StepId};

/// Lifecycle of a step inside one lesson session.
///
/// ```text
/// Locked ──first interaction──▶ InProgress ──aggregator──▶ Completed ──unlock──▶ Unlocked
/// ```
///
/// `Unlocked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Locked,
    InProgress,
    Completed,
    Unlocked,
}

/// Per-session completion state of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepState {
    id: StepId,
    total_activities: u32,
    completed: BTreeSet<ActivityId>,
    phase: StepPhase,
    active: bool,
}

impl StepState {
    #[must_use]
    pub fn new(id: StepId, total_activities: u32) -> Self {
        Self {
            id,
            total_activities,
            completed: BTreeSet::new(),
            phase: StepPhase::Locked,
            active: false,
        }
    }

    /// A step the learner already passed in an earlier session.
    #[must_use]
    pub fn already_unlocked(id: StepId, total_activities: u32) -> Self {
        Self {
            phase: StepPhase::Unlocked,
            ..Self::new(id, total_activities)
        }
    }

    #[must_use]
    pub fn id(&self) -> StepId {
        self.id
    }

    #[must_use]
    pub fn total_activities(&self) -> u32 {
        self.total_activities
    }

    #[must_use]
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.phase == StepPhase::Unlocked
    }

    /// Whether the unlock control for this step may be used.
    #[must_use]
    pub fn can_unlock(&self) -> bool {
        matches!(self.phase, StepPhase::Completed | StepPhase::Unlocked)
    }

    #[must_use]
    pub fn completed_activities(&self) -> &BTreeSet<ActivityId> {
        &self.completed
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn is_activity_completed(&self, activity: ActivityId) -> bool {
        self.completed.contains(&activity)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Records a completed activity. Returns `false` when it was already recorded.
    pub fn record_completion(&mut self, activity: ActivityId) -> bool {
        self.touch();
        self.completed.insert(activity)
    }

    /// Locked → InProgress on first interaction.
    pub fn touch(&mut self) {
        if self.phase == StepPhase::Locked {
            self.phase = StepPhase::InProgress;
        }
    }

    /// Applies a completion signal. Returns `true` when the phase changed.
    pub fn mark_completed(&mut self) -> bool {
        match self.phase {
            StepPhase::Locked | StepPhase::InProgress => {
                self.phase = StepPhase::Completed;
                true
            }
            StepPhase::Completed | StepPhase::Unlocked => false,
        }
    }

    pub fn mark_unlocked(&mut self) {
        self.phase = StepPhase::Unlocked;
    }

    /// Clears completions and returns to `InProgress`. No effect on unlocked steps.
    pub fn reset(&mut self) -> bool {
        if self.phase == StepPhase::Unlocked {
            return false;
        }
        self.completed.clear();
        self.phase = StepPhase::InProgress;
        true
    }
}
