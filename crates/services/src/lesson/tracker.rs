use std::collections::{BTreeMap, HashMap};

use lesson_core::model::{ActivityId, ActivityKind, ActivityRecord, StepId, StepState};

use crate::plan::LessonPlan;

/// Result of [`ActivityTracker::mark_completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The activity just became completed; the step needs re-evaluation.
    Marked,
    AlreadyCompleted,
    /// The step or activity is not part of the lesson.
    Unknown,
}

/// Per-session bookkeeping of which activities are done, grouped by step.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    steps: BTreeMap<StepId, StepState>,
    records: HashMap<ActivityId, ActivityRecord>,
    owners: HashMap<ActivityId, StepId>,
}

impl ActivityTracker {
    /// Builds step states from the plan. Steps below `watermark` were passed in
    /// an earlier session and start out unlocked.
    #[must_use]
    pub fn from_plan(plan: &LessonPlan, watermark: StepId) -> Self {
        let mut steps = BTreeMap::new();
        let mut records = HashMap::new();
        let mut owners = HashMap::new();
        for step in &plan.steps {
            let total = step.declared_total();
            let state = if step.id < watermark {
                StepState::already_unlocked(step.id, total)
            } else {
                StepState::new(step.id, total)
            };
            steps.insert(step.id, state);
            for activity in &step.activities {
                records.insert(
                    activity.id,
                    ActivityRecord::new(activity.id, activity.widget.kind()),
                );
                owners.insert(activity.id, step.id);
            }
        }
        Self {
            steps,
            records,
            owners,
        }
    }

    #[must_use]
    pub fn step(&self, step: StepId) -> Option<&StepState> {
        self.steps.get(&step)
    }

    pub fn step_mut(&mut self, step: StepId) -> Option<&mut StepState> {
        self.steps.get_mut(&step)
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepState> {
        self.steps.values()
    }

    #[must_use]
    pub fn record(&self, activity: ActivityId) -> Option<&ActivityRecord> {
        self.records.get(&activity)
    }

    pub fn record_mut(&mut self, activity: ActivityId) -> Option<&mut ActivityRecord> {
        self.records.get_mut(&activity)
    }

    #[must_use]
    pub fn step_of(&self, activity: ActivityId) -> Option<StepId> {
        self.owners.get(&activity).copied()
    }

    #[must_use]
    pub fn kind_of(&self, activity: ActivityId) -> Option<ActivityKind> {
        self.records.get(&activity).map(ActivityRecord::kind)
    }

    #[must_use]
    pub fn is_completed(&self, step: StepId, activity: ActivityId) -> bool {
        self.steps
            .get(&step)
            .is_some_and(|s| s.is_activity_completed(activity))
    }

    /// Marks `activity` of `step` as completed. Idempotent.
    pub fn mark_completed(&mut self, step: StepId, activity: ActivityId) -> MarkOutcome {
        if self.owners.get(&activity) != Some(&step) {
            return MarkOutcome::Unknown;
        }
        let (Some(state), Some(record)) =
            (self.steps.get_mut(&step), self.records.get_mut(&activity))
        else {
            return MarkOutcome::Unknown;
        };
        record.mark_completed();
        if state.record_completion(activity) {
            MarkOutcome::Marked
        } else {
            MarkOutcome::AlreadyCompleted
        }
    }

    /// Records of the activities belonging to `step`, in id order.
    #[must_use]
    pub fn records_of(&self, step: StepId) -> Vec<&ActivityRecord> {
        let mut records: Vec<&ActivityRecord> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == step)
            .filter_map(|(id, _)| self.records.get(id))
            .collect();
        records.sort_by_key(|r| r.id());
        records
    }

    /// Clears completions of `step` and its activity records. Returns `false`
    /// for unknown or already unlocked steps.
    pub fn reset_step(&mut self, step: StepId) -> bool {
        let Some(state) = self.steps.get_mut(&step) else {
            return false;
        };
        if !state.reset() {
            return false;
        }
        for (id, owner) in &self.owners {
            if *owner == step {
                if let Some(record) = self.records.get_mut(id) {
                    record.reset();
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::StepPhase;

    fn tracker(watermark: u32) -> ActivityTracker {
        ActivityTracker::from_plan(&LessonPlan::python_intro(), StepId::new(watermark))
    }

    #[test]
    fn steps_below_watermark_start_unlocked() {
        let tracker = tracker(4);
        assert!(tracker.step(StepId::new(3)).unwrap().is_unlocked());
        assert_eq!(
            tracker.step(StepId::new(4)).unwrap().phase(),
            StepPhase::Locked
        );
    }

    #[test]
    fn marking_is_idempotent() {
        let mut tracker = tracker(1);
        let step = StepId::new(3);
        let sandbox = ActivityId::new(301);
        assert_eq!(tracker.mark_completed(step, sandbox), MarkOutcome::Marked);
        assert_eq!(
            tracker.mark_completed(step, sandbox),
            MarkOutcome::AlreadyCompleted
        );
        assert!(tracker.is_completed(step, sandbox));
        assert!(tracker.record(sandbox).unwrap().is_completed());
        assert_eq!(tracker.step(step).unwrap().completed_count(), 1);
    }

    #[test]
    fn foreign_activities_are_unknown() {
        let mut tracker = tracker(1);
        assert_eq!(
            tracker.mark_completed(StepId::new(2), ActivityId::new(301)),
            MarkOutcome::Unknown
        );
        assert_eq!(
            tracker.mark_completed(StepId::new(99), ActivityId::new(1)),
            MarkOutcome::Unknown
        );
    }

    #[test]
    fn reset_clears_records_of_the_step_only() {
        let mut tracker = tracker(1);
        tracker.mark_completed(StepId::new(3), ActivityId::new(301));
        tracker.mark_completed(StepId::new(11), ActivityId::new(1101));
        tracker
            .record_mut(ActivityId::new(1101))
            .unwrap()
            .record_judgement(true);

        assert!(tracker.reset_step(StepId::new(11)));
        assert!(!tracker.record(ActivityId::new(1101)).unwrap().is_completed());
        assert_eq!(tracker.record(ActivityId::new(1101)).unwrap().correct(), None);
        assert!(tracker.is_completed(StepId::new(3), ActivityId::new(301)));
        assert_eq!(tracker.records_of(StepId::new(11)).len(), 5);
    }
}
