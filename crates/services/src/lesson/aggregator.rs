use lesson_core::model::StepId;

use super::tracker::ActivityTracker;

/// Signal that every declared activity of a step is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCompleted {
    pub step: StepId,
}

/// Decides when a step is complete.
///
/// A step declaring no activities (or unknown to the tracker) completes on
/// every evaluation. Otherwise it completes once the completed count reaches
/// the declared total; a plan that under-declares is satisfied early rather
/// than treated as a fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepCompletionAggregator;

impl StepCompletionAggregator {
    #[must_use]
    pub fn evaluate(&self, tracker: &ActivityTracker, step: StepId) -> Option<StepCompleted> {
        let (total, completed) = tracker
            .step(step)
            .map_or((0, 0), |s| (s.total_activities(), s.completed_count()));
        if total == 0 {
            return Some(StepCompleted { step });
        }
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        (completed >= total).then_some(StepCompleted { step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::LessonPlan;
    use lesson_core::model::ActivityId;

    #[test]
    fn zero_activity_steps_always_complete() {
        let tracker = ActivityTracker::from_plan(&LessonPlan::python_intro(), StepId::FIRST);
        let aggregator = StepCompletionAggregator;
        for _ in 0..3 {
            assert_eq!(
                aggregator.evaluate(&tracker, StepId::new(5)),
                Some(StepCompleted { step: StepId::new(5) })
            );
        }
        assert!(aggregator.evaluate(&tracker, StepId::new(404)).is_some());
    }

    #[test]
    fn completes_when_count_reaches_total() {
        let mut tracker = ActivityTracker::from_plan(&LessonPlan::python_intro(), StepId::FIRST);
        let aggregator = StepCompletionAggregator;
        let step = StepId::new(7);

        tracker.mark_completed(step, ActivityId::new(701));
        assert_eq!(aggregator.evaluate(&tracker, step), None);
        tracker.mark_completed(step, ActivityId::new(702));
        assert!(aggregator.evaluate(&tracker, step).is_some());
    }

    #[test]
    fn under_declared_total_is_satisfied_early() {
        let mut plan = LessonPlan::python_intro();
        plan.steps[6].total_activities = Some(1);
        let mut tracker = ActivityTracker::from_plan(&plan, StepId::FIRST);
        tracker.mark_completed(StepId::new(7), ActivityId::new(701));
        assert!(
            StepCompletionAggregator
                .evaluate(&tracker, StepId::new(7))
                .is_some()
        );
    }
}
