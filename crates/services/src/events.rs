use lesson_core::model::{ActivityId, StepId, TimeBonus};
use tokio::sync::broadcast;

/// Things that happened inside a lesson session, for views and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonEvent {
    ActivityCompleted {
        step: StepId,
        activity: ActivityId,
        points: u32,
    },
    StepCompleted {
        step: StepId,
    },
    StepUnlocked {
        step: StepId,
        unlocked_step: StepId,
    },
    ScoreChanged {
        delta: i64,
        total: u32,
    },
    BonusAwarded(TimeBonus),
    WordFound {
        activity: ActivityId,
        word: String,
    },
    PuzzleCompleted {
        activity: ActivityId,
    },
    StepReset {
        step: StepId,
        points_removed: u32,
    },
}

const EVENT_CAPACITY: usize = 64;

/// Broadcast fan-out of [`LessonEvent`]s. Publishing without subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LessonEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: LessonEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LessonEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_see_events_in_order() {
        let bus = EventBus::new();
        bus.publish(LessonEvent::PuzzleCompleted {
            activity: ActivityId::new(1),
        });

        let mut rx = bus.subscribe();
        bus.publish(LessonEvent::StepCompleted { step: StepId::new(2) });
        bus.publish(LessonEvent::StepCompleted { step: StepId::new(3) });

        assert_eq!(
            rx.try_recv().unwrap(),
            LessonEvent::StepCompleted { step: StepId::new(2) }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            LessonEvent::StepCompleted { step: StepId::new(3) }
        );
        assert!(rx.try_recv().is_err());
    }
}
