//! Messages sent to the page embedding the lesson.

#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Wire format of a host notification, `{"type": "UPDATE_PROGRESS", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    UpdateProgress {
        #[serde(rename = "unlockedStep")]
        unlocked_step: u32,
    },
    AddPoints {
        points: i64,
    },
    StartTimer,
    CloseModal,
    StepUnlocked {
        step: u32,
    },
    ExtraContentVisited,
}

/// Fire-and-forget channel to the host. Delivery failures are the
/// implementation's business and never reach the caller.
pub trait HostNotifier: Send + Sync {
    fn notify(&self, message: HostMessage);
}

/// Logs each message as JSON at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl HostNotifier for TracingNotifier {
    fn notify(&self, message: HostMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => info!(target: "host", "{json}"),
            Err(err) => info!(target: "host", ?message, %err, "unserializable host message"),
        }
    }
}

/// Keeps every message in memory, in order.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<HostMessage>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, predicate: impl Fn(&HostMessage) -> bool) -> usize {
        self.messages().iter().filter(|m| predicate(m)).count()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl HostNotifier for RecordingNotifier {
    fn notify(&self, message: HostMessage) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_use_the_host_wire_format() {
        let cases = [
            (
                HostMessage::UpdateProgress { unlocked_step: 4 },
                json!({"type": "UPDATE_PROGRESS", "unlockedStep": 4}),
            ),
            (
                HostMessage::AddPoints { points: -20 },
                json!({"type": "ADD_POINTS", "points": -20}),
            ),
            (HostMessage::StartTimer, json!({"type": "START_TIMER"})),
            (HostMessage::CloseModal, json!({"type": "CLOSE_MODAL"})),
            (
                HostMessage::StepUnlocked { step: 3 },
                json!({"type": "STEP_UNLOCKED", "step": 3}),
            ),
            (
                HostMessage::ExtraContentVisited,
                json!({"type": "EXTRA_CONTENT_VISITED"}),
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(serde_json::to_value(&message).unwrap(), expected);
        }
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingNotifier::new();
        recorder.notify(HostMessage::StartTimer);
        recorder.notify(HostMessage::CloseModal);
        assert_eq!(
            recorder.messages(),
            vec![HostMessage::StartTimer, HostMessage::CloseModal]
        );
        assert_eq!(recorder.count(|m| *m == HostMessage::CloseModal), 1);
    }
}
