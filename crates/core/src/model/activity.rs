use serde::{Deserialize, Serialize};

use crate::model::ids::ActivityId;

//
// ─── ACTIVITY KIND ─────────────────────────────────────────────────────────────
//

/// Classification of a trackable widget inside a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Quiz,
    CodeChallenge,
    DragDrop,
    Matching,
    WordSearch,
    Survey,
    Note,
    /// Student profile form on the welcome step.
    Profile,
    /// Free-form exercise executed by the embedded code runner.
    Sandbox,
}

impl ActivityKind {
    /// Only kinds with a correct answer can be judged (and revealed).
    #[must_use]
    pub fn is_judged(self) -> bool {
        matches!(
            self,
            ActivityKind::Quiz
                | ActivityKind::CodeChallenge
                | ActivityKind::DragDrop
                | ActivityKind::Matching
        )
    }
}

//
// ─── ACTIVITY RECORD ───────────────────────────────────────────────────────────
//

/// Completion bookkeeping for one activity.
///
/// `revealed` is sticky until [`ActivityRecord::reset`]: once the learner asked
/// for the answer the activity can still complete, but never awards points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    id: ActivityId,
    kind: ActivityKind,
    completed: bool,
    revealed: bool,
    correct: Option<bool>,
}

impl ActivityRecord {
    #[must_use]
    pub fn new(id: ActivityId, kind: ActivityKind) -> Self {
        Self {
            id,
            kind,
            completed: false,
            revealed: false,
            correct: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ActivityId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// `None` while the activity has not been judged yet.
    #[must_use]
    pub fn correct(&self) -> Option<bool> {
        self.correct
    }

    /// Returns `true` only when this call flipped the record to completed.
    pub fn mark_completed(&mut self) -> bool {
        let changed = !self.completed;
        self.completed = true;
        changed
    }

    pub fn mark_revealed(&mut self) {
        self.revealed = true;
    }

    pub fn record_judgement(&mut self, correct: bool) {
        self.correct = Some(correct);
    }

    /// Points this record is worth under the given per-activity value.
    #[must_use]
    pub fn awardable_points(&self, points: u32) -> u32 {
        if self.revealed || self.correct != Some(true) {
            0
        } else {
            points
        }
    }

    pub fn reset(&mut self) {
        self.completed = false;
        self.revealed = false;
        self.correct = None;
    }
}
