use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ActivityId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("challenge {0} has no required patterns")]
    NoPatterns(ActivityId),

    #[error("this challenge was already checked")]
    AlreadyChecked,
}

/// Static description of a code challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    pub id: ActivityId,
    pub prompt: String,
    /// Substrings a plausible answer must contain.
    pub required: Vec<String>,
    pub expected_output: String,
    pub solution: String,
}

/// Decides whether submitted code solves a challenge.
pub trait ChallengeJudge: Send + Sync {
    fn judge(&self, challenge: &ChallengeSpec, submitted: &str) -> bool;
}

/// Accepts code containing every required pattern. Nothing is executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicJudge;

impl ChallengeJudge for HeuristicJudge {
    fn judge(&self, challenge: &ChallengeSpec, submitted: &str) -> bool {
        challenge
            .required
            .iter()
            .all(|pattern| submitted.contains(pattern.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Unattempted,
    Checked { correct: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub correct: bool,
    pub revealed: bool,
    /// Text for the exercise output area.
    pub output: String,
}

impl CheckOutcome {
    #[must_use]
    pub fn feedback(&self) -> &'static str {
        if self.correct {
            "✅ Correct code!"
        } else {
            "❌ Try again. Check your code's logic."
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge {
    spec: ChallengeSpec,
    submitted: String,
    state: ChallengeState,
    revealed: bool,
}

impl CodeChallenge {
    /// # Errors
    ///
    /// Returns `ChallengeError::NoPatterns` when the spec would accept anything.
    pub fn new(spec: ChallengeSpec) -> Result<Self, ChallengeError> {
        if spec.required.iter().all(|p| p.trim().is_empty()) {
            return Err(ChallengeError::NoPatterns(spec.id));
        }
        Ok(Self {
            spec,
            submitted: String::new(),
            state: ChallengeState::Unattempted,
            revealed: false,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &ChallengeSpec {
        &self.spec
    }

    #[must_use]
    pub fn submitted(&self) -> &str {
        &self.submitted
    }

    #[must_use]
    pub fn state(&self) -> ChallengeState {
        self.state
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Judges `code`. A challenge is checked once; see [`CodeChallenge::reset`].
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::AlreadyChecked` after the first check.
    pub fn check(
        &mut self,
        code: &str,
        judge: &dyn ChallengeJudge,
    ) -> Result<CheckOutcome, ChallengeError> {
        if self.state != ChallengeState::Unattempted {
            return Err(ChallengeError::AlreadyChecked);
        }
        self.submitted = code.to_owned();
        let correct = judge.judge(&self.spec, code);
        self.state = ChallengeState::Checked { correct };
        let output = if correct {
            self.spec.expected_output.clone()
        } else {
            "Incorrect output.".to_owned()
        };
        Ok(CheckOutcome {
            correct,
            revealed: self.revealed,
            output,
        })
    }

    /// Fills in the canonical solution and checks it.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::AlreadyChecked` after the first check.
    pub fn reveal_solution(
        &mut self,
        judge: &dyn ChallengeJudge,
    ) -> Result<CheckOutcome, ChallengeError> {
        if self.state != ChallengeState::Unattempted {
            return Err(ChallengeError::AlreadyChecked);
        }
        self.revealed = true;
        let solution = self.spec.solution.clone();
        self.check(&solution, judge)
    }

    pub fn reset(&mut self) {
        self.submitted.clear();
        self.state = ChallengeState::Unattempted;
        self.revealed = false;
    }
}
