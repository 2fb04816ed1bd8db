use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz needs at least two options")]
    TooFewOptions,

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOutOfRange { index: usize, len: usize },

    #[error("option {0} does not exist")]
    UnknownOption(usize),

    #[error("this question was already answered")]
    AlreadyAnswered,

    #[error("the answer was already revealed")]
    AlreadyRevealed,
}

/// Interaction state of one multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Unanswered,
    Answered { selected: usize, correct: bool },
    /// `selected` keeps a wrong pick made before the reveal, if any.
    Revealed { selected: Option<usize> },
}

/// Result of picking an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Correct,
    /// The correct option is exposed after a wrong pick.
    Incorrect { correct_option: usize },
}

impl QuizOutcome {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, QuizOutcome::Correct)
    }

    #[must_use]
    pub fn feedback(self) -> &'static str {
        match self {
            QuizOutcome::Correct => "✅ Correct!",
            QuizOutcome::Incorrect { .. } => {
                "❌ Incorrect answer. The right one has been highlighted."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    prompt: String,
    options: Vec<String>,
    correct: usize,
    state: QuizState,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns `QuizError::TooFewOptions` or `QuizError::CorrectOutOfRange`
    /// for malformed questions.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
    ) -> Result<Self, QuizError> {
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions);
        }
        if correct >= options.len() {
            return Err(QuizError::CorrectOutOfRange {
                index: correct,
                len: options.len(),
            });
        }
        Ok(Self {
            prompt: prompt.into(),
            options,
            correct,
            state: QuizState::Unanswered,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        matches!(self.state, QuizState::Revealed { .. })
    }

    /// Picks an option. Only the first pick counts.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyAnswered` once answered or revealed, and
    /// `QuizError::UnknownOption` for an out-of-range index.
    pub fn select(&mut self, option: usize) -> Result<QuizOutcome, QuizError> {
        if self.state != QuizState::Unanswered {
            return Err(QuizError::AlreadyAnswered);
        }
        if option >= self.options.len() {
            return Err(QuizError::UnknownOption(option));
        }
        let correct = option == self.correct;
        self.state = QuizState::Answered {
            selected: option,
            correct,
        };
        Ok(if correct {
            QuizOutcome::Correct
        } else {
            QuizOutcome::Incorrect {
                correct_option: self.correct,
            }
        })
    }

    /// Shows the correct option. Allowed before answering or after a wrong
    /// answer; returns the correct index.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyRevealed` on a second reveal and
    /// `QuizError::AlreadyAnswered` after a correct answer.
    pub fn reveal(&mut self) -> Result<usize, QuizError> {
        match self.state {
            QuizState::Revealed { .. } => Err(QuizError::AlreadyRevealed),
            QuizState::Answered { correct: true, .. } => Err(QuizError::AlreadyAnswered),
            QuizState::Answered {
                selected,
                correct: false,
            } => {
                self.state = QuizState::Revealed {
                    selected: Some(selected),
                };
                Ok(self.correct)
            }
            QuizState::Unanswered => {
                self.state = QuizState::Revealed { selected: None };
                Ok(self.correct)
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = QuizState::Unanswered;
    }
}
