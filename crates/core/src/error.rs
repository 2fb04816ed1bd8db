use thiserror::Error;

use crate::model::{ProfileError, RatingError};
use crate::widgets::{ChallengeError, DragDropError, MatchingError, QuizError, WordSearchError};

/// Umbrella error for every validation failure raised by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    DragDrop(#[from] DragDropError),
    #[error(transparent)]
    Matching(#[from] MatchingError),
    #[error(transparent)]
    WordSearch(#[from] WordSearchError),
}
