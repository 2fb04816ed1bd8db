//! Interaction state machines for the lesson widgets. Each widget only knows
//! its own state; reporting completion is the session's job.

mod challenge;
mod drag_drop;
mod matching;
mod quiz;
mod word_search;

pub use challenge::{
    ChallengeError, ChallengeJudge, ChallengeSpec, ChallengeState, CheckOutcome, CodeChallenge,
    HeuristicJudge,
};
pub use drag_drop::{CodeBlock, DragDropError, DragDropExercise};
pub use matching::{Concept, Definition, DropOutcome, MatchingError, MatchingExercise};
pub use quiz::{QuizError, QuizOutcome, QuizQuestion, QuizState};
pub use word_search::{Cell, GRID_SIZE, HiddenWord, WordSearch, WordSearchError};
