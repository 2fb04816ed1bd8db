//! Lesson runtime: completion tracking, step aggregation, progression and
//! the session that ties them to the widgets.

mod aggregator;
mod command;
mod progression;
mod session;
mod tracker;

pub use aggregator::{StepCompleted, StepCompletionAggregator};
pub use command::{CommandOutcome, LessonCommand};
pub use progression::{ProgressionConfig, ProgressionController, UnlockOutcome};
pub use session::{
    AssessmentScore, ChallengeResult, CompletionReport, LessonSession, QuizAnswer, SandboxRun,
    SessionContext, WordHit,
};
pub use tracker::{ActivityTracker, MarkOutcome};
