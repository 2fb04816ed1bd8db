//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{ActivityId, ActivityKind, ProfileError, RatingError, StepId};
use lesson_core::widgets::{
    ChallengeError, DragDropError, MatchingError, QuizError, WordSearchError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors raised while loading or validating a lesson plan.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    #[error("lesson plan has no steps")]
    Empty,
    #[error("step {0} is declared twice")]
    DuplicateStep(StepId),
    #[error("activity {0} is declared twice")]
    DuplicateActivity(ActivityId),
    #[error("invalid widget data for activity {activity}: {source}")]
    Widget {
        activity: ActivityId,
        #[source]
        source: lesson_core::Error,
    },
    #[error("cannot read lesson plan: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors emitted by `ProgressionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("step {0} is not completed yet")]
    NotCompleted(StepId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by code runners.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SandboxError {
    #[error("a program is already running")]
    Busy,
}

/// Errors emitted by `SurveyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurveyError {
    #[error("feedback submission is not configured")]
    Disabled,
    #[error("feedback request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `CertificateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateError {
    #[error("student name is missing; fill in the profile form first")]
    MissingStudentName,
    #[error("no document renderer is available")]
    RendererUnavailable,
    #[error("a certificate is already being generated")]
    InProgress,
    #[error("cannot write certificate: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("step {0} is not part of this lesson")]
    UnknownStep(StepId),
    #[error("activity {0} is not part of this lesson")]
    UnknownActivity(ActivityId),
    #[error("activity {activity} is a {actual:?} activity, not {expected:?}")]
    WrongKind {
        activity: ActivityId,
        expected: ActivityKind,
        actual: ActivityKind,
    },
    #[error("step {0} is already unlocked and can no longer be reset")]
    StepLocked(StepId),
    #[error(transparent)]
    Plan(#[from] PlanError),
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
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping lesson services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
}
