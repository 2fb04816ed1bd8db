#![forbid(unsafe_code)]

pub mod certificate;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod lesson;
pub mod lesson_services;
pub mod plan;
pub mod sandbox;
pub mod survey;

pub use lesson_core::Clock;

pub use certificate::{CertificateConfig, CertificateService, DocumentRenderer, SvgRenderer};
pub use config::LessonConfig;
pub use error::{
    CertificateError, LessonError, LessonServicesError, PlanError, ProgressionError,
    SandboxError, SurveyError,
};
pub use events::{EventBus, LessonEvent};
pub use host::{HostMessage, HostNotifier, TracingNotifier};
#[cfg(any(test, feature = "test-util"))]
pub use host::RecordingNotifier;
pub use lesson::{
    CommandOutcome, LessonCommand, LessonSession, ProgressionConfig, SessionContext,
    UnlockOutcome,
};
pub use lesson_services::LessonServices;
pub use plan::{ActivityPlan, LessonPlan, StepPlan, WidgetPlan};
pub use sandbox::{CodeRunner, CompletionRule, FixedRunner, PythonProcessRunner, RunOutput};
pub use survey::{Feedback, FeedbackSink, HttpFeedbackSink, SurveyService};
