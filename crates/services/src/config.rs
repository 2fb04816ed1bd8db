use std::env;
use std::path::PathBuf;

use crate::error::PlanError;
use crate::plan::LessonPlan;
use crate::survey::HttpFeedbackConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://lesson.sqlite3";
pub const DEFAULT_PYTHON: &str = "python3";

/// Runtime settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonConfig {
    pub db_url: String,
    /// JSON plan to load instead of the built-in course.
    pub plan_path: Option<PathBuf>,
    /// Feedback endpoint; submission is disabled when unset.
    pub survey_url: Option<String>,
    pub python: String,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            plan_path: None,
            survey_url: None,
            python: DEFAULT_PYTHON.to_owned(),
        }
    }
}

impl LessonConfig {
    /// Reads `LESSON_DB_URL`, `LESSON_PLAN`, `LESSON_SURVEY_URL` and
    /// `LESSON_PYTHON`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            db_url: non_empty("LESSON_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            plan_path: non_empty("LESSON_PLAN").map(PathBuf::from),
            survey_url: HttpFeedbackConfig::from_env().map(|c| c.url),
            python: non_empty("LESSON_PYTHON").unwrap_or_else(|| DEFAULT_PYTHON.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `PlanError` if the configured plan cannot be read or is invalid.
    pub fn load_plan(&self) -> Result<LessonPlan, PlanError> {
        match &self.plan_path {
            Some(path) => LessonPlan::from_path(path),
            None => Ok(LessonPlan::python_intro()),
        }
    }
}
