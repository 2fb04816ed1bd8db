use std::sync::Arc;

use storage::ProgressStore;
use storage::repository::Storage;

use crate::Clock;
use crate::certificate::{CertificateConfig, CertificateService, DocumentRenderer, SvgRenderer};
use crate::config::LessonConfig;
use crate::error::LessonServicesError;
use crate::host::{HostNotifier, TracingNotifier};
use crate::lesson::{LessonSession, ProgressionConfig, SessionContext};
use crate::plan::LessonPlan;
use crate::sandbox::{CodeRunner, PythonProcessRunner};
use crate::survey::{FeedbackSink, HttpFeedbackConfig, HttpFeedbackSink, SurveyService};

/// Assembles the store, plan and services a front end needs.
#[derive(Clone)]
pub struct LessonServices {
    store: ProgressStore,
    plan: LessonPlan,
    clock: Clock,
    notifier: Arc<dyn HostNotifier>,
    runner: Arc<dyn CodeRunner>,
    survey: SurveyService,
    certificates: Arc<CertificateService>,
    progression: ProgressionConfig,
}

impl LessonServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `LessonServicesError` if storage initialization or plan loading fails.
    pub async fn new_sqlite(config: &LessonConfig, clock: Clock) -> Result<Self, LessonServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let plan = config.load_plan()?;
        let sink = config.survey_url.as_ref().map(|url| {
            Arc::new(HttpFeedbackSink::new(HttpFeedbackConfig { url: url.clone() }))
                as Arc<dyn FeedbackSink>
        });
        let runner = Arc::new(PythonProcessRunner::new(
            config.python.clone(),
            PythonProcessRunner::DEFAULT_TIMEOUT,
        ));
        Ok(Self::assemble(
            ProgressStore::from_storage(&storage),
            plan,
            clock,
            sink,
            runner,
        ))
    }

    /// In-memory services for tests and demos; feedback is never sent.
    #[must_use]
    pub fn in_memory(plan: LessonPlan, clock: Clock, runner: Arc<dyn CodeRunner>) -> Self {
        Self::assemble(ProgressStore::in_memory(), plan, clock, None, runner)
    }

    fn assemble(
        store: ProgressStore,
        plan: LessonPlan,
        clock: Clock,
        sink: Option<Arc<dyn FeedbackSink>>,
        runner: Arc<dyn CodeRunner>,
    ) -> Self {
        let progression = ProgressionConfig::default();
        let certificates = certificate_service(&store, &plan, clock, &progression);
        Self {
            survey: SurveyService::new(store.clone(), sink),
            store,
            plan,
            clock,
            notifier: Arc::new(TracingNotifier),
            runner,
            certificates,
            progression,
        }
    }

    /// Replaces the host notifier used by new sessions.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn HostNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_progression(mut self, config: ProgressionConfig) -> Self {
        self.certificates = certificate_service(&self.store, &self.plan, self.clock, &config);
        self.progression = config;
        self
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    #[must_use]
    pub fn plan(&self) -> &LessonPlan {
        &self.plan
    }

    #[must_use]
    pub fn survey(&self) -> &SurveyService {
        &self.survey
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.store.clone(), Arc::clone(&self.notifier))
            .with_clock(self.clock)
            .with_progression(self.progression.clone())
            .with_runner(Arc::clone(&self.runner))
            .with_survey(self.survey.clone())
    }

    /// Starts a session resumed from the persisted watermark.
    ///
    /// # Errors
    ///
    /// Returns `LessonServicesError` if the plan's widgets are invalid or the
    /// store cannot be read.
    pub async fn start_session(&self) -> Result<LessonSession, LessonServicesError> {
        Ok(LessonSession::start(self.plan.clone(), self.session_context()).await?)
    }
}

fn certificate_service(
    store: &ProgressStore,
    plan: &LessonPlan,
    clock: Clock,
    progression: &ProgressionConfig,
) -> Arc<CertificateService> {
    let renderer: Arc<dyn DocumentRenderer> = Arc::new(SvgRenderer::new());
    Arc::new(CertificateService::new(
        store.clone(),
        Some(renderer),
        clock,
        CertificateConfig::for_plan(plan, progression),
    ))
}
