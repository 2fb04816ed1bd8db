//! Certificate generation from the learner's final progress.

mod layout;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lesson_core::Clock;
use lesson_core::model::{CertificateRequest, CertificateTier, RegistryEntry};
use storage::ProgressStore;
use storage::repository::StorageError;
use tracing::{info, warn};

use crate::error::CertificateError;
use crate::lesson::ProgressionConfig;
use crate::plan::LessonPlan;

pub use layout::{
    CertificateLayout, FontFamily, FontStyle, Frame, ImageBlock, PAGE_HEIGHT, PAGE_WIDTH,
    TextBlock, file_name,
};
pub use render::{BackgroundPaint, DocumentRenderer, GRADIENT_BANDS, SvgRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateConfig {
    /// Score that earns the golden certificate.
    pub max_possible_score: u32,
    pub course_title: String,
    /// Logo reference embedded above the title.
    pub logo: Option<String>,
}

impl CertificateConfig {
    /// Golden score taken from what `plan` lets a learner earn.
    #[must_use]
    pub fn for_plan(plan: &LessonPlan, progression: &ProgressionConfig) -> Self {
        Self {
            max_possible_score: plan.max_possible_score(progression),
            course_title: "Introduction to Python for Backend".to_owned(),
            logo: None,
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self::for_plan(&LessonPlan::python_intro(), &ProgressionConfig::default())
    }
}

/// A rendered certificate, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDocument {
    pub file_name: String,
    pub tier: CertificateTier,
    pub bytes: Vec<u8>,
}

/// Clears the in-flight flag when generation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CertificateService {
    store: ProgressStore,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    clock: Clock,
    config: CertificateConfig,
    in_progress: AtomicBool,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        store: ProgressStore,
        renderer: Option<Arc<dyn DocumentRenderer>>,
        clock: Clock,
        config: CertificateConfig,
    ) -> Self {
        Self {
            store,
            renderer,
            clock,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CertificateConfig {
        &self.config
    }

    /// Renders the certificate and records it in the registry.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::InProgress` while another generation runs,
    /// `MissingStudentName` without a profile name, `RendererUnavailable`
    /// without a renderer, or a storage error.
    pub async fn generate(&self) -> Result<CertificateDocument, CertificateError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CertificateError::InProgress);
        }
        let _guard = InFlight(&self.in_progress);

        let profile = self
            .store
            .student_profile()
            .await?
            .filter(|p| !p.name().trim().is_empty())
            .ok_or(CertificateError::MissingStudentName)?;
        let renderer = self
            .renderer
            .as_ref()
            .ok_or(CertificateError::RendererUnavailable)?;

        let request = CertificateRequest {
            profile,
            score: self.store.score().await?,
            max_possible_score: self.config.max_possible_score,
            issued_at: self.clock.now(),
        };
        let tier = request.tier();
        let layout = CertificateLayout::for_request(&request, &self.config);
        let bytes = renderer.render(&layout)?;
        let document = CertificateDocument {
            file_name: file_name(request.profile.name(), renderer.extension()),
            tier,
            bytes,
        };
        info!(
            file = %document.file_name,
            golden = tier.is_golden(),
            score = request.score,
            "certificate generated"
        );

        if let Err(err) = self.record(&request).await {
            warn!(%err, "failed to update the certificate registry");
        }
        Ok(document)
    }

    /// Generates the certificate and writes it into `dir`.
    ///
    /// # Errors
    ///
    /// Same as [`CertificateService::generate`], plus I/O errors.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, CertificateError> {
        tokio::fs::create_dir_all(dir).await?;
        let document = self.generate().await?;
        let path = dir.join(&document.file_name);
        tokio::fs::write(&path, &document.bytes).await?;
        Ok(path)
    }

    async fn record(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        let entry = RegistryEntry {
            student_info: request.profile.clone(),
            player_score: request.score,
            unlocked_step: self.store.unlocked_step().await?,
            research_notes: self.store.research_notes().await?,
            selected_theme: self.store.theme().await?,
            last_completion_date: request.issued_at,
        };
        let mut registry = self.store.certificate_registry().await?;
        registry.upsert(entry);
        self.store.set_certificate_registry(&registry).await
    }
}
