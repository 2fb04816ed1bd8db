//! Closing satisfaction survey: persisted locally, submitted once to a
//! feedback endpoint.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use lesson_core::model::SatisfactionRating;
use reqwest::Client;
use serde::Serialize;
use storage::ProgressStore;
use storage::repository::StorageError;
use tracing::{debug, info, warn};

use crate::error::SurveyError;

/// Body of the feedback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    /// `null` when the learner skipped the profile form.
    pub name: Option<String>,
    pub rating: u8,
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Deliver one feedback record.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError` if the record cannot be delivered.
    async fn submit(&self, feedback: &Feedback) -> Result<(), SurveyError>;
}

#[derive(Clone, Debug)]
pub struct HttpFeedbackConfig {
    pub url: String,
}

impl HttpFeedbackConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = env::var("LESSON_SURVEY_URL").ok()?;
        if url.trim().is_empty() {
            return None;
        }
        Some(Self { url })
    }
}

/// Posts feedback as JSON.
#[derive(Clone)]
pub struct HttpFeedbackSink {
    client: Client,
    config: HttpFeedbackConfig,
}

impl HttpFeedbackSink {
    #[must_use]
    pub fn new(config: HttpFeedbackConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Option<Self> {
        HttpFeedbackConfig::from_env().map(Self::new)
    }
}

#[async_trait]
impl FeedbackSink for HttpFeedbackSink {
    async fn submit(&self, feedback: &Feedback) -> Result<(), SurveyError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(feedback)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SurveyError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SurveyService {
    store: ProgressStore,
    sink: Option<Arc<dyn FeedbackSink>>,
}

impl SurveyService {
    #[must_use]
    pub fn new(store: ProgressStore, sink: Option<Arc<dyn FeedbackSink>>) -> Self {
        Self { store, sink }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Persists the rating, then submits it. Submission failures are logged
    /// and never undo the stored rating.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rating or profile cannot be accessed.
    pub async fn record_rating(&self, rating: SatisfactionRating) -> Result<(), StorageError> {
        self.store.set_satisfaction_rating(rating).await?;
        let name = self
            .store
            .student_profile()
            .await?
            .map(|p| p.name().to_owned());
        let feedback = Feedback {
            name,
            rating: rating.stars(),
        };
        match self.submit_feedback(&feedback).await {
            Ok(()) => info!(rating = feedback.rating, "feedback submitted"),
            Err(SurveyError::Disabled) => debug!("feedback endpoint not configured"),
            Err(err) => warn!(%err, "failed to submit feedback"),
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SurveyError::Disabled` without a sink, or the sink's error.
    pub async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), SurveyError> {
        let sink = self.sink.as_ref().ok_or(SurveyError::Disabled)?;
        sink.submit(feedback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::StudentProfile;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<Feedback>>,
        fail: bool,
    }

    #[async_trait]
    impl FeedbackSink for Capture {
        async fn submit(&self, feedback: &Feedback) -> Result<(), SurveyError> {
            self.seen.lock().unwrap().push(feedback.clone());
            if self.fail {
                Err(SurveyError::Disabled)
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn rating_is_stored_and_submitted_with_name() {
        let store = ProgressStore::in_memory();
        let profile = StudentProfile::new("Linus", 21, "🐧", "intermediate", "systems").unwrap();
        store.set_student_profile(&profile).await.unwrap();
        let capture = Arc::new(Capture::default());
        let service = SurveyService::new(store.clone(), Some(capture.clone()));

        service
            .record_rating(SatisfactionRating::new(4).unwrap())
            .await
            .unwrap();

        assert_eq!(store.satisfaction_rating().await.unwrap().stars(), 4);
        assert_eq!(
            capture.seen.lock().unwrap().as_slice(),
            &[Feedback {
                name: Some("Linus".into()),
                rating: 4
            }]
        );
    }

    #[tokio::test]
    async fn failed_submission_keeps_the_rating() {
        let store = ProgressStore::in_memory();
        let capture = Arc::new(Capture {
            fail: true,
            ..Capture::default()
        });
        let service = SurveyService::new(store.clone(), Some(capture));
        service
            .record_rating(SatisfactionRating::new(2).unwrap())
            .await
            .unwrap();
        assert_eq!(store.satisfaction_rating().await.unwrap().stars(), 2);
    }

    #[tokio::test]
    async fn disabled_without_sink() {
        let service = SurveyService::new(ProgressStore::in_memory(), None);
        assert!(!service.enabled());
        let feedback = Feedback {
            name: None,
            rating: 5,
        };
        assert!(matches!(
            service.submit_feedback(&feedback).await,
            Err(SurveyError::Disabled)
        ));
    }
}
