use std::sync::Arc;

use chrono::{DateTime, Utc};
use lesson_core::model::{
    CertificateRegistry, ProgressSnapshot, SatisfactionRating, StepId, StudentProfile, Theme,
    TimeBonus,
};
use lesson_core::scoring::apply_delta;
use lesson_core::time::{from_unix_millis, to_unix_millis};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::keys::StoreKey;
use crate::repository::{KeyValueStore, Storage, StorageError};

/// Typed view over the raw key-value store.
///
/// Scalars are stored as decimal strings and read leniently: a missing or
/// unparsable value falls back to its default. Structured values are JSON and
/// a malformed document is reported as `StorageError::Serialization`.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.kv))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_storage(&Storage::in_memory())
    }

    // ─── Raw helpers ───────────────────────────────────────────────────────

    async fn read_raw(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        self.kv.get(key.as_str()).await
    }

    async fn write_raw(&self, key: StoreKey, value: &str) -> Result<(), StorageError> {
        self.kv.set(key.as_str(), value).await
    }

    async fn read_number<T: std::str::FromStr>(
        &self,
        key: StoreKey,
    ) -> Result<Option<T>, StorageError> {
        Ok(self
            .read_raw(key)
            .await?
            .and_then(|raw| raw.trim().parse::<T>().ok()))
    }

    async fn read_json<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, StorageError> {
        match self.read_raw(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize>(&self, key: StoreKey, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(format!("{key}: {e}")))?;
        self.write_raw(key, &raw).await
    }

    // ─── Progression ───────────────────────────────────────────────────────

    /// Highest step the learner may open; `1` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn unlocked_step(&self) -> Result<StepId, StorageError> {
        let value: Option<u32> = self.read_number(StoreKey::UnlockedStep).await?;
        Ok(value.map_or(StepId::FIRST, |v| StepId::new(v).max(StepId::FIRST)))
    }

    /// Writes the watermark. Monotonicity is enforced by the caller.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn set_unlocked_step(&self, step: StepId) -> Result<(), StorageError> {
        self.write_raw(StoreKey::UnlockedStep, &step.value().to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn score(&self) -> Result<u32, StorageError> {
        Ok(self.read_number(StoreKey::PlayerScore).await?.unwrap_or(0))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn set_score(&self, score: u32) -> Result<(), StorageError> {
        self.write_raw(StoreKey::PlayerScore, &score.to_string())
            .await
    }

    /// Adds a signed delta to the score (never below zero) and returns the
    /// new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be read or stored.
    pub async fn add_points(&self, delta: i64) -> Result<u32, StorageError> {
        let next = apply_delta(self.score().await?, delta);
        self.set_score(next).await?;
        Ok(next)
    }

    // ─── Learner data ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the profile is malformed.
    pub async fn student_profile(&self) -> Result<Option<StudentProfile>, StorageError> {
        self.read_json(StoreKey::StudentData).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    pub async fn set_student_profile(&self, profile: &StudentProfile) -> Result<(), StorageError> {
        self.write_json(StoreKey::StudentData, profile).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn research_notes(&self) -> Result<String, StorageError> {
        Ok(self
            .read_raw(StoreKey::ResearchNotes)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the notes cannot be stored.
    pub async fn set_research_notes(&self, notes: &str) -> Result<(), StorageError> {
        self.write_raw(StoreKey::ResearchNotes, notes).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn theme(&self) -> Result<Theme, StorageError> {
        Ok(self
            .read_raw(StoreKey::Theme)
            .await?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the theme cannot be stored.
    pub async fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.write_raw(StoreKey::Theme, theme.as_str()).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn satisfaction_rating(&self) -> Result<SatisfactionRating, StorageError> {
        let stars: Option<u8> = self.read_number(StoreKey::SatisfactionRating).await?;
        Ok(stars
            .and_then(|s| SatisfactionRating::from_persisted(s).ok())
            .unwrap_or(SatisfactionRating::UNRATED))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the rating cannot be stored.
    pub async fn set_satisfaction_rating(
        &self,
        rating: SatisfactionRating,
    ) -> Result<(), StorageError> {
        self.write_raw(StoreKey::SatisfactionRating, &rating.stars().to_string())
            .await
    }

    // ─── Timer & bonus ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn course_start_time(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let millis: Option<i64> = self.read_number(StoreKey::CourseStartTime).await?;
        Ok(millis.and_then(from_unix_millis))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn set_course_start_time(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.write_raw(StoreKey::CourseStartTime, &to_unix_millis(at).to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn completion_time_seconds(&self) -> Result<Option<u64>, StorageError> {
        self.read_number(StoreKey::CompletionTimeSeconds).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn set_completion_time_seconds(&self, secs: u64) -> Result<(), StorageError> {
        self.write_raw(StoreKey::CompletionTimeSeconds, &secs.to_string())
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the record is malformed.
    pub async fn time_bonus(&self) -> Result<Option<TimeBonus>, StorageError> {
        self.read_json(StoreKey::TimeBonus).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    pub async fn set_time_bonus(&self, bonus: &TimeBonus) -> Result<(), StorageError> {
        self.write_json(StoreKey::TimeBonus, bonus).await
    }

    // ─── Certificates ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the registry is malformed.
    pub async fn certificate_registry(&self) -> Result<CertificateRegistry, StorageError> {
        Ok(self
            .read_json(StoreKey::CertificateRegistry)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the registry cannot be stored.
    pub async fn set_certificate_registry(
        &self,
        registry: &CertificateRegistry,
    ) -> Result<(), StorageError> {
        self.write_json(StoreKey::CertificateRegistry, registry)
            .await
    }

    // ─── Whole snapshot ────────────────────────────────────────────────────

    /// Reads every learner field at once.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` hit while reading.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot, StorageError> {
        Ok(ProgressSnapshot {
            unlocked_step: self.unlocked_step().await?,
            score: self.score().await?,
            student_profile: self.student_profile().await?,
            research_notes: self.research_notes().await?,
            theme: self.theme().await?,
            course_start_time: self.course_start_time().await?,
            completion_time_seconds: self.completion_time_seconds().await?,
            satisfaction_rating: self.satisfaction_rating().await?,
            time_bonus: self.time_bonus().await?,
        })
    }

    /// Forgets course progress while keeping the profile, theme, notes and
    /// certificate registry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a key cannot be removed.
    pub async fn reset_progress(&self) -> Result<(), StorageError> {
        for key in [
            StoreKey::UnlockedStep,
            StoreKey::PlayerScore,
            StoreKey::CourseStartTime,
            StoreKey::CompletionTimeSeconds,
            StoreKey::SatisfactionRating,
            StoreKey::TimeBonus,
        ] {
            self.kv.remove(key.as_str()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::time::fixed_now;

    #[tokio::test]
    async fn defaults_when_empty() {
        let store = ProgressStore::in_memory();
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot, ProgressSnapshot::default());
    }

    #[tokio::test]
    async fn scalars_are_read_leniently() {
        let storage = Storage::in_memory();
        let store = ProgressStore::from_storage(&storage);
        storage.kv.set("unlockedStep", "abc").await.unwrap();
        storage.kv.set("playerScore", "").await.unwrap();
        storage.kv.set("theme", "sepia").await.unwrap();
        storage.kv.set("satisfactionRating", "9").await.unwrap();

        assert_eq!(store.unlocked_step().await.unwrap(), StepId::FIRST);
        assert_eq!(store.score().await.unwrap(), 0);
        assert_eq!(store.theme().await.unwrap(), Theme::Light);
        assert_eq!(
            store.satisfaction_rating().await.unwrap(),
            SatisfactionRating::UNRATED
        );

        storage.kv.set("unlockedStep", "0").await.unwrap();
        assert_eq!(store.unlocked_step().await.unwrap(), StepId::FIRST);
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let storage = Storage::in_memory();
        let store = ProgressStore::from_storage(&storage);
        storage.kv.set("studentData", "{not json").await.unwrap();
        assert!(matches!(
            store.student_profile().await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn add_points_clamps_at_zero() {
        let store = ProgressStore::in_memory();
        assert_eq!(store.add_points(30).await.unwrap(), 30);
        assert_eq!(store.add_points(-50).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn timer_fields_round_trip() {
        let store = ProgressStore::in_memory();
        store.set_course_start_time(fixed_now()).await.unwrap();
        store.set_completion_time_seconds(1865).await.unwrap();
        store
            .set_time_bonus(&TimeBonus::from_elapsed(1865))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.course_start_time, Some(fixed_now()));
        assert_eq!(snapshot.completion_time_seconds, Some(1865));
        assert_eq!(snapshot.time_bonus.unwrap().points, 25);
    }

    #[tokio::test]
    async fn reset_keeps_profile_and_theme() {
        let store = ProgressStore::in_memory();
        let profile = StudentProfile::new("Ada", 36, "🐍", "beginner", "data").unwrap();
        store.set_student_profile(&profile).await.unwrap();
        store.set_theme(Theme::Dark).await.unwrap();
        store.set_unlocked_step(StepId::new(7)).await.unwrap();
        store.set_score(90).await.unwrap();

        store.reset_progress().await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.unlocked_step, StepId::FIRST);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.theme, Theme::Dark);
        assert_eq!(snapshot.student_name(), Some("Ada"));
    }
}
