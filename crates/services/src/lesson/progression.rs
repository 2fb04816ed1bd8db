use std::sync::Arc;
use std::time::Duration;

use lesson_core::Clock;
use lesson_core::model::{FinalResults, StepId, StepState, TimeBonus};
use lesson_core::scoring::POINTS_PER_STEP;
use storage::ProgressStore;
use tracing::{debug, info};

use crate::error::ProgressionError;
use crate::host::{HostMessage, HostNotifier};

#[derive(Debug, Clone)]
pub struct ProgressionConfig {
    /// Unlocking this step starts the course timer.
    pub timer_step: StepId,
    /// Unlocking this step computes the completion-time bonus.
    pub bonus_step: StepId,
    pub points_per_step: u32,
    /// `CLOSE_MODAL` is sent this long after an unlock; zero sends it inline.
    pub close_modal_delay: Duration,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            timer_step: StepId::FIRST,
            bonus_step: StepId::new(12),
            points_per_step: POINTS_PER_STEP,
            close_modal_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked {
        unlocked_step: StepId,
        /// Set when this unlock computed the completion-time bonus.
        bonus: Option<TimeBonus>,
    },
    /// The watermark already covers the next step; nothing was written or sent.
    AlreadyUnlocked,
}

/// Turns completed steps into persisted progress and host notifications.
#[derive(Clone)]
pub struct ProgressionController {
    store: ProgressStore,
    notifier: Arc<dyn HostNotifier>,
    clock: Clock,
    config: ProgressionConfig,
}

impl ProgressionController {
    #[must_use]
    pub fn new(
        store: ProgressStore,
        notifier: Arc<dyn HostNotifier>,
        clock: Clock,
        config: ProgressionConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Clock used for timers; tests advance it between operations.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Unlocks the step after `state`.
    ///
    /// Re-unlocking is guarded by the persisted watermark, so repeats (also
    /// across sessions) neither write nor notify.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::NotCompleted` while the step's unlock control
    /// is disabled, or a storage error.
    pub async fn unlock(&self, state: &mut StepState) -> Result<UnlockOutcome, ProgressionError> {
        let step = state.id();
        if !state.can_unlock() {
            return Err(ProgressionError::NotCompleted(step));
        }
        let next = step.next();
        let watermark = self.store.unlocked_step().await?;
        if next <= watermark {
            debug!(%step, %watermark, "step already unlocked; skipping");
            state.mark_unlocked();
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        let bonus = if step == self.config.bonus_step {
            self.compute_time_bonus().await?
        } else {
            None
        };

        if step == self.config.timer_step {
            self.store.set_course_start_time(self.clock.now()).await?;
            self.notifier.notify(HostMessage::StartTimer);
        }

        self.store.set_unlocked_step(next).await?;
        self.notifier.notify(HostMessage::UpdateProgress {
            unlocked_step: next.value(),
        });
        self.notifier.notify(HostMessage::StepUnlocked {
            step: step.value(),
        });
        let total = self
            .store
            .add_points(i64::from(self.config.points_per_step))
            .await?;
        state.mark_unlocked();
        info!(%step, unlocked_step = %next, score = total, "step unlocked");

        self.schedule_close_modal();

        Ok(UnlockOutcome::Unlocked {
            unlocked_step: next,
            bonus,
        })
    }

    /// Computes the completion-time bonus once per learner.
    ///
    /// Skipped when a bonus record exists or the course timer never started.
    async fn compute_time_bonus(&self) -> Result<Option<TimeBonus>, ProgressionError> {
        if self.store.time_bonus().await?.is_some() {
            debug!("time bonus already recorded");
            return Ok(None);
        }
        let Some(started) = self.store.course_start_time().await? else {
            debug!("course timer never started; no time bonus");
            return Ok(None);
        };

        let elapsed = self.clock.elapsed_secs_since(started);
        let bonus = TimeBonus::from_elapsed(elapsed);
        self.store.set_completion_time_seconds(elapsed).await?;
        self.store.set_time_bonus(&bonus).await?;
        self.award_points(i64::from(bonus.points)).await?;
        info!(elapsed, points = bonus.points, title = %bonus.title, "time bonus awarded");
        Ok(Some(bonus))
    }

    fn schedule_close_modal(&self) {
        let delay = self.config.close_modal_delay;
        if delay.is_zero() {
            self.notifier.notify(HostMessage::CloseModal);
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier.notify(HostMessage::CloseModal);
                });
            }
            Err(_) => notifier.notify(HostMessage::CloseModal),
        }
    }

    /// Persists a score change and tells the host. Returns the new total.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the score cannot be updated.
    pub async fn award_points(&self, delta: i64) -> Result<u32, ProgressionError> {
        let total = self.store.add_points(delta).await?;
        self.notifier.notify(HostMessage::AddPoints { points: delta });
        Ok(total)
    }

    /// Starts the course timer unless it is already running. Returns `true`
    /// when this call started it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the start time cannot be read or written.
    pub async fn start_timer_if_absent(&self) -> Result<bool, ProgressionError> {
        if self.store.course_start_time().await?.is_some() {
            return Ok(false);
        }
        self.store.set_course_start_time(self.clock.now()).await?;
        debug!("course timer started");
        Ok(true)
    }

    /// Reads the closing results and tells the host the course is over.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the results cannot be read.
    pub async fn finish_course(&self) -> Result<FinalResults, ProgressionError> {
        let results = FinalResults {
            score: self.store.score().await?,
            completion_time_seconds: self.store.completion_time_seconds().await?,
        };
        self.notifier.notify(HostMessage::ExtraContentVisited);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingNotifier;
    use lesson_core::time::{fixed_clock, fixed_now};

    fn controller(recorder: &RecordingNotifier) -> ProgressionController {
        ProgressionController::new(
            ProgressStore::in_memory(),
            Arc::new(recorder.clone()),
            fixed_clock(),
            ProgressionConfig {
                close_modal_delay: Duration::ZERO,
                ..ProgressionConfig::default()
            },
        )
    }

    fn completed(step: u32) -> StepState {
        let mut state = StepState::new(StepId::new(step), 0);
        state.mark_completed();
        state
    }

    #[tokio::test]
    async fn unlock_requires_completion() {
        let recorder = RecordingNotifier::new();
        let progression = controller(&recorder);
        let mut state = StepState::new(StepId::new(3), 2);
        assert!(matches!(
            progression.unlock(&mut state).await,
            Err(ProgressionError::NotCompleted(_))
        ));
        assert!(recorder.messages().is_empty());
    }

    #[tokio::test]
    async fn unlock_persists_and_notifies_once() {
        let recorder = RecordingNotifier::new();
        let progression = controller(&recorder);
        progression
            .store()
            .set_unlocked_step(StepId::new(3))
            .await
            .unwrap();

        let mut state = completed(3);
        let outcome = progression.unlock(&mut state).await.unwrap();
        assert_eq!(
            outcome,
            UnlockOutcome::Unlocked {
                unlocked_step: StepId::new(4),
                bonus: None
            }
        );
        assert_eq!(
            recorder.messages(),
            vec![
                HostMessage::UpdateProgress { unlocked_step: 4 },
                HostMessage::StepUnlocked { step: 3 },
                HostMessage::CloseModal,
            ]
        );

        let again = progression.unlock(&mut state).await.unwrap();
        assert_eq!(again, UnlockOutcome::AlreadyUnlocked);
        assert_eq!(recorder.messages().len(), 3);
        assert_eq!(
            progression.store().unlocked_step().await.unwrap(),
            StepId::new(4)
        );
        assert_eq!(progression.store().score().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn timer_step_records_start_time() {
        let recorder = RecordingNotifier::new();
        let progression = controller(&recorder);
        progression.unlock(&mut completed(1)).await.unwrap();

        assert_eq!(
            progression.store().course_start_time().await.unwrap(),
            Some(fixed_now())
        );
        assert_eq!(recorder.messages()[0], HostMessage::StartTimer);
    }

    #[tokio::test]
    async fn bonus_is_computed_once_and_needs_a_timer() {
        let recorder = RecordingNotifier::new();
        let mut progression = controller(&recorder);
        let store = progression.store().clone();
        store.set_unlocked_step(StepId::new(12)).await.unwrap();

        // No timer: no bonus.
        let outcome = progression.unlock(&mut completed(12)).await.unwrap();
        assert_eq!(
            outcome,
            UnlockOutcome::Unlocked {
                unlocked_step: StepId::new(13),
                bonus: None
            }
        );

        store.set_unlocked_step(StepId::new(12)).await.unwrap();
        store.set_course_start_time(fixed_now()).await.unwrap();
        progression
            .clock_mut()
            .advance(chrono::Duration::seconds(1799));
        let outcome = progression.unlock(&mut completed(12)).await.unwrap();
        let UnlockOutcome::Unlocked { bonus: Some(bonus), .. } = outcome else {
            panic!("expected a time bonus");
        };
        assert_eq!(bonus.points, 50);
        assert_eq!(store.completion_time_seconds().await.unwrap(), Some(1799));
        assert_eq!(
            recorder.count(|m| *m == HostMessage::AddPoints { points: 50 }),
            1
        );

        // A stored bonus is never recomputed.
        store.set_unlocked_step(StepId::new(12)).await.unwrap();
        progression
            .clock_mut()
            .advance(chrono::Duration::seconds(5000));
        let outcome = progression.unlock(&mut completed(12)).await.unwrap();
        assert!(matches!(outcome, UnlockOutcome::Unlocked { bonus: None, .. }));
        assert_eq!(store.time_bonus().await.unwrap().unwrap().points, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn close_modal_is_delayed() {
        let recorder = RecordingNotifier::new();
        let progression = ProgressionController::new(
            ProgressStore::in_memory(),
            Arc::new(recorder.clone()),
            fixed_clock(),
            ProgressionConfig::default(),
        );
        progression.unlock(&mut completed(2)).await.unwrap();
        assert_eq!(recorder.count(|m| *m == HostMessage::CloseModal), 0);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(recorder.count(|m| *m == HostMessage::CloseModal), 1);
    }

    #[tokio::test]
    async fn finish_course_reports_results() {
        let recorder = RecordingNotifier::new();
        let progression = controller(&recorder);
        progression.award_points(40).await.unwrap();
        let results = progression.finish_course().await.unwrap();
        assert_eq!(results.score, 40);
        assert_eq!(results.time_display(), None);
        assert_eq!(
            recorder.messages().last(),
            Some(&HostMessage::ExtraContentVisited)
        );
    }
}
