use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use lesson_core::Clock;
use lesson_core::model::{
    ActivityId, ActivityKind, FinalResults, ProgressSnapshot, SatisfactionRating, StepId,
    StepState, StudentProfile, Theme,
};
use lesson_core::scoring::{POINTS_PER_ACTIVITY, activity_award};
use lesson_core::widgets::{
    Cell, ChallengeJudge, ChallengeSpec, CheckOutcome, CodeChallenge, DragDropExercise,
    DropOutcome, HeuristicJudge, MatchingExercise, QuizOutcome, QuizQuestion, WordSearch,
};
use rand::Rng;
use storage::ProgressStore;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{LessonError, PlanError};
use crate::events::{EventBus, LessonEvent};
use crate::host::HostNotifier;
use crate::plan::{ActivityPlan, LessonPlan, WidgetPlan};
use crate::sandbox::{CodeRunner, CompletionRule, PythonProcessRunner, RunOutput};
use crate::survey::SurveyService;

use super::aggregator::{StepCompleted, StepCompletionAggregator};
use super::progression::{ProgressionConfig, ProgressionController, UnlockOutcome};
use super::tracker::{ActivityTracker, MarkOutcome};

//
// ─── CONTEXT ───────────────────────────────────────────────────────────────────
//

/// Collaborators a session needs. Defaults suit a local, offline run.
#[derive(Clone)]
pub struct SessionContext {
    pub store: ProgressStore,
    pub notifier: Arc<dyn HostNotifier>,
    pub clock: Clock,
    pub progression: ProgressionConfig,
    pub judge: Arc<dyn ChallengeJudge>,
    pub runner: Arc<dyn CodeRunner>,
    pub survey: SurveyService,
}

impl SessionContext {
    #[must_use]
    pub fn new(store: ProgressStore, notifier: Arc<dyn HostNotifier>) -> Self {
        Self {
            survey: SurveyService::new(store.clone(), None),
            store,
            notifier,
            clock: Clock::default(),
            progression: ProgressionConfig::default(),
            judge: Arc::new(HeuristicJudge),
            runner: Arc::new(PythonProcessRunner::default()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_progression(mut self, config: ProgressionConfig) -> Self {
        self.progression = config;
        self
    }

    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn ChallengeJudge>) -> Self {
        self.judge = judge;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CodeRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_survey(mut self, survey: SurveyService) -> Self {
        self.survey = survey;
        self
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// What an interaction did to the activity and its step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionReport {
    /// The activity became completed by this call.
    pub newly_completed: bool,
    pub points_awarded: u32,
    /// The step's unlock control became enabled by this call.
    pub step_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizAnswer {
    pub outcome: QuizOutcome,
    pub report: CompletionReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResult {
    pub outcome: CheckOutcome,
    pub report: CompletionReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRun {
    pub output: RunOutput,
    pub report: CompletionReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordHit {
    pub word: String,
    pub concept: String,
    pub cells: Vec<Cell>,
    pub report: CompletionReport,
}

/// Points earned inside a step versus points on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentScore {
    pub earned: u32,
    pub possible: u32,
}

impl fmt::Display for AssessmentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.earned, self.possible)
    }
}

//
// ─── WIDGETS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct SandboxExercise {
    starter_code: String,
    completion: CompletionRule,
}

#[derive(Debug, Clone)]
enum Widget {
    Quiz(QuizQuestion),
    Challenge(CodeChallenge),
    DragDrop(DragDropExercise),
    Matching(MatchingExercise),
    WordSearch(WordSearch),
    Sandbox(SandboxExercise),
    /// Profile form, notes and survey keep their data in the store.
    Form,
}

fn build_widget<R: Rng + ?Sized>(plan: &ActivityPlan, rng: &mut R) -> Result<Widget, PlanError> {
    let invalid = |source: lesson_core::Error| PlanError::Widget {
        activity: plan.id,
        source,
    };
    let widget = match &plan.widget {
        WidgetPlan::Quiz {
            prompt,
            options,
            correct,
        } => Widget::Quiz(
            QuizQuestion::new(prompt.clone(), options.clone(), *correct)
                .map_err(|e| invalid(e.into()))?,
        ),
        WidgetPlan::CodeChallenge {
            prompt,
            required,
            expected_output,
            solution,
        } => Widget::Challenge(
            CodeChallenge::new(ChallengeSpec {
                id: plan.id,
                prompt: prompt.clone(),
                required: required.clone(),
                expected_output: expected_output.clone(),
                solution: solution.clone(),
            })
            .map_err(|e| invalid(e.into()))?,
        ),
        WidgetPlan::DragDrop { blocks } => {
            let mut exercise =
                DragDropExercise::new(blocks.clone()).map_err(|e| invalid(e.into()))?;
            exercise.shuffle_source(rng);
            Widget::DragDrop(exercise)
        }
        WidgetPlan::Matching {
            concepts,
            definitions,
        } => Widget::Matching(
            MatchingExercise::new(concepts.clone(), definitions.clone())
                .map_err(|e| invalid(e.into()))?,
        ),
        WidgetPlan::WordSearch => {
            Widget::WordSearch(WordSearch::python_basics().map_err(|e| invalid(e.into()))?)
        }
        WidgetPlan::Sandbox {
            starter_code,
            completion,
        } => Widget::Sandbox(SandboxExercise {
            starter_code: starter_code.clone(),
            completion: *completion,
        }),
        WidgetPlan::Survey | WidgetPlan::Note | WidgetPlan::Profile => Widget::Form,
    };
    Ok(widget)
}

fn build_widgets<R: Rng + ?Sized>(
    plan: &LessonPlan,
    rng: &mut R,
) -> Result<HashMap<ActivityId, Widget>, PlanError> {
    let mut widgets = HashMap::new();
    for activity in plan.steps.iter().flat_map(|s| &s.activities) {
        widgets.insert(activity.id, build_widget(activity, rng)?);
    }
    Ok(widgets)
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner working through a lesson.
///
/// Owns the tracker, aggregator, progression controller and every widget, and
/// is initialised from the persisted watermark. All widget interactions go
/// through here so completion, scoring and step signals stay consistent.
pub struct LessonSession {
    plan: LessonPlan,
    tracker: ActivityTracker,
    aggregator: StepCompletionAggregator,
    progression: ProgressionController,
    widgets: HashMap<ActivityId, Widget>,
    scored: HashSet<ActivityId>,
    judge: Arc<dyn ChallengeJudge>,
    runner: Arc<dyn CodeRunner>,
    survey: SurveyService,
    events: EventBus,
    current_step: StepId,
}

impl LessonSession {
    /// Starts a session, shuffling drag-and-drop sources with the thread RNG.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the plan's widget data is invalid or the
    /// watermark cannot be read.
    pub async fn start(plan: LessonPlan, ctx: SessionContext) -> Result<Self, LessonError> {
        let widgets = build_widgets(&plan, &mut rand::rng())?;
        Self::assemble(plan, ctx, widgets).await
    }

    /// Like [`LessonSession::start`] with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Same as [`LessonSession::start`].
    pub async fn start_with_rng<R: Rng + ?Sized>(
        plan: LessonPlan,
        ctx: SessionContext,
        rng: &mut R,
    ) -> Result<Self, LessonError> {
        let widgets = build_widgets(&plan, rng)?;
        Self::assemble(plan, ctx, widgets).await
    }

    async fn assemble(
        plan: LessonPlan,
        ctx: SessionContext,
        widgets: HashMap<ActivityId, Widget>,
    ) -> Result<Self, LessonError> {
        let watermark = ctx.store.unlocked_step().await?;
        let tracker = ActivityTracker::from_plan(&plan, watermark);
        let scored = plan
            .steps
            .iter()
            .flat_map(|s| &s.activities)
            .filter(|a| a.scored)
            .map(|a| a.id)
            .collect();
        let first = plan.steps.first().map_or(StepId::FIRST, |s| s.id);
        let progression =
            ProgressionController::new(ctx.store, ctx.notifier, ctx.clock, ctx.progression);
        info!(title = %plan.title, %watermark, "lesson session started");
        Ok(Self {
            plan,
            tracker,
            aggregator: StepCompletionAggregator,
            progression,
            widgets,
            scored,
            judge: ctx.judge,
            runner: ctx.runner,
            survey: ctx.survey,
            events: EventBus::new(),
            current_step: first,
        })
    }

    // ─── Read access ───────────────────────────────────────────────────────

    #[must_use]
    pub fn plan(&self) -> &LessonPlan {
        &self.plan
    }

    #[must_use]
    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    #[must_use]
    pub fn step_state(&self, step: StepId) -> Option<&StepState> {
        self.tracker.step(step)
    }

    #[must_use]
    pub fn can_unlock(&self, step: StepId) -> bool {
        self.tracker.step(step).is_some_and(StepState::can_unlock)
    }

    #[must_use]
    pub fn is_completed(&self, step: StepId, activity: ActivityId) -> bool {
        self.tracker.is_completed(step, activity)
    }

    #[must_use]
    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    #[must_use]
    pub fn progression(&self) -> &ProgressionController {
        &self.progression
    }

    /// Clock used for timers; tests advance it between operations.
    pub fn clock_mut(&mut self) -> &mut Clock {
        self.progression.clock_mut()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LessonEvent> {
        self.events.subscribe()
    }

    /// First activity of the given kind, in plan order.
    #[must_use]
    pub fn first_activity_of(&self, kind: ActivityKind) -> Option<ActivityId> {
        self.plan
            .steps
            .iter()
            .flat_map(|s| &s.activities)
            .find(|a| a.widget.kind() == kind)
            .map(|a| a.id)
    }

    #[must_use]
    pub fn quiz(&self, activity: ActivityId) -> Option<&QuizQuestion> {
        match self.widgets.get(&activity) {
            Some(Widget::Quiz(q)) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn challenge(&self, activity: ActivityId) -> Option<&CodeChallenge> {
        match self.widgets.get(&activity) {
            Some(Widget::Challenge(c)) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn drag_drop(&self, activity: ActivityId) -> Option<&DragDropExercise> {
        match self.widgets.get(&activity) {
            Some(Widget::DragDrop(d)) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn matching(&self, activity: ActivityId) -> Option<&MatchingExercise> {
        match self.widgets.get(&activity) {
            Some(Widget::Matching(m)) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn word_search(&self, activity: ActivityId) -> Option<&WordSearch> {
        match self.widgets.get(&activity) {
            Some(Widget::WordSearch(w)) => Some(w),
            _ => None,
        }
    }

    #[must_use]
    pub fn sandbox_starter(&self, activity: ActivityId) -> Option<&str> {
        match self.widgets.get(&activity) {
            Some(Widget::Sandbox(s)) => Some(s.starter_code.as_str()),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot, LessonError> {
        Ok(self.progression.store().snapshot().await?)
    }

    // ─── Navigation & progression ──────────────────────────────────────────

    /// Makes `step` the active one and evaluates it, which completes steps
    /// without activities. Returns the signal when the step just completed.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::UnknownStep` for steps outside the plan.
    pub fn show_step(&mut self, step: StepId) -> Result<Option<StepCompleted>, LessonError> {
        if self.tracker.step(step).is_none() {
            return Err(LessonError::UnknownStep(step));
        }
        if let Some(previous) = self.tracker.step_mut(self.current_step) {
            previous.set_active(false);
        }
        if let Some(state) = self.tracker.step_mut(step) {
            state.set_active(true);
        }
        self.current_step = step;
        Ok(self.evaluate_step(step))
    }

    fn evaluate_step(&mut self, step: StepId) -> Option<StepCompleted> {
        let signal = self.aggregator.evaluate(&self.tracker, step)?;
        let changed = self
            .tracker
            .step_mut(step)
            .is_some_and(StepState::mark_completed);
        if !changed {
            return None;
        }
        debug!(%step, "step completed");
        self.events.publish(LessonEvent::StepCompleted { step });
        Some(signal)
    }

    /// # Errors
    ///
    /// Returns `LessonError::UnknownStep`, or the progression error when the
    /// step is not completed.
    pub async fn unlock(&mut self, step: StepId) -> Result<UnlockOutcome, LessonError> {
        let state = self
            .tracker
            .step_mut(step)
            .ok_or(LessonError::UnknownStep(step))?;
        let outcome = self.progression.unlock(state).await?;
        if let UnlockOutcome::Unlocked {
            unlocked_step,
            bonus,
        } = &outcome
        {
            if let Some(bonus) = bonus {
                self.events.publish(LessonEvent::BonusAwarded(bonus.clone()));
            }
            self.events.publish(LessonEvent::StepUnlocked {
                step,
                unlocked_step: *unlocked_step,
            });
        }
        Ok(outcome)
    }

    /// Points earned in `step` from scored activities, out of the points on offer.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::UnknownStep` for steps outside the plan.
    pub fn assessment_score(&self, step: StepId) -> Result<AssessmentScore, LessonError> {
        if self.tracker.step(step).is_none() {
            return Err(LessonError::UnknownStep(step));
        }
        let mut score = AssessmentScore {
            earned: 0,
            possible: 0,
        };
        for record in self.tracker.records_of(step) {
            if !self.scored.contains(&record.id()) {
                continue;
            }
            score.possible += POINTS_PER_ACTIVITY;
            if record.is_completed() {
                score.earned += activity_award(record, true);
            }
        }
        Ok(score)
    }

    /// Clears every activity of `step`, takes back the points they earned and
    /// disables the unlock control again. Returns the points removed.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::StepLocked` once the step is unlocked.
    pub async fn reset_step(&mut self, step: StepId) -> Result<u32, LessonError> {
        let state = self
            .tracker
            .step(step)
            .ok_or(LessonError::UnknownStep(step))?;
        if state.is_unlocked() {
            return Err(LessonError::StepLocked(step));
        }
        let earned = self.assessment_score(step)?.earned;
        let activities: Vec<ActivityId> =
            self.tracker.records_of(step).iter().map(|r| r.id()).collect();

        self.tracker.reset_step(step);
        for id in activities {
            match self.widgets.get_mut(&id) {
                Some(Widget::Quiz(q)) => q.reset(),
                Some(Widget::Challenge(c)) => c.reset(),
                Some(Widget::DragDrop(d)) => d.reset(),
                Some(Widget::Matching(m)) => m.reset(),
                Some(Widget::WordSearch(w)) => w.reset(),
                Some(Widget::Sandbox(_) | Widget::Form) | None => {}
            }
        }
        if earned > 0 {
            self.award(-i64::from(earned)).await?;
        }
        info!(%step, points_removed = earned, "step reset");
        self.events.publish(LessonEvent::StepReset {
            step,
            points_removed: earned,
        });
        Ok(earned)
    }

    /// Reads the closing results and notifies the host.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the results cannot be read.
    pub async fn finish_course(&self) -> Result<FinalResults, LessonError> {
        Ok(self.progression.finish_course().await?)
    }

    // ─── Completion plumbing ───────────────────────────────────────────────

    fn touch(&mut self, activity: ActivityId) -> Result<StepId, LessonError> {
        let step = self
            .tracker
            .step_of(activity)
            .ok_or(LessonError::UnknownActivity(activity))?;
        if let Some(state) = self.tracker.step_mut(step) {
            state.touch();
        }
        Ok(step)
    }

    async fn award(&self, delta: i64) -> Result<u32, LessonError> {
        let total = self.progression.award_points(delta).await?;
        self.events
            .publish(LessonEvent::ScoreChanged { delta, total });
        Ok(total)
    }

    /// Marks the activity completed, awards its points and re-evaluates the
    /// step. Repeat completions are no-ops.
    async fn complete(&mut self, activity: ActivityId) -> Result<CompletionReport, LessonError> {
        let step = self
            .tracker
            .step_of(activity)
            .ok_or(LessonError::UnknownActivity(activity))?;
        match self.tracker.mark_completed(step, activity) {
            MarkOutcome::Marked => {}
            MarkOutcome::AlreadyCompleted => return Ok(CompletionReport::default()),
            MarkOutcome::Unknown => return Err(LessonError::UnknownActivity(activity)),
        }

        // Unlocked steps are settled; answering again there earns nothing.
        let frozen = self.tracker.step(step).is_some_and(StepState::is_unlocked);
        let points = match self.tracker.record(activity) {
            Some(record) if !frozen => activity_award(record, self.scored.contains(&activity)),
            _ => 0,
        };
        if points > 0 {
            self.award(i64::from(points)).await?;
        }
        self.events.publish(LessonEvent::ActivityCompleted {
            step,
            activity,
            points,
        });
        let step_completed = self.evaluate_step(step).is_some();
        Ok(CompletionReport {
            newly_completed: true,
            points_awarded: points,
            step_completed,
        })
    }

    fn kind(&self, activity: ActivityId) -> Result<ActivityKind, LessonError> {
        self.tracker
            .kind_of(activity)
            .ok_or(LessonError::UnknownActivity(activity))
    }

    fn expect_kind(&self, activity: ActivityId, expected: ActivityKind) -> Result<(), LessonError> {
        let actual = self.kind(activity)?;
        if actual == expected {
            Ok(())
        } else {
            Err(LessonError::WrongKind {
                activity,
                expected,
                actual,
            })
        }
    }

    fn wrong_kind(activity: ActivityId, expected: ActivityKind, actual: ActivityKind) -> LessonError {
        LessonError::WrongKind {
            activity,
            expected,
            actual,
        }
    }

    fn judge_activity(&mut self, activity: ActivityId, correct: bool) {
        if let Some(record) = self.tracker.record_mut(activity) {
            record.record_judgement(correct);
        }
    }

    fn reveal_activity(&mut self, activity: ActivityId) {
        if let Some(record) = self.tracker.record_mut(activity) {
            record.mark_revealed();
        }
    }

    // ─── Quiz ──────────────────────────────────────────────────────────────

    fn quiz_mut(&mut self, activity: ActivityId) -> Result<&mut QuizQuestion, LessonError> {
        let kind = self.kind(activity)?;
        match self.widgets.get_mut(&activity) {
            Some(Widget::Quiz(q)) => Ok(q),
            _ => Err(Self::wrong_kind(activity, ActivityKind::Quiz, kind)),
        }
    }

    /// Answers a quiz. A correct first pick completes the activity.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyAnswered` for a second pick.
    pub async fn answer_quiz(
        &mut self,
        activity: ActivityId,
        option: usize,
    ) -> Result<QuizAnswer, LessonError> {
        self.touch(activity)?;
        let outcome = self.quiz_mut(activity)?.select(option)?;
        self.judge_activity(activity, outcome.is_correct());
        let report = if outcome.is_correct() {
            self.complete(activity).await?
        } else {
            CompletionReport::default()
        };
        Ok(QuizAnswer { outcome, report })
    }

    /// Reveals the correct option and completes the activity for zero points.
    ///
    /// # Errors
    ///
    /// Returns a `QuizError` after a correct answer or a previous reveal.
    pub async fn reveal_quiz(
        &mut self,
        activity: ActivityId,
    ) -> Result<(usize, CompletionReport), LessonError> {
        self.touch(activity)?;
        let correct = self.quiz_mut(activity)?.reveal()?;
        self.reveal_activity(activity);
        let report = self.complete(activity).await?;
        Ok((correct, report))
    }

    // ─── Code challenge ────────────────────────────────────────────────────

    fn challenge_mut(&mut self, activity: ActivityId) -> Result<&mut CodeChallenge, LessonError> {
        let kind = self.kind(activity)?;
        match self.widgets.get_mut(&activity) {
            Some(Widget::Challenge(c)) => Ok(c),
            _ => Err(Self::wrong_kind(activity, ActivityKind::CodeChallenge, kind)),
        }
    }

    /// Checks submitted code. Only a correct check completes the activity.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::AlreadyChecked` until the step is reset.
    pub async fn check_challenge(
        &mut self,
        activity: ActivityId,
        code: &str,
    ) -> Result<ChallengeResult, LessonError> {
        self.touch(activity)?;
        let judge = Arc::clone(&self.judge);
        let outcome = self.challenge_mut(activity)?.check(code, judge.as_ref())?;
        self.judge_activity(activity, outcome.correct);
        let report = if outcome.correct {
            self.complete(activity).await?
        } else {
            CompletionReport::default()
        };
        Ok(ChallengeResult { outcome, report })
    }

    /// Pre-fills and checks the canonical solution. The activity completes
    /// for zero points whatever the check says.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::AlreadyChecked` after a check.
    pub async fn reveal_challenge(
        &mut self,
        activity: ActivityId,
    ) -> Result<ChallengeResult, LessonError> {
        self.touch(activity)?;
        let judge = Arc::clone(&self.judge);
        let outcome = self
            .challenge_mut(activity)?
            .reveal_solution(judge.as_ref())?;
        self.reveal_activity(activity);
        self.judge_activity(activity, outcome.correct);
        let report = self.complete(activity).await?;
        Ok(ChallengeResult { outcome, report })
    }

    // ─── Drag and drop ─────────────────────────────────────────────────────

    fn drag_drop_mut(&mut self, activity: ActivityId) -> Result<&mut DragDropExercise, LessonError> {
        let kind = self.kind(activity)?;
        match self.widgets.get_mut(&activity) {
            Some(Widget::DragDrop(d)) => Ok(d),
            _ => Err(Self::wrong_kind(activity, ActivityKind::DragDrop, kind)),
        }
    }

    /// # Errors
    ///
    /// Returns `DragDropError::UnknownBlock` for foreign blocks.
    pub fn place_block(&mut self, activity: ActivityId, block: u32) -> Result<(), LessonError> {
        self.touch(activity)?;
        self.drag_drop_mut(activity)?.place(block)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DragDropError::UnknownBlock` for foreign blocks.
    pub fn return_block(&mut self, activity: ActivityId, block: u32) -> Result<(), LessonError> {
        self.drag_drop_mut(activity)?.return_block(block)?;
        Ok(())
    }

    /// Checks the block order; the right order completes the activity.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non drag-and-drop activities.
    pub async fn check_drag_drop(
        &mut self,
        activity: ActivityId,
    ) -> Result<(bool, CompletionReport), LessonError> {
        self.touch(activity)?;
        let correct = self.drag_drop_mut(activity)?.check();
        if !correct {
            return Ok((false, CompletionReport::default()));
        }
        self.judge_activity(activity, true);
        Ok((true, self.complete(activity).await?))
    }

    /// Returns every placed block to the source tray.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non drag-and-drop activities.
    pub fn reset_drag_drop(&mut self, activity: ActivityId) -> Result<(), LessonError> {
        self.drag_drop_mut(activity)?.reset();
        Ok(())
    }

    // ─── Matching ──────────────────────────────────────────────────────────

    fn matching_mut(&mut self, activity: ActivityId) -> Result<&mut MatchingExercise, LessonError> {
        let kind = self.kind(activity)?;
        match self.widgets.get_mut(&activity) {
            Some(Widget::Matching(m)) => Ok(m),
            _ => Err(Self::wrong_kind(activity, ActivityKind::Matching, kind)),
        }
    }

    /// Drops a concept on a definition. Matching every definition completes
    /// the activity.
    ///
    /// # Errors
    ///
    /// Returns a `MatchingError` for unknown or already matched concepts.
    pub async fn drop_concept(
        &mut self,
        activity: ActivityId,
        concept: u32,
        definition: usize,
    ) -> Result<(DropOutcome, CompletionReport), LessonError> {
        self.touch(activity)?;
        let exercise = self.matching_mut(activity)?;
        let outcome = exercise.drop_concept(concept, definition)?;
        let solved = exercise.check();
        if !solved {
            return Ok((outcome, CompletionReport::default()));
        }
        self.judge_activity(activity, true);
        Ok((outcome, self.complete(activity).await?))
    }

    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non-matching activities.
    pub fn reset_matching(&mut self, activity: ActivityId) -> Result<(), LessonError> {
        self.matching_mut(activity)?.reset();
        Ok(())
    }

    // ─── Word search ───────────────────────────────────────────────────────

    fn word_search_mut(&mut self, activity: ActivityId) -> Result<&mut WordSearch, LessonError> {
        let kind = self.kind(activity)?;
        match self.widgets.get_mut(&activity) {
            Some(Widget::WordSearch(w)) => Ok(w),
            _ => Err(Self::wrong_kind(activity, ActivityKind::WordSearch, kind)),
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non word-search activities.
    pub fn begin_selection(&mut self, activity: ActivityId, cell: Cell) -> Result<(), LessonError> {
        self.touch(activity)?;
        self.word_search_mut(activity)?.begin_selection(cell);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non word-search activities.
    pub fn extend_selection(&mut self, activity: ActivityId, cell: Cell) -> Result<(), LessonError> {
        self.word_search_mut(activity)?.extend_selection(cell);
        Ok(())
    }

    /// Ends a drag. Returns the word it found, if any.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non word-search activities.
    pub async fn finish_selection(
        &mut self,
        activity: ActivityId,
    ) -> Result<Option<WordHit>, LessonError> {
        let puzzle = self.word_search_mut(activity)?;
        let Some(index) = puzzle.finish_selection() else {
            return Ok(None);
        };
        let hidden = puzzle.words()[index].clone();
        let cells = hidden.cells();
        self.word_found(activity, hidden.word, hidden.concept, cells)
            .await
            .map(Some)
    }

    /// Reveals the next undiscovered word. `None` once all are found.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for unknown or non word-search activities.
    pub async fn reveal_word(&mut self, activity: ActivityId) -> Result<Option<WordHit>, LessonError> {
        self.touch(activity)?;
        let puzzle = self.word_search_mut(activity)?;
        let Some((index, cells)) = puzzle.reveal_next() else {
            return Ok(None);
        };
        let hidden = puzzle.words()[index].clone();
        self.word_found(activity, hidden.word, hidden.concept, cells)
            .await
            .map(Some)
    }

    async fn word_found(
        &mut self,
        activity: ActivityId,
        word: String,
        concept: String,
        cells: Vec<Cell>,
    ) -> Result<WordHit, LessonError> {
        self.events.publish(LessonEvent::WordFound {
            activity,
            word: word.clone(),
        });
        let complete = self.word_search_mut(activity)?.is_complete();
        let report = if complete {
            self.events
                .publish(LessonEvent::PuzzleCompleted { activity });
            self.complete(activity).await?
        } else {
            CompletionReport::default()
        };
        Ok(WordHit {
            word,
            concept,
            cells,
            report,
        })
    }

    // ─── Sandbox ───────────────────────────────────────────────────────────

    /// Runs learner code, or the starter code when `code` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::Busy` while another program is running.
    pub async fn run_sandbox(
        &mut self,
        activity: ActivityId,
        code: Option<&str>,
        stdin: &[String],
    ) -> Result<SandboxRun, LessonError> {
        self.touch(activity)?;
        let kind = self.kind(activity)?;
        let Some(Widget::Sandbox(exercise)) = self.widgets.get(&activity) else {
            return Err(Self::wrong_kind(activity, ActivityKind::Sandbox, kind));
        };
        let completion = exercise.completion;
        let code = code.map_or_else(|| exercise.starter_code.clone(), str::to_owned);

        let mut report = CompletionReport::default();
        if completion == CompletionRule::OnRun {
            report = self.complete(activity).await?;
        }
        let output = self.runner.run(&code, stdin).await?;
        if completion == CompletionRule::OnSuccess && output.succeeded() {
            report = self.complete(activity).await?;
        }
        Ok(SandboxRun { output, report })
    }

    // ─── Forms ─────────────────────────────────────────────────────────────

    /// Stores the profile, starts the course timer if needed and completes
    /// the profile activity.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for a non-profile activity or a storage failure.
    pub async fn submit_profile(
        &mut self,
        activity: ActivityId,
        profile: &StudentProfile,
    ) -> Result<CompletionReport, LessonError> {
        self.expect_kind(activity, ActivityKind::Profile)?;
        // Profiles decoded from commands skip the constructor's checks.
        let profile = StudentProfile::new(
            profile.name(),
            profile.age(),
            profile.avatar(),
            profile.experience_level(),
            profile.interest_area(),
        )?;
        self.touch(activity)?;
        self.progression
            .store()
            .set_student_profile(&profile)
            .await?;
        self.progression.start_timer_if_absent().await?;
        self.complete(activity).await
    }

    /// # Errors
    ///
    /// Returns `LessonError` for a non-note activity or a storage failure.
    pub async fn save_notes(
        &mut self,
        activity: ActivityId,
        notes: &str,
    ) -> Result<CompletionReport, LessonError> {
        self.expect_kind(activity, ActivityKind::Note)?;
        self.touch(activity)?;
        self.progression.store().set_research_notes(notes).await?;
        self.complete(activity).await
    }

    /// Stores and submits a satisfaction rating, completing the survey.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` outside `1..=5`.
    pub async fn rate(
        &mut self,
        activity: ActivityId,
        stars: u8,
    ) -> Result<CompletionReport, LessonError> {
        self.expect_kind(activity, ActivityKind::Survey)?;
        let rating = SatisfactionRating::new(stars)?;
        self.touch(activity)?;
        self.survey.record_rating(rating).await?;
        self.complete(activity).await
    }

    /// # Errors
    ///
    /// Returns a storage error if the theme cannot be stored.
    pub async fn set_theme(&self, theme: Theme) -> Result<(), LessonError> {
        self.progression.store().set_theme(theme).await?;
        Ok(())
    }

    /// Flips the persisted theme and returns the new one.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the theme cannot be read or stored.
    pub async fn toggle_theme(&self) -> Result<Theme, LessonError> {
        let store = self.progression.store();
        let theme = store.theme().await?.toggled();
        store.set_theme(theme).await?;
        Ok(theme)
    }
}
