use lesson_core::model::{ActivityId, FinalResults, StepId, StudentProfile, Theme};
use lesson_core::widgets::{Cell, DropOutcome, QuizOutcome};
use serde::Deserialize;

use crate::error::LessonError;

use super::progression::UnlockOutcome;
use super::session::{
    AssessmentScore, ChallengeResult, CompletionReport, LessonSession, QuizAnswer, SandboxRun,
    WordHit,
};

/// A learner interaction, as sent by a front end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LessonCommand {
    ShowStep {
        step: StepId,
    },
    Unlock {
        step: StepId,
    },
    ResetStep {
        step: StepId,
    },
    Assessment {
        step: StepId,
    },
    AnswerQuiz {
        activity: ActivityId,
        option: usize,
    },
    RevealQuiz {
        activity: ActivityId,
    },
    CheckChallenge {
        activity: ActivityId,
        code: String,
    },
    RevealChallenge {
        activity: ActivityId,
    },
    PlaceBlock {
        activity: ActivityId,
        block: u32,
    },
    ReturnBlock {
        activity: ActivityId,
        block: u32,
    },
    CheckDragDrop {
        activity: ActivityId,
    },
    ResetDragDrop {
        activity: ActivityId,
    },
    DropConcept {
        activity: ActivityId,
        concept: u32,
        definition: usize,
    },
    ResetMatching {
        activity: ActivityId,
    },
    /// A full drag, cells in the order they were crossed.
    SelectWord {
        activity: ActivityId,
        cells: Vec<Cell>,
    },
    RevealWord {
        activity: ActivityId,
    },
    RunSandbox {
        activity: ActivityId,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        stdin: Vec<String>,
    },
    SubmitProfile {
        activity: ActivityId,
        profile: StudentProfile,
    },
    SaveNotes {
        activity: ActivityId,
        notes: String,
    },
    Rate {
        activity: ActivityId,
        stars: u8,
    },
    SetTheme {
        theme: Theme,
    },
    ToggleTheme,
    FinishCourse,
}

/// Result of [`LessonSession::dispatch`], one variant per command family.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandOutcome {
    Done,
    StepShown { completed: bool },
    Unlocked(UnlockOutcome),
    PointsRemoved(u32),
    Assessment(AssessmentScore),
    Quiz(QuizAnswer),
    Revealed { option: usize, report: CompletionReport },
    Challenge(ChallengeResult),
    Ordered { correct: bool, report: CompletionReport },
    Dropped { outcome: DropOutcome, report: CompletionReport },
    Word(Option<WordHit>),
    Sandbox(SandboxRun),
    Completed(CompletionReport),
    Theme(Theme),
    Finished(FinalResults),
}

impl CommandOutcome {
    /// Quiz outcome, when the command answered a quiz.
    #[must_use]
    pub fn quiz_outcome(&self) -> Option<QuizOutcome> {
        match self {
            CommandOutcome::Quiz(answer) => Some(answer.outcome),
            _ => None,
        }
    }
}

impl LessonSession {
    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation.
    pub async fn dispatch(&mut self, command: LessonCommand) -> Result<CommandOutcome, LessonError> {
        let outcome = match command {
            LessonCommand::ShowStep { step } => CommandOutcome::StepShown {
                completed: self.show_step(step)?.is_some(),
            },
            LessonCommand::Unlock { step } => CommandOutcome::Unlocked(self.unlock(step).await?),
            LessonCommand::ResetStep { step } => {
                CommandOutcome::PointsRemoved(self.reset_step(step).await?)
            }
            LessonCommand::Assessment { step } => {
                CommandOutcome::Assessment(self.assessment_score(step)?)
            }
            LessonCommand::AnswerQuiz { activity, option } => {
                CommandOutcome::Quiz(self.answer_quiz(activity, option).await?)
            }
            LessonCommand::RevealQuiz { activity } => {
                let (option, report) = self.reveal_quiz(activity).await?;
                CommandOutcome::Revealed { option, report }
            }
            LessonCommand::CheckChallenge { activity, code } => {
                CommandOutcome::Challenge(self.check_challenge(activity, &code).await?)
            }
            LessonCommand::RevealChallenge { activity } => {
                CommandOutcome::Challenge(self.reveal_challenge(activity).await?)
            }
            LessonCommand::PlaceBlock { activity, block } => {
                self.place_block(activity, block)?;
                CommandOutcome::Done
            }
            LessonCommand::ReturnBlock { activity, block } => {
                self.return_block(activity, block)?;
                CommandOutcome::Done
            }
            LessonCommand::CheckDragDrop { activity } => {
                let (correct, report) = self.check_drag_drop(activity).await?;
                CommandOutcome::Ordered { correct, report }
            }
            LessonCommand::ResetDragDrop { activity } => {
                self.reset_drag_drop(activity)?;
                CommandOutcome::Done
            }
            LessonCommand::DropConcept {
                activity,
                concept,
                definition,
            } => {
                let (outcome, report) = self.drop_concept(activity, concept, definition).await?;
                CommandOutcome::Dropped { outcome, report }
            }
            LessonCommand::ResetMatching { activity } => {
                self.reset_matching(activity)?;
                CommandOutcome::Done
            }
            LessonCommand::SelectWord { activity, cells } => {
                let mut path = cells.into_iter();
                let Some(first) = path.next() else {
                    return Ok(CommandOutcome::Word(None));
                };
                self.begin_selection(activity, first)?;
                for cell in path {
                    self.extend_selection(activity, cell)?;
                }
                CommandOutcome::Word(self.finish_selection(activity).await?)
            }
            LessonCommand::RevealWord { activity } => {
                CommandOutcome::Word(self.reveal_word(activity).await?)
            }
            LessonCommand::RunSandbox {
                activity,
                code,
                stdin,
            } => CommandOutcome::Sandbox(
                self.run_sandbox(activity, code.as_deref(), &stdin).await?,
            ),
            LessonCommand::SubmitProfile { activity, profile } => {
                CommandOutcome::Completed(self.submit_profile(activity, &profile).await?)
            }
            LessonCommand::SaveNotes { activity, notes } => {
                CommandOutcome::Completed(self.save_notes(activity, &notes).await?)
            }
            LessonCommand::Rate { activity, stars } => {
                CommandOutcome::Completed(self.rate(activity, stars).await?)
            }
            LessonCommand::SetTheme { theme } => {
                self.set_theme(theme).await?;
                CommandOutcome::Theme(theme)
            }
            LessonCommand::ToggleTheme => CommandOutcome::Theme(self.toggle_theme().await?),
            LessonCommand::FinishCourse => CommandOutcome::Finished(self.finish_course().await?),
        };
        Ok(outcome)
    }
}
