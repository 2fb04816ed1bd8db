//! Declarative description of a lesson: its steps and their activities.

use std::collections::HashSet;
use std::path::Path;

use lesson_core::model::{ActivityId, ActivityKind, BonusTier, StepId};
use lesson_core::scoring::POINTS_PER_ACTIVITY;
use lesson_core::widgets::{CodeBlock, Concept, Definition};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::lesson::ProgressionConfig;
use crate::sandbox::CompletionRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub title: String,
    pub steps: Vec<StepPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub id: StepId,
    pub title: String,
    /// Overrides the activity count used for completion. Defaults to the
    /// number of listed activities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_activities: Option<u32>,
    #[serde(default)]
    pub activities: Vec<ActivityPlan>,
}

impl StepPlan {
    #[must_use]
    pub fn declared_total(&self) -> u32 {
        self.total_activities
            .unwrap_or_else(|| u32::try_from(self.activities.len()).unwrap_or(u32::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPlan {
    pub id: ActivityId,
    /// Whether a first correct, unrevealed answer earns points.
    #[serde(default)]
    pub scored: bool,
    #[serde(flatten)]
    pub widget: WidgetPlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetPlan {
    Quiz {
        prompt: String,
        options: Vec<String>,
        correct: usize,
    },
    CodeChallenge {
        prompt: String,
        required: Vec<String>,
        expected_output: String,
        solution: String,
    },
    DragDrop {
        blocks: Vec<CodeBlock>,
    },
    Matching {
        concepts: Vec<Concept>,
        definitions: Vec<Definition>,
    },
    /// Uses the built-in Python vocabulary puzzle.
    WordSearch,
    Survey,
    Note,
    Profile,
    Sandbox {
        starter_code: String,
        #[serde(default)]
        completion: CompletionRule,
    },
}

impl WidgetPlan {
    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        match self {
            WidgetPlan::Quiz { .. } => ActivityKind::Quiz,
            WidgetPlan::CodeChallenge { .. } => ActivityKind::CodeChallenge,
            WidgetPlan::DragDrop { .. } => ActivityKind::DragDrop,
            WidgetPlan::Matching { .. } => ActivityKind::Matching,
            WidgetPlan::WordSearch => ActivityKind::WordSearch,
            WidgetPlan::Survey => ActivityKind::Survey,
            WidgetPlan::Note => ActivityKind::Note,
            WidgetPlan::Profile => ActivityKind::Profile,
            WidgetPlan::Sandbox { .. } => ActivityKind::Sandbox,
        }
    }
}

impl LessonPlan {
    /// Parse and validate a JSON plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` for malformed JSON or inconsistent ids.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let plan: LessonPlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    /// # Errors
    ///
    /// Returns `PlanError` if the file cannot be read or is not a valid plan.
    pub fn from_path(path: &Path) -> Result<Self, PlanError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks that the plan has steps and that step and activity ids are unique.
    ///
    /// Widget data is validated when a session builds its widgets.
    ///
    /// # Errors
    ///
    /// Returns the first `PlanError` found.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut steps = HashSet::new();
        let mut activities = HashSet::new();
        for step in &self.steps {
            if !steps.insert(step.id) {
                return Err(PlanError::DuplicateStep(step.id));
            }
            for activity in &step.activities {
                if !activities.insert(activity.id) {
                    return Err(PlanError::DuplicateActivity(activity.id));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&StepPlan> {
        self.steps.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn last_step(&self) -> Option<StepId> {
        self.steps.iter().map(|s| s.id).max()
    }

    /// Score of a flawless run through the plan, gold time bonus included.
    #[must_use]
    pub fn max_possible_score(&self, progression: &ProgressionConfig) -> u32 {
        let steps = u32::try_from(self.steps.len()).unwrap_or(u32::MAX);
        let scored = self
            .steps
            .iter()
            .flat_map(|s| &s.activities)
            .filter(|a| a.scored)
            .count();
        let scored = u32::try_from(scored).unwrap_or(u32::MAX);
        let bonus = if self.step(progression.bonus_step).is_some() {
            BonusTier::Gold.points()
        } else {
            0
        };
        progression
            .points_per_step
            .saturating_mul(steps)
            .saturating_add(POINTS_PER_ACTIVITY.saturating_mul(scored))
            .saturating_add(bonus)
    }

    /// The built-in fifteen-step introduction to Python.
    #[must_use]
    pub fn python_intro() -> Self {
        Self {
            title: "Introduction to Python".to_owned(),
            steps: vec![
                step(1, "Welcome", vec![plain(101, WidgetPlan::Profile)]),
                step(
                    2,
                    "What is Python?",
                    vec![quiz(
                        201,
                        false,
                        "Python is best described as...",
                        &["A compiled systems language", "A high-level, interpreted language", "A markup language"],
                        1,
                    )],
                ),
                step(
                    3,
                    "Variables",
                    vec![
                        sandbox(301, "name = \"Ada\"\nprint(\"Hello, \" + name)", CompletionRule::OnRun),
                        quiz(
                            302,
                            false,
                            "Which line creates a variable?",
                            &["print(x)", "x = 10", "def x():"],
                            1,
                        ),
                    ],
                ),
                step(
                    4,
                    "Data types",
                    vec![quiz(
                        401,
                        false,
                        "What is the type of 3.14?",
                        &["int", "str", "float", "bool"],
                        2,
                    )],
                ),
                step(5, "A short break", vec![]),
                step(
                    6,
                    "Conditionals",
                    vec![drag_drop(
                        601,
                        &[
                            "age = 20",
                            "if age >= 18:",
                            "    print(\"Adult\")",
                            "else:",
                            "    print(\"Minor\")",
                        ],
                    )],
                ),
                step(
                    7,
                    "Loops",
                    vec![
                        sandbox(701, "for i in range(3):\n    print(i)", CompletionRule::OnRun),
                        drag_drop(
                            702,
                            &["total = 0", "for n in [1, 2, 3]:", "    total += n", "print(total)"],
                        ),
                    ],
                ),
                step(
                    8,
                    "Collections",
                    vec![ActivityPlan {
                        id: ActivityId::new(801),
                        scored: false,
                        widget: WidgetPlan::Matching {
                            concepts: vec![
                                concept(1, "list", "list"),
                                concept(2, "tuple", "tuple"),
                                concept(3, "dict", "dict"),
                                concept(4, "set", "set"),
                            ],
                            definitions: vec![
                                definition("dict", "Key-value pairs"),
                                definition("list", "Ordered and mutable"),
                                definition("set", "Unordered, no duplicates"),
                                definition("tuple", "Ordered and immutable"),
                            ],
                        },
                    }],
                ),
                step(9, "Research", vec![plain(901, WidgetPlan::Note)]),
                step(10, "Word search", vec![plain(1001, WidgetPlan::WordSearch)]),
                step(
                    11,
                    "Assessment",
                    vec![
                        quiz(
                            1101,
                            true,
                            "Which function prints to the screen?",
                            &["echo()", "print()", "write()"],
                            1,
                        ),
                        quiz(
                            1102,
                            true,
                            "Which keyword starts a loop over a sequence?",
                            &["for", "loop", "each"],
                            0,
                        ),
                        quiz(
                            1103,
                            true,
                            "What does len([1, 2, 3]) return?",
                            &["2", "3", "6"],
                            1,
                        ),
                        challenge(
                            1104,
                            "Add 15 and 30 and print the result.",
                            &["15", "30", "+"],
                            "45",
                            "a = 15\nb = 30\nprint(a + b)",
                        ),
                        challenge(
                            1105,
                            "Print \"Adult\" when age is at least 18, otherwise \"Minor\".",
                            &["age", ">= 18", "if", "else"],
                            "Adult",
                            "age = 25\nif age >= 18:\n    print(\"Adult\")\nelse:\n    print(\"Minor\")",
                        ),
                    ],
                ),
                step(
                    12,
                    "Final challenge",
                    vec![sandbox(
                        1201,
                        "salary = float(input())\nprint(salary * 1.1)",
                        CompletionRule::OnSuccess,
                    )],
                ),
                step(13, "Next steps", vec![]),
                step(14, "Certificate", vec![]),
                step(15, "Feedback", vec![plain(1501, WidgetPlan::Survey)]),
            ],
        }
    }
}

fn step(id: u32, title: &str, activities: Vec<ActivityPlan>) -> StepPlan {
    StepPlan {
        id: StepId::new(id),
        title: title.to_owned(),
        total_activities: None,
        activities,
    }
}

fn plain(id: u32, widget: WidgetPlan) -> ActivityPlan {
    ActivityPlan {
        id: ActivityId::new(id),
        scored: false,
        widget,
    }
}

fn quiz(id: u32, scored: bool, prompt: &str, options: &[&str], correct: usize) -> ActivityPlan {
    ActivityPlan {
        id: ActivityId::new(id),
        scored,
        widget: WidgetPlan::Quiz {
            prompt: prompt.to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
        },
    }
}

fn challenge(
    id: u32,
    prompt: &str,
    required: &[&str],
    expected_output: &str,
    solution: &str,
) -> ActivityPlan {
    ActivityPlan {
        id: ActivityId::new(id),
        scored: true,
        widget: WidgetPlan::CodeChallenge {
            prompt: prompt.to_owned(),
            required: required.iter().map(|r| (*r).to_owned()).collect(),
            expected_output: expected_output.to_owned(),
            solution: solution.to_owned(),
        },
    }
}

fn drag_drop(id: u32, lines: &[&str]) -> ActivityPlan {
    let blocks = (0u32..)
        .zip(lines)
        .map(|(order, text)| CodeBlock {
            id: id * 10 + order,
            order,
            text: (*text).to_owned(),
        })
        .collect();
    plain(id, WidgetPlan::DragDrop { blocks })
}

fn sandbox(id: u32, starter_code: &str, completion: CompletionRule) -> ActivityPlan {
    plain(
        id,
        WidgetPlan::Sandbox {
            starter_code: starter_code.to_owned(),
            completion,
        },
    )
}

fn concept(id: u32, label: &str, match_id: &str) -> Concept {
    Concept {
        id,
        label: label.to_owned(),
        match_id: match_id.to_owned(),
    }
}

fn definition(match_id: &str, text: &str) -> Definition {
    Definition {
        match_id: match_id.to_owned(),
        text: text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_course_is_valid() {
        let plan = LessonPlan::python_intro();
        plan.validate().unwrap();
        assert_eq!(plan.steps.len(), 15);
        assert_eq!(plan.last_step(), Some(StepId::new(15)));
        assert_eq!(plan.step(StepId::new(5)).unwrap().declared_total(), 0);
        assert_eq!(plan.step(StepId::new(11)).unwrap().declared_total(), 5);
    }

    #[test]
    fn max_score_counts_unlocks_scored_answers_and_gold_bonus() {
        let plan = LessonPlan::python_intro();
        let config = ProgressionConfig::default();
        assert_eq!(plan.max_possible_score(&config), 15 * 10 + 5 * 10 + 50);

        let no_bonus = ProgressionConfig {
            bonus_step: StepId::new(99),
            points_per_step: 5,
            ..ProgressionConfig::default()
        };
        assert_eq!(plan.max_possible_score(&no_bonus), 15 * 5 + 5 * 10);
    }

    #[test]
    fn parses_json_with_flattened_widgets() {
        let json = r#"{
            "title": "Mini",
            "steps": [
                {"id": 1, "title": "One", "total_activities": 3, "activities": [
                    {"id": 10, "scored": true, "kind": "quiz",
                     "prompt": "2 + 2?", "options": ["3", "4"], "correct": 1},
                    {"id": 11, "kind": "note"},
                    {"id": 12, "kind": "sandbox", "starter_code": "print(1)",
                     "completion": "on_success"}
                ]},
                {"id": 2, "title": "Two"}
            ]
        }"#;
        let plan = LessonPlan::from_json(json).unwrap();
        let first = plan.step(StepId::new(1)).unwrap();
        assert_eq!(first.declared_total(), 3);
        assert!(first.activities[0].scored);
        assert_eq!(first.activities[0].widget.kind(), ActivityKind::Quiz);
        assert_eq!(first.activities[1].widget, WidgetPlan::Note);
        assert_eq!(
            first.activities[2].widget,
            WidgetPlan::Sandbox {
                starter_code: "print(1)".into(),
                completion: CompletionRule::OnSuccess,
            }
        );
        assert!(plan.step(StepId::new(2)).unwrap().activities.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{"title": "Dup", "steps": [
            {"id": 1, "title": "a", "activities": [{"id": 5, "kind": "note"}]},
            {"id": 2, "title": "b", "activities": [{"id": 5, "kind": "survey"}]}
        ]}"#;
        assert!(matches!(
            LessonPlan::from_json(json),
            Err(PlanError::DuplicateActivity(id)) if id == ActivityId::new(5)
        ));

        let json = r#"{"title": "Dup", "steps": [
            {"id": 1, "title": "a"}, {"id": 1, "title": "b"}
        ]}"#;
        assert!(matches!(
            LessonPlan::from_json(json),
            Err(PlanError::DuplicateStep(_))
        ));
        assert!(matches!(
            LessonPlan::from_json(r#"{"title": "x", "steps": []}"#),
            Err(PlanError::Empty)
        ));
    }
}
