use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::prompt::{Prompt, PromptError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A question record that cannot drive a game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: unknown interaction type {kind:?}")]
    UnknownKind { id: QuestionId, kind: String },

    #[error("question {id}: missing field `{field}` for {kind}")]
    MissingField {
        id: QuestionId,
        kind: &'static str,
        field: &'static str,
    },

    #[error("question {id}: invalid `{field}`: {reason}")]
    InvalidField {
        id: QuestionId,
        field: &'static str,
        reason: String,
    },

    #[error("question {id}: {source}")]
    Prompt {
        id: QuestionId,
        #[source]
        source: PromptError,
    },
}

//
// ─── INTERACTION TYPES ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Arithmetic operation of an equation game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operation {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "+" | "add" | "addition" => Some(Self::Add),
            "-" | "sub" | "subtraction" => Some(Self::Sub),
            "*" | "x" | "×" | "mul" | "multiplication" => Some(Self::Mul),
            "/" | "÷" | "div" | "division" => Some(Self::Div),
            _ => None,
        }
    }

    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Sub => '-',
            Operation::Mul => '×',
            Operation::Div => '÷',
        }
    }
}

/// The four mini-game variants and the parameters each needs to be judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Tap items until exactly `target_colored` of `total_items` are colored.
    ColorUp { total_items: u32, target_colored: u32 },
    /// Drag `values` into order.
    Sort { values: Vec<i64>, order: SortOrder },
    /// Drag items out of a box that starts with `start_in_box` until `target_in_box` remain.
    Box { start_in_box: u32, target_in_box: u32 },
    /// `operand1 <op> ? = result`; the learner drags the missing operand's items.
    Equation {
        operand1: u32,
        operation: Operation,
        result: u32,
    },
}

impl QuestionKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::ColorUp { .. } => "color-up",
            QuestionKind::Sort { .. } => "sort",
            QuestionKind::Box { .. } => "box",
            QuestionKind::Equation { .. } => "equation",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated practice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: Prompt,
    pub kind: QuestionKind,
}

/// Loose JSON shape served by the content backend.
///
/// Every type-specific field is optional here; `Question::try_from` checks that
/// the ones the declared type needs are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(rename = "type", alias = "gameType")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_colored: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_in_box: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_in_box: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand1: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<u32>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let prompt =
            Prompt::parse(record.prompt).map_err(|source| QuestionError::Prompt { id, source })?;

        fn require<T>(
            value: Option<T>,
            id: QuestionId,
            kind: &'static str,
            field: &'static str,
        ) -> Result<T, QuestionError> {
            value.ok_or(QuestionError::MissingField { id, kind, field })
        }

        let kind = match record.kind.trim().to_ascii_lowercase().as_str() {
            "color-up" | "colorup" | "color_up" => {
                let total_items = require(record.total_items, id, "color-up", "totalItems")?;
                let target_colored =
                    require(record.target_colored, id, "color-up", "targetColored")?;
                if target_colored > total_items {
                    return Err(QuestionError::InvalidField {
                        id,
                        field: "targetColored",
                        reason: format!("{target_colored} exceeds totalItems {total_items}"),
                    });
                }
                QuestionKind::ColorUp {
                    total_items,
                    target_colored,
                }
            }
            "sort" => {
                let values = require(record.values, id, "sort", "values")?;
                if values.is_empty() {
                    return Err(QuestionError::InvalidField {
                        id,
                        field: "values",
                        reason: "no values to sort".into(),
                    });
                }
                let order = match record.order {
                    None => SortOrder::Ascending,
                    Some(raw) => SortOrder::parse(&raw).ok_or(QuestionError::InvalidField {
                        id,
                        field: "order",
                        reason: format!("unknown sort order {raw:?}"),
                    })?,
                };
                QuestionKind::Sort { values, order }
            }
            "box" => {
                let start_in_box = require(record.start_in_box, id, "box", "startInBox")?;
                let target_in_box = require(record.target_in_box, id, "box", "targetInBox")?;
                if target_in_box > start_in_box {
                    return Err(QuestionError::InvalidField {
                        id,
                        field: "targetInBox",
                        reason: format!("{target_in_box} exceeds startInBox {start_in_box}"),
                    });
                }
                QuestionKind::Box {
                    start_in_box,
                    target_in_box,
                }
            }
            "equation" => {
                let operand1 = require(record.operand1, id, "equation", "operand1")?;
                let raw_op = require(record.operation, id, "equation", "operation")?;
                let operation = Operation::parse(&raw_op).ok_or(QuestionError::InvalidField {
                    id,
                    field: "operation",
                    reason: format!("unknown operation {raw_op:?}"),
                })?;
                let result = require(record.result, id, "equation", "result")?;
                QuestionKind::Equation {
                    operand1,
                    operation,
                    result,
                }
            }
            _ => {
                return Err(QuestionError::UnknownKind {
                    id,
                    kind: record.kind,
                });
            }
        };

        Ok(Self { id, prompt, kind })
    }
}

//
// ─── QUIZ QUESTIONS ────────────────────────────────────────────────────────────
//

/// A multiple-choice question of a level quiz. Not judged until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: QuestionId,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizQuestion {
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.correct_answer.trim()
    }
}

/// A quiz question used by the initial placement quiz, tagged with the level it probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementQuestion {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub level: u32,
}
