use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("question {0} has already been answered")]
    AlreadyAnswered(QuestionId),
}

//
// ─── WIRE FORMAT ──────────────────────────────────────────────────────────────
//

/// Identifier as sent by the question source; either form is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireQuestionId {
    Text(String),
    Number(i64),
}

impl From<WireQuestionId> for QuestionId {
    fn from(value: WireQuestionId) -> Self {
        match value {
            WireQuestionId::Text(text) => QuestionId::new(text),
            WireQuestionId::Number(n) => QuestionId::new(n.to_string()),
        }
    }
}

/// A question exactly as the question source returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WireQuestionId>,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

//
// ─── QUESTION RECORD ──────────────────────────────────────────────────────────
//

/// A multiple-choice question with a stable session identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    timestamp: Option<f64>,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        timestamp: Option<f64>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
            timestamp: timestamp.filter(|t| t.is_finite()),
        }
    }

    /// Convert a freshly fetched list into session records.
    ///
    /// Ids are assigned here and only here: a question without an id gets the
    /// position-derived one, and a repeated id is suffixed with its position so
    /// every record stays addressable in the answered map.
    #[must_use]
    pub fn from_wire_list(wire: Vec<WireQuestion>) -> Vec<Self> {
        let mut seen: HashSet<QuestionId> = HashSet::with_capacity(wire.len());

        wire.into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut id = raw
                    .id
                    .map_or_else(|| QuestionId::positional(index), QuestionId::from);
                while seen.contains(&id) {
                    id = QuestionId::new(format!("{id}#{index}"));
                }
                seen.insert(id.clone());

                Self::new(
                    id,
                    raw.question,
                    raw.options,
                    raw.correct_answer,
                    raw.timestamp,
                )
            })
            .collect()
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Raw target time in seconds, before checkpoint rounding.
    #[must_use]
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

//
// ─── ANSWERED MAP ─────────────────────────────────────────────────────────────
//

/// Answers given during a session. Append-only: answers are final.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsweredMap(HashMap<QuestionId, String>);

impl AnsweredMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the option chosen for a question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::AlreadyAnswered` if the question already has an answer.
    pub fn insert(&mut self, id: QuestionId, option: impl Into<String>) -> Result<(), AnswerError> {
        if self.0.contains_key(&id) {
            return Err(AnswerError::AlreadyAnswered(id));
        }
        self.0.insert(id, option.into());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.0.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
