//! Shared error types for the services crate.

use thiserror::Error;

use retain_core::model::{AnswerError, QuestionId, QuizMode};
use retain_core::protocol::ProtocolError;

/// Errors emitted by question sources.
///
/// The controller never retries: any of these ends the session's quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error("question source returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not read preloaded questions: {0}")]
    Io(#[from] std::io::Error),
    #[error("preloaded questions are malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("question fetch task failed: {0}")]
    Task(String),
}

/// Errors emitted by the quiz state machines for rejected viewer actions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz mode already chosen ({0})")]
    ModeAlreadyChosen(QuizMode),
    #[error("quiz session has ended")]
    SessionEnded,
    #[error("no questions available for quiz")]
    NoQuestions,
    #[error("no question is awaiting an answer")]
    NotAwaitingAnswer,
    #[error("question {0} is not the active question")]
    NotActive(QuestionId),
    #[error("{option:?} is not an option of question {question}")]
    InvalidOption { question: QuestionId, option: String },
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("next question is not ready")]
    NextNotReady,
    #[error("question panel cannot be closed right now")]
    CloseUnavailable,
    #[error("end-of-video quiz is not on screen")]
    ReviewNotVisible,
    #[error("current review question already submitted")]
    ReviewAlreadySubmitted,
    #[error("no review question in that direction")]
    ReviewOutOfRange,
}

/// Errors emitted by the cross-context message channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChannelError {
    #[error("peer context is gone")]
    Closed,
    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} has an invalid value: {raw:?}")]
    InvalidValue { var: &'static str, raw: String },
}
