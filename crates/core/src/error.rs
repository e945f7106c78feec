use thiserror::Error;

use crate::model::{AnswerError, QuizModeError, VideoUrlError};
use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    QuizMode(#[from] QuizModeError),
    #[error(transparent)]
    VideoUrl(#[from] VideoUrlError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}
