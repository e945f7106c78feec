use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizModeError {
    #[error("unknown quiz mode: {0}")]
    Unknown(String),
}

/// When the viewer wants to be quizzed about the video.
///
/// Chosen once per session and never changed afterwards:
/// - `Throughout`: questions pop up at their checkpoints while the video plays
/// - `End`: all questions are shown once the video has ended
/// - `Both`: timed questions first, then the full list again at the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizMode {
    Throughout,
    End,
    Both,
}

impl QuizMode {
    /// Whether the question source must attach a timestamp to every question.
    #[must_use]
    pub fn requires_timestamps(self) -> bool {
        matches!(self, QuizMode::Throughout | QuizMode::Both)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizMode::Throughout => "Throughout",
            QuizMode::End => "End",
            QuizMode::Both => "Both",
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = QuizModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Throughout" | "throughout" => Ok(QuizMode::Throughout),
            "End" | "end" => Ok(QuizMode::End),
            "Both" | "both" => Ok(QuizMode::Both),
            other => Err(QuizModeError::Unknown(other.to_owned())),
        }
    }
}
