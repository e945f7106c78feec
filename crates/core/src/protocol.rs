//! Messages exchanged between the host page and the embedded quiz.
//!
//! Every payload is a JSON object tagged with a `type` field, the same shape a
//! `postMessage` call carries across the frame boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("message has no `type` field")]
    MissingType,
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

//
// ─── HOST → QUIZ ──────────────────────────────────────────────────────────────
//

/// Playback telemetry relayed from the host page into the quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    VideoUrl { video_url: String },
    CurrentTime { current_time: f64 },
    VideoDuration { video_duration: f64 },
    VideoEnded { video_ended: bool },
}

impl HostMessage {
    /// # Errors
    ///
    /// Returns `ProtocolError` when the payload is untagged or not a host message.
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        decode_tagged(value)
    }

    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if the message cannot be represented as JSON.
    pub fn encode(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

//
// ─── QUIZ → HOST ──────────────────────────────────────────────────────────────
//

/// Whether the quiz currently needs the viewer's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityDirective {
    /// A question is on screen: pause the video and show the quiz.
    Active,
    /// Nothing to show: resume the video and move the quiz off-screen.
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuizMessage {
    #[serde(rename = "APP_IS_NULL")]
    AppIsNull,
    #[serde(rename = "APP_IS_NOT_NULL")]
    AppIsNotNull,
}

impl QuizMessage {
    /// # Errors
    ///
    /// Returns `ProtocolError` when the payload is untagged or not a quiz message.
    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        decode_tagged(value)
    }

    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if the message cannot be represented as JSON.
    pub fn encode(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<VisibilityDirective> for QuizMessage {
    fn from(directive: VisibilityDirective) -> Self {
        match directive {
            VisibilityDirective::Active => QuizMessage::AppIsNotNull,
            VisibilityDirective::Inactive => QuizMessage::AppIsNull,
        }
    }
}

impl From<QuizMessage> for VisibilityDirective {
    fn from(message: QuizMessage) -> Self {
        match message {
            QuizMessage::AppIsNotNull => VisibilityDirective::Active,
            QuizMessage::AppIsNull => VisibilityDirective::Inactive,
        }
    }
}

fn decode_tagged<T: for<'de> Deserialize<'de>>(value: &Value) -> Result<T, ProtocolError> {
    if value.get("type").is_none() {
        return Err(ProtocolError::MissingType);
    }
    Ok(T::deserialize(value)?)
}
