use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use retain_core::model::{QuestionRecord, QuizMode, VideoUrl, WireQuestion};

use crate::config::QuestionSourceConfig;
use crate::error::QuestionSourceError;

/// Body of a question generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRequest {
    pub video_url: String,
    pub timestamped: bool,
}

impl QuestionRequest {
    #[must_use]
    pub fn new(video_url: &VideoUrl, mode: QuizMode) -> Self {
        Self {
            video_url: video_url.as_str().to_owned(),
            timestamped: mode.requires_timestamps(),
        }
    }
}

/// Anything that can hand the controller a list of questions for a video.
///
/// The quiz state machines only ever see the returned records, so a live
/// backend and an already-loaded list are interchangeable.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `QuestionSourceError` when the questions cannot be obtained.
    async fn fetch_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuestionRecord>, QuestionSourceError>;
}

//
// ─── LIVE SOURCE ───────────────────────────────────────────────────────────────
//

/// Calls the question generation backend over HTTP.
#[derive(Clone)]
pub struct LiveQuestionSource {
    client: Client,
    config: QuestionSourceConfig,
}

impl LiveQuestionSource {
    /// # Errors
    ///
    /// Returns `QuestionSourceError::Http` if the HTTP client cannot be built.
    pub fn new(config: QuestionSourceConfig) -> Result<Self, QuestionSourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl QuestionSource for LiveQuestionSource {
    async fn fetch_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<QuestionRecord>, QuestionSourceError> {
        info!(
            endpoint = %self.config.endpoint,
            video_url = %request.video_url,
            timestamped = request.timestamped,
            "requesting questions"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuestionSourceError::HttpStatus(response.status()));
        }

        let wire: Vec<WireQuestion> = response.json().await?;
        debug!(count = wire.len(), "questions received");
        Ok(QuestionRecord::from_wire_list(wire))
    }
}

//
// ─── PRELOADED SOURCE ──────────────────────────────────────────────────────────
//

/// Pass-through source for questions that are already in hand.
#[derive(Debug, Clone, Default)]
pub struct PreloadedQuestionSource {
    questions: Vec<QuestionRecord>,
}

impl PreloadedQuestionSource {
    #[must_use]
    pub fn new(questions: Vec<QuestionRecord>) -> Self {
        Self { questions }
    }

    /// Load a list saved in the backend's response format.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError::Io` or `QuestionSourceError::Decode` when
    /// the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, QuestionSourceError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// # Errors
    ///
    /// Returns `QuestionSourceError::Decode` when `raw` is not a question list.
    pub fn from_json_str(raw: &str) -> Result<Self, QuestionSourceError> {
        let wire: Vec<WireQuestion> = serde_json::from_str(raw)?;
        Ok(Self::new(QuestionRecord::from_wire_list(wire)))
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }
}

#[async_trait]
impl QuestionSource for PreloadedQuestionSource {
    async fn fetch_questions(
        &self,
        _request: &QuestionRequest,
    ) -> Result<Vec<QuestionRecord>, QuestionSourceError> {
        Ok(self.questions.clone())
    }
}
