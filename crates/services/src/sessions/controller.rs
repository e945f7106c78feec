use tracing::{debug, info, warn};

use retain_core::model::{QuestionId, QuestionRecord, QuizMode, VideoDuration, VideoUrl};
use retain_core::protocol::{HostMessage, VisibilityDirective};

use super::end_quiz::EndOfVideoQuiz;
use super::timed::TimedSession;
use super::view::QuizView;
use crate::error::{QuestionSourceError, QuizError};
use crate::question_source::QuestionRequest;

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

/// Viewer actions coming from the rendered quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    ChooseMode(QuizMode),
    Submit {
        question_id: QuestionId,
        option: String,
    },
    Next,
    Close,
    ReviewSubmit {
        option: String,
    },
    ReviewNext,
    ReviewPrevious,
    ReviewDismiss,
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// Coarse lifecycle of the embedded quiz.
#[derive(Debug)]
pub enum Stage {
    /// Waiting for the viewer to pick when to be quizzed.
    ChoosingMode,
    /// Mode chosen; waiting for the video URL or the question source.
    Loading,
    Timed(TimedSession),
    EndOfVideo(EndOfVideoQuiz),
    /// Source failed or returned nothing. Terminal.
    Unavailable,
    /// The host navigated to another page. Terminal.
    Discarded,
}

/// Latest values seen on each telemetry stream.
#[derive(Debug, Clone, Default)]
struct LatestTelemetry {
    url: Option<VideoUrl>,
    current_time: Option<f64>,
    duration: VideoDuration,
    ended: bool,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owner of all quiz state inside the embedded context.
///
/// Every input (telemetry, fetch outcome, viewer command) goes through here and
/// nothing else mutates the session. The visibility directive is derived from
/// the current stage and only handed out when it changes.
#[derive(Debug)]
pub struct QuizController {
    mode: Option<QuizMode>,
    telemetry: LatestTelemetry,
    session_url: Option<VideoUrl>,
    requested: bool,
    stage: Stage,
    last_directive: Option<VisibilityDirective>,
}

impl Default for QuizController {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: None,
            telemetry: LatestTelemetry::default(),
            session_url: None,
            requested: false,
            stage: Stage::ChoosingMode,
            last_directive: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Option<QuizMode> {
        self.mode
    }

    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[must_use]
    pub fn session_url(&self) -> Option<&VideoUrl> {
        self.session_url.as_ref()
    }

    /// Most recent valid URL reported by the host.
    #[must_use]
    pub fn latest_url(&self) -> Option<&VideoUrl> {
        self.telemetry.url.as_ref()
    }

    #[must_use]
    pub fn is_discarded(&self) -> bool {
        matches!(self.stage, Stage::Discarded)
    }

    /// # Errors
    ///
    /// Returns `QuizError::ModeAlreadyChosen` on any second choice and
    /// `QuizError::SessionEnded` once the session was discarded.
    pub fn choose_mode(&mut self, mode: QuizMode) -> Result<(), QuizError> {
        if let Some(existing) = self.mode {
            return Err(QuizError::ModeAlreadyChosen(existing));
        }
        if !matches!(self.stage, Stage::ChoosingMode) {
            return Err(QuizError::SessionEnded);
        }
        info!(%mode, "quiz mode chosen");
        self.mode = Some(mode);
        self.stage = Stage::Loading;
        Ok(())
    }

    /// Apply one telemetry message. Duplicates and stale values are harmless.
    pub fn apply(&mut self, message: HostMessage) {
        match message {
            HostMessage::VideoUrl { video_url } => self.observe_url(&video_url),
            HostMessage::CurrentTime { current_time } => {
                if current_time.is_finite() && current_time >= 0.0 {
                    self.telemetry.current_time = Some(current_time);
                } else {
                    debug!(current_time, "ignoring invalid playback time");
                }
            }
            HostMessage::VideoDuration { video_duration } => {
                let duration = VideoDuration::from_secs(video_duration);
                if duration.is_known() {
                    self.telemetry.duration = duration;
                }
            }
            HostMessage::VideoEnded { video_ended } => {
                self.telemetry.ended = video_ended;
            }
        }
        self.evaluate();
    }

    fn observe_url(&mut self, raw: &str) {
        let url = match VideoUrl::parse(raw) {
            Ok(url) => url,
            Err(err) => {
                debug!(%err, "ignoring video url");
                return;
            }
        };

        let Some(session_url) = &self.session_url else {
            self.session_url = Some(url.clone());
            self.telemetry.url = Some(url);
            return;
        };
        if *session_url != url && !self.is_discarded() {
            info!(from = %session_url, to = %url, "host navigated; discarding quiz session");
            self.stage = Stage::Discarded;
        }
        self.telemetry.url = Some(url);
    }

    /// The single question request of this session, once mode and URL are known.
    ///
    /// Latched: every later call returns `None`.
    pub fn take_fetch_request(&mut self) -> Option<QuestionRequest> {
        if self.requested || !matches!(self.stage, Stage::Loading) {
            return None;
        }
        let mode = self.mode?;
        let url = self.session_url.as_ref()?;
        self.requested = true;
        Some(QuestionRequest::new(url, mode))
    }

    /// Accept the outcome of the question request.
    ///
    /// Errors and empty lists both end the quiz for this session.
    pub fn questions_loaded(&mut self, result: Result<Vec<QuestionRecord>, QuestionSourceError>) {
        if !matches!(self.stage, Stage::Loading) {
            debug!("ignoring question list outside loading stage");
            return;
        }
        let Some(mode) = self.mode else {
            return;
        };

        let questions = match result {
            Ok(questions) if questions.is_empty() => {
                warn!("question source returned no questions; quiz unavailable");
                self.stage = Stage::Unavailable;
                return;
            }
            Ok(questions) => questions,
            Err(err) => {
                warn!(%err, "question source failed; quiz unavailable");
                self.stage = Stage::Unavailable;
                return;
            }
        };

        info!(count = questions.len(), %mode, "questions loaded");
        self.stage = if mode.requires_timestamps() {
            match TimedSession::new(questions) {
                Ok(session) => Stage::Timed(session),
                Err(_) => Stage::Unavailable,
            }
        } else {
            match EndOfVideoQuiz::new(questions) {
                Ok(quiz) => Stage::EndOfVideo(quiz),
                Err(_) => Stage::Unavailable,
            }
        };
        self.evaluate();
    }

    /// Apply a viewer action.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the action is not available in the current state.
    pub fn handle_command(&mut self, command: QuizCommand) -> Result<(), QuizError> {
        match command {
            QuizCommand::ChooseMode(mode) => self.choose_mode(mode)?,
            QuizCommand::Submit {
                question_id,
                option,
            } => self.timed_mut()?.submit(&question_id, &option)?,
            QuizCommand::Next => {
                self.timed_mut()?.advance()?;
            }
            QuizCommand::Close => self.timed_mut()?.close()?,
            QuizCommand::ReviewSubmit { option } => self.review_mut()?.submit(&option)?,
            QuizCommand::ReviewNext => self.review_mut()?.next()?,
            QuizCommand::ReviewPrevious => self.review_mut()?.previous()?,
            QuizCommand::ReviewDismiss => self.review_mut()?.dismiss()?,
        }
        self.evaluate();
        Ok(())
    }

    fn timed_mut(&mut self) -> Result<&mut TimedSession, QuizError> {
        match &mut self.stage {
            Stage::Timed(session) => Ok(session),
            _ => Err(QuizError::NotAwaitingAnswer),
        }
    }

    fn review_mut(&mut self) -> Result<&mut EndOfVideoQuiz, QuizError> {
        match &mut self.stage {
            Stage::EndOfVideo(quiz) => Ok(quiz),
            _ => Err(QuizError::ReviewNotVisible),
        }
    }

    /// Bring the stage up to date with the latest telemetry.
    fn evaluate(&mut self) {
        let hand_off = match &mut self.stage {
            Stage::Timed(session) => {
                if let Some(time) = self.telemetry.current_time {
                    session.tick(time, self.telemetry.duration);
                }
                self.mode
                    .is_some_and(|mode| session.should_hand_off(mode))
                    .then(|| session.questions().to_vec())
            }
            _ => None,
        };

        if let Some(questions) = hand_off {
            info!(count = questions.len(), "timed quiz finished; handing off to end-of-video quiz");
            self.stage = match EndOfVideoQuiz::new(questions) {
                Ok(quiz) => Stage::EndOfVideo(quiz),
                Err(_) => Stage::Unavailable,
            };
        }

        // The end flag is only trusted once the player reports a real length.
        if let Stage::EndOfVideo(quiz) = &mut self.stage
            && self.telemetry.duration.is_known()
            && quiz.observe_end(self.telemetry.ended)
        {
            info!(count = quiz.total(), "video ended; revealing end-of-video quiz");
        }
    }

    /// Directive implied by the current state, if the quiz has one to give.
    ///
    /// `None` while the viewer is still choosing a mode and after the session
    /// was discarded.
    #[must_use]
    pub fn visibility(&self) -> Option<VisibilityDirective> {
        match &self.stage {
            Stage::ChoosingMode | Stage::Discarded => None,
            Stage::Timed(session) if self.telemetry.duration.is_known() => {
                Some(session.visibility())
            }
            Stage::EndOfVideo(quiz) => Some(quiz.visibility()),
            Stage::Loading | Stage::Timed(_) | Stage::Unavailable => {
                Some(VisibilityDirective::Inactive)
            }
        }
    }

    /// Next directive to send to the host, only when it differs from the last one sent.
    pub fn take_directive(&mut self) -> Option<VisibilityDirective> {
        let current = self.visibility()?;
        if self.last_directive == Some(current) {
            return None;
        }
        self.last_directive = Some(current);
        Some(current)
    }

    #[must_use]
    pub fn view(&self) -> QuizView {
        QuizView::from_controller(self)
    }
}
