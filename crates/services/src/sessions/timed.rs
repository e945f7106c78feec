use std::fmt;

use retain_core::model::{AnsweredMap, QuestionId, QuestionRecord, QuizMode, VideoDuration};
use retain_core::protocol::VisibilityDirective;
use retain_core::scheduler::Scheduler;

use super::progress::SessionProgress;
use crate::error::QuizError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where the timed quiz is in its question cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// No question on screen.
    Idle,
    /// `index` is shown and waiting for the viewer's answer.
    AwaitingAnswer { index: usize },
    /// `index` was answered; the next checkpoint has not been reached.
    AnsweredWaitingNext { index: usize },
    /// `index` was answered and the next question may be opened.
    ReadyToAdvance { index: usize },
}

impl QuizPhase {
    #[must_use]
    pub fn active_index(self) -> Option<usize> {
        match self {
            QuizPhase::Idle => None,
            QuizPhase::AwaitingAnswer { index }
            | QuizPhase::AnsweredWaitingNext { index }
            | QuizPhase::ReadyToAdvance { index } => Some(index),
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Timed quiz state for one video.
///
/// Questions activate one after another as playback reaches their checkpoints.
/// Closing the panel hides it without losing progress: the next checkpoint
/// resumes the sequence after the last answered question.
pub struct TimedSession {
    questions: Vec<QuestionRecord>,
    phase: QuizPhase,
    answered: AnsweredMap,
    last_answered: Option<usize>,
    hidden: bool,
    can_regenerate_at_end: bool,
}

impl TimedSession {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if `questions` is empty.
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self {
            questions,
            phase: QuizPhase::Idle,
            answered: AnsweredMap::new(),
            last_answered: None,
            hidden: false,
            can_regenerate_at_end: false,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn answered(&self) -> &AnsweredMap {
        &self.answered
    }

    #[must_use]
    pub fn last_answered(&self) -> Option<usize> {
        self.last_answered
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn can_regenerate_at_end(&self) -> bool {
        self.can_regenerate_at_end
    }

    #[must_use]
    pub fn active_question(&self) -> Option<&QuestionRecord> {
        self.phase
            .active_index()
            .and_then(|index| self.questions.get(index))
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        matches!(self.phase, QuizPhase::ReadyToAdvance { .. })
    }

    #[must_use]
    pub fn can_close(&self) -> bool {
        matches!(self.phase, QuizPhase::AnsweredWaitingNext { .. })
    }

    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.questions
            .iter()
            .all(|question| self.answered.contains(question.id()))
    }

    /// Whether the full list should now move to the end-of-video quiz.
    #[must_use]
    pub fn should_hand_off(&self, mode: QuizMode) -> bool {
        mode == QuizMode::Both && self.can_regenerate_at_end && self.all_answered()
    }

    #[must_use]
    pub fn is_showing(&self) -> bool {
        !self.hidden && self.phase != QuizPhase::Idle
    }

    #[must_use]
    pub fn visibility(&self) -> VisibilityDirective {
        if self.is_showing() {
            VisibilityDirective::Active
        } else {
            VisibilityDirective::Inactive
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answered.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.all_answered(),
        }
    }

    /// Re-evaluate the phase against the latest playback position.
    ///
    /// Returns `true` when the phase changed.
    pub fn tick(&mut self, current_time: f64, duration: VideoDuration) -> bool {
        let scheduler = Scheduler::new(duration);
        match self.phase {
            QuizPhase::Idle => {
                let Some(index) =
                    scheduler.should_activate(current_time, &self.questions, self.last_answered)
                else {
                    return false;
                };
                self.phase = QuizPhase::AwaitingAnswer { index };
                self.hidden = false;
                true
            }
            QuizPhase::AnsweredWaitingNext { index } => {
                if scheduler.can_advance(current_time, &self.questions, index, &self.answered) {
                    self.phase = QuizPhase::ReadyToAdvance { index };
                    true
                } else {
                    false
                }
            }
            QuizPhase::AwaitingAnswer { .. } | QuizPhase::ReadyToAdvance { .. } => false,
        }
    }

    /// Record the viewer's answer to the active question.
    ///
    /// Call `tick` afterwards to learn whether the next question is already due.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAwaitingAnswer` outside `AwaitingAnswer`,
    /// `QuizError::NotActive` for any other question, and
    /// `QuizError::InvalidOption` if `option` is not one of the choices.
    pub fn submit(&mut self, question_id: &QuestionId, option: &str) -> Result<(), QuizError> {
        let QuizPhase::AwaitingAnswer { index } = self.phase else {
            return Err(QuizError::NotAwaitingAnswer);
        };
        let question = self
            .questions
            .get(index)
            .ok_or(QuizError::NotAwaitingAnswer)?;
        if question.id() != question_id {
            return Err(QuizError::NotActive(question_id.clone()));
        }
        if !question.has_option(option) {
            return Err(QuizError::InvalidOption {
                question: question_id.clone(),
                option: option.to_owned(),
            });
        }

        self.answered.insert(question_id.clone(), option)?;
        self.last_answered = Some(self.last_answered.map_or(index, |last| last.max(index)));
        self.phase = QuizPhase::AnsweredWaitingNext { index };
        Ok(())
    }

    /// Open the next question. Returns its index.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NextNotReady` unless the phase is `ReadyToAdvance`.
    pub fn advance(&mut self) -> Result<usize, QuizError> {
        let QuizPhase::ReadyToAdvance { index } = self.phase else {
            return Err(QuizError::NextNotReady);
        };
        let next = index + 1;
        if next >= self.questions.len() {
            return Err(QuizError::NextNotReady);
        }
        self.phase = QuizPhase::AwaitingAnswer { index: next };
        Ok(next)
    }

    /// Close the question panel after answering.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::CloseUnavailable` unless the active question has been
    /// answered and no further question is ready.
    pub fn close(&mut self) -> Result<(), QuizError> {
        if !self.can_close() {
            return Err(QuizError::CloseUnavailable);
        }
        self.phase = QuizPhase::Idle;
        self.hidden = true;
        self.can_regenerate_at_end = true;
        Ok(())
    }
}

impl fmt::Debug for TimedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedSession")
            .field("questions_len", &self.questions.len())
            .field("phase", &self.phase)
            .field("answered_len", &self.answered.len())
            .field("last_answered", &self.last_answered)
            .field("hidden", &self.hidden)
            .field("can_regenerate_at_end", &self.can_regenerate_at_end)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
