use retain_core::model::QuestionRecord;
use retain_core::protocol::VisibilityDirective;

use crate::error::QuizError;

/// Sequential review of the full question list once the video has ended.
///
/// Stays invisible until the host reports the video ended, then reveals once.
/// Answers only feed the local review; nothing is scheduled from here on.
#[derive(Debug, Clone)]
pub struct EndOfVideoQuiz {
    questions: Vec<QuestionRecord>,
    answers: Vec<Option<String>>,
    current: usize,
    revealed: bool,
    completed: bool,
    dismissed: bool,
}

impl EndOfVideoQuiz {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if `questions` is empty.
    pub fn new(questions: Vec<QuestionRecord>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            questions,
            answers,
            current: 0,
            revealed: false,
            completed: false,
            dismissed: false,
        })
    }

    /// Feed the host's ended flag. Returns `true` only on the reveal itself.
    pub fn observe_end(&mut self, ended: bool) -> bool {
        if ended && !self.revealed {
            self.revealed = true;
            return true;
        }
        false
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.revealed
            .then(|| self.questions.get(self.current))
            .flatten()
    }

    #[must_use]
    pub fn selected(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(Option::as_deref)
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.revealed && !self.dismissed
    }

    #[must_use]
    pub fn visibility(&self) -> VisibilityDirective {
        if self.is_visible() {
            VisibilityDirective::Active
        } else {
            VisibilityDirective::Inactive
        }
    }

    /// Number of questions answered correctly so far.
    #[must_use]
    pub fn score(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| {
                answer
                    .as_deref()
                    .is_some_and(|option| question.is_correct(option))
            })
            .count()
    }

    /// Answer the question currently on screen.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ReviewNotVisible` before the reveal,
    /// `QuizError::ReviewAlreadySubmitted` for a second answer, and
    /// `QuizError::InvalidOption` for an unknown choice.
    pub fn submit(&mut self, option: &str) -> Result<(), QuizError> {
        if !self.is_visible() {
            return Err(QuizError::ReviewNotVisible);
        }
        let question = self
            .questions
            .get(self.current)
            .ok_or(QuizError::ReviewOutOfRange)?;
        if self.answers[self.current].is_some() {
            return Err(QuizError::ReviewAlreadySubmitted);
        }
        if !question.has_option(option) {
            return Err(QuizError::InvalidOption {
                question: question.id().clone(),
                option: option.to_owned(),
            });
        }

        self.answers[self.current] = Some(option.to_owned());
        if self.current + 1 == self.questions.len() {
            self.completed = true;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuizError::ReviewNotVisible` before the reveal,
    /// `QuizError::NotAwaitingAnswer` while the current question is unanswered,
    /// and `QuizError::ReviewOutOfRange` on the last question.
    pub fn next(&mut self) -> Result<(), QuizError> {
        if !self.is_visible() {
            return Err(QuizError::ReviewNotVisible);
        }
        if self.answers[self.current].is_none() {
            return Err(QuizError::NotAwaitingAnswer);
        }
        if self.current + 1 >= self.questions.len() {
            return Err(QuizError::ReviewOutOfRange);
        }
        self.current += 1;
        Ok(())
    }

    /// Step back through answered questions; only after completion.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ReviewOutOfRange` before completion or on the first question.
    pub fn previous(&mut self) -> Result<(), QuizError> {
        if !self.is_visible() {
            return Err(QuizError::ReviewNotVisible);
        }
        if !self.completed || self.current == 0 {
            return Err(QuizError::ReviewOutOfRange);
        }
        self.current -= 1;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `QuizError::CloseUnavailable` until every question is answered.
    pub fn dismiss(&mut self) -> Result<(), QuizError> {
        if !self.is_visible() || !self.completed {
            return Err(QuizError::CloseUnavailable);
        }
        self.dismissed = true;
        Ok(())
    }
}
