use retain_core::model::QuestionRecord;

use super::controller::{QuizController, Stage};
use super::progress::SessionProgress;

/// Presentation-agnostic snapshot of what the quiz should render.
///
/// This is intentionally **not** a UI view-model: no strings are formatted
/// and no layout is implied. The renderer decides how each state looks.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizView {
    /// Mode selector is on screen.
    ChoosingMode,
    /// Nothing to render; the host keeps the panel hidden.
    Hidden,
    /// The quiz could not load questions for this video.
    Unavailable,
    TimedQuestion(TimedQuestionView),
    Review(ReviewView),
}

/// The timed question currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedQuestionView {
    pub question: QuestionRecord,
    /// The viewer's choice, once submitted.
    pub selected: Option<String>,
    pub can_advance: bool,
    pub can_close: bool,
    pub progress: SessionProgress,
}

/// One step of the end-of-video review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub question: QuestionRecord,
    pub index: usize,
    pub total: usize,
    pub selected: Option<String>,
    pub completed: bool,
    pub score: usize,
}

impl QuizView {
    #[must_use]
    pub fn from_controller(controller: &QuizController) -> Self {
        match controller.stage() {
            Stage::ChoosingMode => QuizView::ChoosingMode,
            Stage::Loading | Stage::Discarded => QuizView::Hidden,
            Stage::Unavailable => QuizView::Unavailable,
            Stage::Timed(session) => {
                if !session.is_showing() {
                    return QuizView::Hidden;
                }
                let Some(question) = session.active_question() else {
                    return QuizView::Hidden;
                };
                QuizView::TimedQuestion(TimedQuestionView {
                    selected: session.answered().get(question.id()).map(str::to_owned),
                    question: question.clone(),
                    can_advance: session.can_advance(),
                    can_close: session.can_close(),
                    progress: session.progress(),
                })
            }
            Stage::EndOfVideo(quiz) => {
                if !quiz.is_visible() {
                    return QuizView::Hidden;
                }
                let Some(question) = quiz.current_question() else {
                    return QuizView::Hidden;
                };
                let index = quiz.current_index();
                QuizView::Review(ReviewView {
                    question: question.clone(),
                    index,
                    total: quiz.total(),
                    selected: quiz.selected(index).map(str::to_owned),
                    completed: quiz.is_completed(),
                    score: quiz.score(),
                })
            }
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, QuizView::TimedQuestion(_) | QuizView::Review(_))
    }
}
