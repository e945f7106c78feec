mod controller;
mod end_quiz;
mod progress;
mod timed;
mod view;
mod workflow;

// Public API of the quiz session subsystem.
pub use controller::{QuizCommand, QuizController, Stage};
pub use end_quiz::EndOfVideoQuiz;
pub use progress::SessionProgress;
pub use timed::{QuizPhase, TimedSession};
pub use view::{QuizView, ReviewView, TimedQuestionView};
pub use workflow::QuizLoopService;
