mod ids;
mod mode;
mod question;
mod telemetry;

pub use ids::QuestionId;
pub use mode::{QuizMode, QuizModeError};
pub use question::{AnswerError, AnsweredMap, QuestionRecord, WireQuestion, WireQuestionId};
pub use telemetry::{PlaybackTelemetry, VideoDuration, VideoUrl, VideoUrlError};
