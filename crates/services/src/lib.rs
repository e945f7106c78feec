#![forbid(unsafe_code)]

pub mod channel;
pub mod config;
pub mod error;
pub mod host_bridge;
pub mod question_source;
pub mod sessions;

pub use channel::{EmbedEndpoint, HostEndpoint, WireMessage};
pub use config::{BridgeConfig, QuestionSourceConfig};
pub use error::{ChannelError, ConfigError, QuestionSourceError, QuizError};
pub use host_bridge::{HostBridge, HostPage, VideoSnapshot};
pub use question_source::{
    LiveQuestionSource, PreloadedQuestionSource, QuestionRequest, QuestionSource,
};

pub use sessions::{
    EndOfVideoQuiz, QuizCommand, QuizController, QuizLoopService, QuizPhase, QuizView,
    SessionProgress, Stage, TimedSession,
};
