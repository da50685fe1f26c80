pub mod client;
pub mod types;

pub use client::{ExitPollClient, EXIT_POLL_EVENT};
pub use types::{Answer, AnswerType, ExitPollResponse, Question, QuestionSet};
