use std::fmt;

use thiserror::Error;

/// The analytics stream an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Gaze,
    CustomEvents,
    Sensors,
    Dynamics,
    ExitPoll,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Gaze => "gaze",
            Stream::CustomEvents => "custom events",
            Stream::Sensors => "sensors",
            Stream::Dynamics => "dynamic objects",
            Stream::ExitPoll => "exit poll",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{0}: no session active")]
    NoActiveSession(Stream),

    #[error("no session active")]
    NoSession,

    #[error("no scene selected")]
    NoSceneSelected,

    #[error("unknown scene '{0}'")]
    UnknownScene(String),

    #[error("collector responded with status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no exit poll question set requested")]
    NoQuestionSet,

    #[error("invalid question set: {0}")]
    InvalidQuestionSet(String),
}

impl AnalyticsError {
    pub fn is_no_session(&self) -> bool {
        matches!(
            self,
            AnalyticsError::NoActiveSession(_) | AnalyticsError::NoSession
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
