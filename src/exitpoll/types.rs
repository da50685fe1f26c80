use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::models::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnswerType {
    HappySad,
    Boolean,
    Thumbs,
    Scale,
    Multiple,
    Voice,
}

impl AnswerType {
    /// Unrecognised names are treated as `BOOLEAN`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "HAPPYSAD" => AnswerType::HappySad,
            "BOOLEAN" => AnswerType::Boolean,
            "THUMBS" => AnswerType::Thumbs,
            "SCALE" => AnswerType::Scale,
            "MULTIPLE" => AnswerType::Multiple,
            "VOICE" => AnswerType::Voice,
            _ => AnswerType::Boolean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    #[serde(rename = "type")]
    pub kind: AnswerType,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionSet {
    /// `{name}:{version}`
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionSet {
    /// Split the id into its name and version parts.
    pub fn name_and_version(&self) -> Result<(String, String)> {
        match self.id.split_once(':') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok((name.to_string(), version.to_string()))
            }
            _ => Err(AnalyticsError::InvalidQuestionSet(format!(
                "id '{}' is not of the form name:version",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPollResponse {
    pub hook: String,
    pub user_id: String,
    pub scene_id: String,
    pub session_id: String,
    pub question_set_id: String,
    pub question_set_name: String,
    pub question_set_version: String,
    pub answers: Vec<Answer>,
}
