use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{AnalyticsError, Result, Stream};
use crate::models::{PropertyMap, PropertyValue, Vec3};
use crate::network::{FetchOutcome, NetworkClient, PostOutcome};
use crate::recorders::CustomEventRecorder;
use crate::session::SessionContext;

use super::types::{Answer, AnswerType, ExitPollResponse, QuestionSet};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const EXIT_POLL_EVENT: &str = "cvr.exitpoll";

#[derive(Debug, Default)]
struct ExitPollState {
    question_set: Option<QuestionSet>,
    response: Option<ExitPollResponse>,
}

#[derive(Clone)]
pub struct ExitPollClient {
    session: SessionContext,
    network: NetworkClient,
    events: CustomEventRecorder,
    state: Arc<Mutex<ExitPollState>>,
}

impl ExitPollClient {
    pub fn new(session: SessionContext, network: NetworkClient, events: CustomEventRecorder) -> Self {
        Self {
            session,
            network,
            events,
            state: Arc::new(Mutex::new(ExitPollState::default())),
        }
    }

    /// Fetch the question set behind `hook` and open a fresh response for it.
    ///
    /// Returns `Ok(None)` when offline; nothing is stored in that case.
    pub async fn request_question_set(&self, hook: &str) -> Result<Option<QuestionSet>> {
        let identity = self
            .session
            .identity()
            .await
            .ok_or(AnalyticsError::NoActiveSession(Stream::ExitPoll))?;

        let body = match self.network.get_question_set(hook).await? {
            FetchOutcome::Received { status: 200, body } => body,
            FetchOutcome::Received { status, .. } => return Err(AnalyticsError::HttpStatus(status)),
            FetchOutcome::Offline(message) => {
                log_warn!("Exit poll '{}' unavailable: {}", hook, message);
                return Ok(None);
            }
        };

        let question_set: QuestionSet = serde_json::from_str(&body)?;
        let (name, version) = question_set.name_and_version()?;
        let scene = self.session.scene().await;

        let response = ExitPollResponse {
            hook: hook.to_string(),
            user_id: identity.user_id,
            scene_id: scene.id,
            session_id: identity.session_id,
            question_set_id: question_set.id.clone(),
            question_set_name: name,
            question_set_version: version,
            answers: Vec::new(),
        };

        log_info!(
            "Exit poll '{}' loaded with {} questions",
            question_set.id,
            question_set.questions.len()
        );
        let mut state = self.state.lock().await;
        state.question_set = Some(question_set.clone());
        state.response = Some(response);
        Ok(Some(question_set))
    }

    pub async fn add_answer(&self, answer_type: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let mut state = self.state.lock().await;
        let response = state.response.as_mut().ok_or(AnalyticsError::NoQuestionSet)?;
        response.answers.push(Answer {
            kind: AnswerType::from_name(answer_type),
            value: value.into(),
        });
        Ok(())
    }

    /// Post the collected answers and log them as a `cvr.exitpoll` event.
    ///
    /// The event is recorded whatever the post's result; the open response is
    /// cleared either way. Only HTTP 200 counts as delivered.
    pub async fn send_all_answers(&self, point: Vec3) -> Result<PostOutcome> {
        let response = {
            let mut state = self.state.lock().await;
            state.question_set = None;
            state.response.take().ok_or(AnalyticsError::NoQuestionSet)?
        };

        let posted = self
            .network
            .post_exit_poll(
                &response.question_set_name,
                &response.question_set_version,
                &response,
            )
            .await;

        if let Err(err) = self
            .events
            .record(EXIT_POLL_EVENT, point, Some(answer_properties(&response)))
            .await
        {
            log_error!("Failed to record exit poll event: {}", err);
        }

        match posted? {
            PostOutcome::Sent(200) => {
                log_info!(
                    "Exit poll '{}' sent with {} answers",
                    response.question_set_id,
                    response.answers.len()
                );
                Ok(PostOutcome::Sent(200))
            }
            PostOutcome::Sent(status) => Err(AnalyticsError::HttpStatus(status)),
            PostOutcome::Offline(message) => {
                log_warn!("Exit poll answers dropped: {}", message);
                Ok(PostOutcome::Offline(message))
            }
        }
    }

    pub async fn current_question_set(&self) -> Option<QuestionSet> {
        self.state.lock().await.question_set.clone()
    }

    pub async fn current_response(&self) -> Option<ExitPollResponse> {
        self.state.lock().await.response.clone()
    }
}

/// `Answer{i}` per answer; string answers are reported as 0.
fn answer_properties(response: &ExitPollResponse) -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("userId".into(), response.user_id.clone().into());
    properties.insert("questionSetId".into(), response.question_set_id.clone().into());
    properties.insert("hook".into(), response.hook.clone().into());
    for (index, answer) in response.answers.iter().enumerate() {
        let value = match &answer.value {
            PropertyValue::String(_) => PropertyValue::Number(0.0),
            other => other.clone(),
        };
        properties.insert(format!("Answer{}", index), value);
    }
    properties
}
