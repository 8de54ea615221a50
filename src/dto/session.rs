//! Request payloads and host-facing projections of session data.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::session::{Participant, Question, QuestionResponse, ResponseAnswer, Session},
};

/// Body of a join request.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinSessionRequest {
    /// Display name chosen by the joining participant.
    #[validate(length(min = 1, max = 120, message = "name must be 1 to 120 characters"))]
    pub name: String,
}

/// Result of the session existence probe.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionExistsResponse {
    /// Whether a session with the requested code is live.
    pub session_exists: bool,
}

/// A participant-submitted response, before the server assigns its id and
/// anonymity flag.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    /// Id of the question being answered; must match the active question.
    pub question_id: String,
    /// Id of the responding participant.
    pub participant_id: Uuid,
    /// Answer payload, tagged on `questionType`.
    #[serde(flatten)]
    pub answer: ResponseAnswer,
}

/// Response projection sent to the host: participant identity is withheld
/// when the question was anonymous.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseForHost {
    /// Stable response identifier.
    pub id: Uuid,
    /// Id of the answered question.
    pub question_id: String,
    /// Responding participant, or `None` for anonymous questions.
    pub participant_id: Option<Uuid>,
    /// Answer payload, tagged on `questionType`.
    #[serde(flatten)]
    pub answer: ResponseAnswer,
}

impl From<QuestionResponse> for ResponseForHost {
    fn from(response: QuestionResponse) -> Self {
        Self {
            id: response.id,
            question_id: response.question_id,
            participant_id: (!response.is_anonymous).then_some(response.participant_id),
            answer: response.answer,
        }
    }
}

/// Full session snapshot for the host, with every response projected through
/// [`ResponseForHost`]. The host owns the answer keys and the secret, so both
/// are included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionForHost {
    /// Join code of the session.
    pub code: String,
    /// Host bearer credential for subsequent privileged calls.
    pub host_secret: String,
    /// Connection id host-only events are addressed to.
    pub host_socket_id: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Participants in join order.
    pub participants: Vec<Participant>,
    /// Closed questions in close order.
    pub ended_questions: Vec<Question>,
    /// The question currently accepting responses, if any.
    pub active_question: Option<Question>,
    /// Every stored response, identity-stripped where anonymous.
    pub responses: Vec<ResponseForHost>,
}

impl From<Session> for SessionForHost {
    fn from(session: Session) -> Self {
        Self {
            code: session.code,
            host_secret: session.host_secret,
            host_socket_id: session.host_socket_id,
            created_at: format_system_time(session.created_at),
            participants: session.participants,
            ended_questions: session.ended_questions,
            active_question: session.active_question,
            responses: session.responses.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(is_anonymous: bool) -> QuestionResponse {
        QuestionResponse {
            id: Uuid::new_v4(),
            question_id: "q1".into(),
            participant_id: Uuid::new_v4(),
            is_anonymous,
            answer: ResponseAnswer::MultipleChoice {
                selected_response: "B".into(),
            },
        }
    }

    #[test]
    fn host_projection_withholds_identity_iff_anonymous() {
        let anonymous = response(true);
        let projected = ResponseForHost::from(anonymous.clone());
        assert_eq!(projected.participant_id, None);
        assert_eq!(projected.id, anonymous.id);

        let named = response(false);
        let projected = ResponseForHost::from(named.clone());
        assert_eq!(projected.participant_id, Some(named.participant_id));
    }

    #[test]
    fn host_projection_preserves_answer_content() {
        let projected = ResponseForHost::from(response(true));
        let value = serde_json::to_value(&projected).unwrap();
        assert_eq!(value["questionType"], "multipleChoice");
        assert_eq!(value["selectedResponse"], "B");
        assert_eq!(value["participantId"], serde_json::Value::Null);
    }

    #[test]
    fn join_request_rejects_empty_names() {
        let empty = JoinSessionRequest { name: String::new() };
        assert!(empty.validate().is_err());

        let ok = JoinSessionRequest { name: "Ada".into() };
        assert!(ok.validate().is_ok());
    }
}
