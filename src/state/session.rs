//! Domain model for one live polling session.
//!
//! The serde attributes pin the wire shape used by the clients: questions are
//! tagged unions on `type`, responses on `questionType`, with camelCase field
//! names throughout.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Root aggregate for one polling event, keyed by its join code.
#[derive(Debug, Clone)]
pub struct Session {
    /// Short human-typable join code (6 uppercase alphanumeric characters).
    pub code: String,
    /// High-entropy bearer credential proving host authority.
    pub host_secret: String,
    /// WebSocket connection id of the host, used for host-only events.
    pub host_socket_id: String,
    /// Creation timestamp surfaced in the host view.
    pub created_at: SystemTime,
    /// Everyone who joined, in join order. Append-only.
    pub participants: Vec<Participant>,
    /// Questions already closed, in the order they were closed. Append-only.
    pub ended_questions: Vec<Question>,
    /// The sole question currently accepting responses, if any.
    pub active_question: Option<Question>,
    /// At most one entry per (participant, question) pair; resubmission
    /// replaces the entry in place.
    pub responses: Vec<QuestionResponse>,
}

impl Session {
    /// Build an empty session owned by the connection `host_socket_id`.
    pub fn new(code: String, host_secret: String, host_socket_id: String) -> Self {
        Self {
            code,
            host_secret,
            host_socket_id,
            created_at: SystemTime::now(),
            participants: Vec::new(),
            ended_questions: Vec::new(),
            active_question: None,
            responses: Vec::new(),
        }
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// A joined audience member. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    /// Unique identifier referenced by this participant's responses.
    pub id: Uuid,
    /// Bearer credential the participant presents when responding.
    pub secret: String,
    /// Display name, free text, not required to be unique.
    pub name: String,
}

/// One choice offered by a multiple-choice or select-many question.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerChoice {
    /// Choice label shown to participants.
    pub text: String,
    /// Whether this choice is correct; `None` once answers are stripped.
    pub is_correct: Option<bool>,
}

/// A question as authored by the host.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Client-assigned identifier, referenced by responses.
    pub id: String,
    /// When true, responses never reveal the responder to the host.
    pub is_anonymous: bool,
    /// Optional countdown in seconds; the server closes the question when it
    /// expires.
    pub time_limit: Option<u32>,
    /// Kind-specific payload, tagged on `type` over the wire.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Kind-specific payload of a [`Question`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum QuestionKind {
    /// Pick exactly one of the offered choices.
    #[serde(rename = "multipleChoice")]
    MultipleChoice {
        /// Question text.
        prompt: String,
        /// Ordered answer choices.
        options: Vec<AnswerChoice>,
    },
    /// Pick any subset of the offered choices.
    #[serde(rename = "selectMany")]
    SelectMany {
        /// Question text.
        prompt: String,
        /// Ordered answer choices.
        options: Vec<AnswerChoice>,
    },
    /// Free-text answer.
    #[serde(rename = "freeResponse")]
    FreeResponse {
        /// Question text.
        prompt: String,
        /// Accepted answers; `None` once answers are stripped (or when the
        /// host never provided any).
        #[serde(rename = "correctAnswers")]
        correct_answers: Option<Vec<String>>,
    },
}

impl Question {
    /// Public variant of the question with all correctness information
    /// removed. Idempotent: stripping twice equals stripping once.
    pub fn without_answers(&self) -> Question {
        let kind = match &self.kind {
            QuestionKind::MultipleChoice { prompt, options } => QuestionKind::MultipleChoice {
                prompt: prompt.clone(),
                options: strip_choices(options),
            },
            QuestionKind::SelectMany { prompt, options } => QuestionKind::SelectMany {
                prompt: prompt.clone(),
                options: strip_choices(options),
            },
            QuestionKind::FreeResponse { prompt, .. } => QuestionKind::FreeResponse {
                prompt: prompt.clone(),
                correct_answers: None,
            },
        };

        Question {
            id: self.id.clone(),
            is_anonymous: self.is_anonymous,
            time_limit: self.time_limit,
            kind,
        }
    }
}

fn strip_choices(options: &[AnswerChoice]) -> Vec<AnswerChoice> {
    options
        .iter()
        .map(|choice| AnswerChoice {
            text: choice.text.clone(),
            is_correct: None,
        })
        .collect()
}

/// A stored response from one participant to one question.
///
/// The id stays stable across resubmissions for the same (participant,
/// question) pair; only the answer payload changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    /// Stable identifier of this (participant, question) response slot.
    pub id: Uuid,
    /// Id of the question this answers.
    pub question_id: String,
    /// Id of the responding participant.
    pub participant_id: Uuid,
    /// Copied from the question at submission time; controls the host
    /// projection.
    pub is_anonymous: bool,
    /// Answer payload, tagged on `questionType` over the wire.
    #[serde(flatten)]
    pub answer: ResponseAnswer,
}

/// Answer payload of a [`QuestionResponse`], mirroring the question kinds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "questionType")]
pub enum ResponseAnswer {
    /// Answer to a multiple-choice question.
    #[serde(rename = "multipleChoice", rename_all = "camelCase")]
    MultipleChoice {
        /// The text of the chosen option.
        selected_response: String,
    },
    /// Answer to a select-many question.
    #[serde(rename = "selectMany", rename_all = "camelCase")]
    SelectMany {
        /// The texts of every chosen option.
        selected_responses: Vec<String>,
    },
    /// Answer to a free-response question.
    #[serde(rename = "freeResponse", rename_all = "camelCase")]
    FreeResponse {
        /// The submitted text.
        response_text: String,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn choice_question() -> Question {
        Question {
            id: "q1".into(),
            is_anonymous: false,
            time_limit: Some(30),
            kind: QuestionKind::MultipleChoice {
                prompt: "Pick one".into(),
                options: vec![
                    AnswerChoice {
                        text: "A".into(),
                        is_correct: Some(false),
                    },
                    AnswerChoice {
                        text: "B".into(),
                        is_correct: Some(true),
                    },
                ],
            },
        }
    }

    #[test]
    fn without_answers_strips_choice_correctness() {
        let stripped = choice_question().without_answers();
        let QuestionKind::MultipleChoice { options, .. } = &stripped.kind else {
            panic!("kind changed");
        };
        assert!(options.iter().all(|choice| choice.is_correct.is_none()));
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].text, "A");
    }

    #[test]
    fn without_answers_clears_free_response_answers() {
        let question = Question {
            id: "q2".into(),
            is_anonymous: true,
            time_limit: None,
            kind: QuestionKind::FreeResponse {
                prompt: "Say something".into(),
                correct_answers: Some(vec!["hi".into()]),
            },
        };
        let stripped = question.without_answers();
        let QuestionKind::FreeResponse {
            correct_answers, ..
        } = &stripped.kind
        else {
            panic!("kind changed");
        };
        assert!(correct_answers.is_none());
    }

    #[test]
    fn without_answers_is_idempotent() {
        let once = choice_question().without_answers();
        let twice = once.without_answers();
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn question_wire_shape_is_tagged_on_type() {
        let value = serde_json::to_value(choice_question()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "q1",
                "isAnonymous": false,
                "timeLimit": 30,
                "type": "multipleChoice",
                "prompt": "Pick one",
                "options": [
                    { "text": "A", "isCorrect": false },
                    { "text": "B", "isCorrect": true },
                ],
            })
        );

        let parsed: Question = serde_json::from_value(value).unwrap();
        assert!(matches!(parsed.kind, QuestionKind::MultipleChoice { .. }));
    }

    #[test]
    fn response_wire_shape_is_tagged_on_question_type() {
        let response = QuestionResponse {
            id: Uuid::nil(),
            question_id: "q1".into(),
            participant_id: Uuid::nil(),
            is_anonymous: false,
            answer: ResponseAnswer::SelectMany {
                selected_responses: vec!["A".into(), "B".into()],
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["questionType"], "selectMany");
        assert_eq!(value["selectedResponses"], json!(["A", "B"]));
        assert_eq!(value["participantId"], json!(Uuid::nil()));
    }
}
