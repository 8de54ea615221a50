//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::session::{Question, QuestionKind};

/// Validates a question payload before it is activated.
///
/// Checks structural constraints only; correctness flags are free-form and a
/// question with no correct answer is legitimate.
pub fn validate_question(question: &Question) -> Result<(), ValidationError> {
    if question.id.trim().is_empty() {
        let mut err = ValidationError::new("question_id");
        err.message = Some("question id must not be empty".into());
        return Err(err);
    }

    if question.time_limit == Some(0) {
        let mut err = ValidationError::new("time_limit");
        err.message = Some("time limit must be a positive number of seconds".into());
        return Err(err);
    }

    let (prompt, options) = match &question.kind {
        QuestionKind::MultipleChoice { prompt, options }
        | QuestionKind::SelectMany { prompt, options } => (prompt, Some(options)),
        QuestionKind::FreeResponse { prompt, .. } => (prompt, None),
    };

    if prompt.trim().is_empty() {
        let mut err = ValidationError::new("prompt");
        err.message = Some("prompt must not be empty".into());
        return Err(err);
    }

    if let Some(options) = options {
        if options.is_empty() {
            let mut err = ValidationError::new("options");
            err.message = Some("choice questions need at least one option".into());
            return Err(err);
        }
        if options.iter().any(|choice| choice.text.trim().is_empty()) {
            let mut err = ValidationError::new("options");
            err.message = Some("option text must not be empty".into());
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::AnswerChoice;

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: "q1".into(),
            is_anonymous: false,
            time_limit: Some(10),
            kind,
        }
    }

    fn choices() -> Vec<AnswerChoice> {
        vec![AnswerChoice {
            text: "A".into(),
            is_correct: None,
        }]
    }

    #[test]
    fn accepts_well_formed_questions() {
        assert!(
            validate_question(&question(QuestionKind::MultipleChoice {
                prompt: "Pick".into(),
                options: choices(),
            }))
            .is_ok()
        );
        assert!(
            validate_question(&question(QuestionKind::FreeResponse {
                prompt: "Say".into(),
                correct_answers: None,
            }))
            .is_ok()
        );
    }

    #[test]
    fn rejects_zero_time_limit() {
        let mut q = question(QuestionKind::FreeResponse {
            prompt: "Say".into(),
            correct_answers: None,
        });
        q.time_limit = Some(0);
        assert!(validate_question(&q).is_err());

        q.time_limit = None;
        assert!(validate_question(&q).is_ok());
    }

    #[test]
    fn rejects_empty_prompts_and_options() {
        assert!(
            validate_question(&question(QuestionKind::SelectMany {
                prompt: "  ".into(),
                options: choices(),
            }))
            .is_err()
        );
        assert!(
            validate_question(&question(QuestionKind::MultipleChoice {
                prompt: "Pick".into(),
                options: vec![],
            }))
            .is_err()
        );
        assert!(
            validate_question(&question(QuestionKind::MultipleChoice {
                prompt: "Pick".into(),
                options: vec![AnswerChoice {
                    text: "".into(),
                    is_correct: None
                }],
            }))
            .is_err()
        );
    }

    #[test]
    fn rejects_blank_question_id() {
        let mut q = question(QuestionKind::FreeResponse {
            prompt: "Say".into(),
            correct_answers: None,
        });
        q.id = " ".into();
        assert!(validate_question(&q).is_err());
    }
}
