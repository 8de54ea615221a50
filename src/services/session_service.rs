//! Lifecycle orchestrator for polling sessions.
//!
//! Every operation validates inside the session store's `update` closure
//! wherever it mutates, so the read-validate-write step happens under the
//! store lock and never interleaves with another mutation on the same code.
//! The first failing step short-circuits the rest: no partial mutation, no
//! broadcast.

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::{
        session::{ResponseForHost, SessionForHost, SubmittedResponse},
        validation::validate_question,
    },
    error::ServiceError,
    services::socket_events,
    state::{
        SharedState,
        session::{Participant, Question, QuestionResponse, Session},
        timer,
    },
};

const CODE_LENGTH: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SECRET_LENGTH: usize = 128;
const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Create a fresh session owned by the connection `socket_id`.
///
/// The connection must exist and not already belong to a room; it becomes the
/// host connection of the new session's room.
pub async fn create_session(
    state: &SharedState,
    socket_id: &str,
) -> Result<SessionForHost, ServiceError> {
    ensure_not_in_room(state, socket_id)?;

    let code = state.codes().allocate(generate_session_code).await;
    let session = Session::new(code.clone(), generate_secret(), socket_id.to_owned());

    let created = match state.sessions().create(&code, session).await {
        Ok(created) => created,
        Err(err) => {
            let _ = state.codes().release(&code).await;
            return Err(err.into());
        }
    };

    if let Err(err) = state.join_room(socket_id, &code) {
        // The connection went away between validation and the join; undo the
        // allocation so the code does not leak.
        let _ = state.sessions().remove(&code).await;
        let _ = state.codes().release(&code).await;
        return Err(err);
    }

    info!(code = %code, "session created");
    Ok(created.into())
}

/// Whether a session with this code is currently live. Never fails.
pub async fn check_session_exists(state: &SharedState, code: &str) -> bool {
    state.sessions().read(code).await.is_ok()
}

/// End a session: notify the room, kick every connection, remove the session
/// and free its code for reuse. Returns the final snapshot for export.
pub async fn end_session(
    state: &SharedState,
    code: &str,
    host_secret: &str,
) -> Result<SessionForHost, ServiceError> {
    // Validation and removal happen under one store lock, so a question
    // activated concurrently can never be orphaned by the removal.
    let removed = state
        .sessions()
        .remove_if(code, |session| {
            verify_host(session, host_secret)?;
            if session.active_question.is_some() {
                return Err(ServiceError::InvalidState(
                    "session still has an active question".into(),
                ));
            }
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::from_update(err, "session"))?;

    socket_events::broadcast_session_ended(state, code);
    state.disconnect_room(code);
    state.codes().release(code).await?;

    info!(code = %code, participants = removed.participants.len(), "session ended");
    Ok(removed.into())
}

/// Add a participant to a session and notify the host.
///
/// The returned participant carries the secret the client must present on
/// subsequent responses.
pub async fn join_session(
    state: &SharedState,
    code: &str,
    name: String,
    socket_id: &str,
) -> Result<Participant, ServiceError> {
    // Claim the room slot first: `join_room` is atomic per connection, so of
    // two racing joins only one can go on to touch the session.
    state.join_room(socket_id, code)?;

    let participant = Participant {
        id: Uuid::new_v4(),
        secret: generate_secret(),
        name,
    };

    let joined = participant.clone();
    let updated = match state
        .sessions()
        .update(code, move |session| {
            session.participants.push(joined);
            Ok(())
        })
        .await
    {
        Ok(updated) => updated,
        Err(err) => {
            // No such session; free the room slot again.
            state.leave_room(socket_id);
            return Err(ServiceError::from_update(err, "session"));
        }
    };

    socket_events::notify_participant_joined(state, &updated.host_socket_id, &participant);

    info!(code = %code, participant = %participant.id, "participant joined");
    Ok(participant)
}

/// Make `question` the active question of the session and broadcast it with
/// answers stripped. A positive time limit starts the countdown that will
/// close the question when it expires.
pub async fn activate_question(
    state: &SharedState,
    code: &str,
    host_secret: &str,
    question: Question,
) -> Result<(), ServiceError> {
    validate_question(&question).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let secret = host_secret.to_owned();
    let activated = question.clone();
    state
        .sessions()
        .update(code, move |session| {
            verify_host(session, &secret)?;
            if session.active_question.is_some() {
                return Err(ServiceError::InvalidState(
                    "session already has an active question".into(),
                ));
            }
            session.active_question = Some(activated);
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::from_update(err, "session"))?;

    socket_events::broadcast_new_question(state, code, &question);

    if let Some(limit) = question.time_limit.filter(|limit| *limit > 0) {
        start_question_countdown(state, code, &question.id, limit).await?;
    }

    info!(code = %code, question = %question.id, "question activated");
    Ok(())
}

/// Close the active question ahead of (or instead of) its timer, cancel any
/// running countdown, and broadcast the closed question to the room.
pub async fn close_question(
    state: &SharedState,
    code: &str,
    host_secret: &str,
) -> Result<(), ServiceError> {
    let secret = host_secret.to_owned();
    let mut closed = None;
    state
        .sessions()
        .update(code, |session| {
            verify_host(session, &secret)?;
            let Some(question) = session.active_question.take() else {
                return Err(ServiceError::InvalidState(
                    "session does not have an active question".into(),
                ));
            };
            session.ended_questions.push(question.clone());
            closed = Some(question);
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::from_update(err, "session"))?;

    // A missing handle means the countdown already concluded (or the question
    // never had one); nothing left to cancel.
    if let Ok(handle) = state.timers().remove(code).await {
        handle.cancel();
    }

    let question = closed.ok_or_else(|| {
        ServiceError::Internal("closed question missing after update".into())
    })?;
    socket_events::broadcast_question_ended(state, code, &question);

    info!(code = %code, question = %question.id, "question closed");
    Ok(())
}

/// Store a participant's response to the active question and notify the host.
///
/// Resubmission by the same participant overwrites the stored entry in place,
/// keeping its id stable.
pub async fn respond_to_question(
    state: &SharedState,
    code: &str,
    participant_secret: &str,
    submitted: SubmittedResponse,
) -> Result<(), ServiceError> {
    let secret = participant_secret.to_owned();
    let mut stored = None;
    let updated = state
        .sessions()
        .update(code, |session| {
            let participant = session
                .participant(submitted.participant_id)
                .ok_or_else(|| {
                    ServiceError::NotFound("no participant exists with that id".into())
                })?;
            if participant.secret != secret {
                return Err(ServiceError::Unauthorized(
                    "participant secret does not match".into(),
                ));
            }

            // The answer payload is deliberately not checked against the
            // question's declared kind; only the question id must match.
            let is_anonymous = match &session.active_question {
                None => {
                    return Err(ServiceError::InvalidState(
                        "cannot respond when there is no active question".into(),
                    ));
                }
                Some(active) if active.id != submitted.question_id => {
                    return Err(ServiceError::InvalidState(
                        "questionId does not match the active question".into(),
                    ));
                }
                Some(active) => active.is_anonymous,
            };

            let existing = session.responses.iter().position(|response| {
                response.participant_id == submitted.participant_id
                    && response.question_id == submitted.question_id
            });
            let response = QuestionResponse {
                id: existing
                    .map(|index| session.responses[index].id)
                    .unwrap_or_else(Uuid::new_v4),
                question_id: submitted.question_id.clone(),
                participant_id: submitted.participant_id,
                is_anonymous,
                answer: submitted.answer.clone(),
            };
            match existing {
                Some(index) => session.responses[index] = response.clone(),
                None => session.responses.push(response.clone()),
            }
            stored = Some(response);
            Ok(())
        })
        .await
        .map_err(|err| ServiceError::from_update(err, "session"))?;

    let response = stored.ok_or_else(|| {
        ServiceError::Internal("stored response missing after update".into())
    })?;
    socket_events::notify_new_response(
        state,
        &updated.host_socket_id,
        ResponseForHost::from(response),
    );
    Ok(())
}

/// Replay the active question (answers stripped) to a single reconnecting
/// connection. A session without an active question sends nothing.
pub async fn check_active_question(
    state: &SharedState,
    code: &str,
    socket_id: &str,
) -> Result<(), ServiceError> {
    state.connection_room(socket_id)?;
    let session = read_session(state, code).await?;

    if let Some(question) = &session.active_question {
        socket_events::send_question_to_socket(state, socket_id, question);
    }
    Ok(())
}

/// Start the countdown for a timed question and register its handle.
async fn start_question_countdown(
    state: &SharedState,
    code: &str,
    question_id: &str,
    limit: u32,
) -> Result<(), ServiceError> {
    let tick_state = state.clone();
    let tick_code = code.to_owned();
    let on_tick = move |remaining| {
        socket_events::broadcast_timer_update(&tick_state, &tick_code, remaining);
    };

    let end_state = state.clone();
    let end_code = code.to_owned();
    let end_question = question_id.to_owned();
    let on_end = move || expire_question(end_state, end_code, end_question);

    let handle = timer::start_countdown(state.config().timer_tick(), limit, on_tick, on_end);

    // A leftover handle for this code can only belong to a countdown whose
    // question was already closed; drop it before registering the new one.
    if let Ok(stale) = state.timers().remove(code).await {
        stale.cancel();
    }
    state
        .timers()
        .create(code, handle)
        .await
        .map_err(ServiceError::from)
}

/// Natural expiry of a question countdown.
///
/// Takes its own handle out of the timer store first: losing that race means
/// the host already closed the question (or ended the session), and the
/// expiry must become a no-op. The session update re-checks that the same
/// question is still active, so a stale expiry can never close a newer one.
async fn expire_question(state: SharedState, code: String, question_id: String) {
    if state.timers().remove(&code).await.is_err() {
        return;
    }

    let mut closed = None;
    let outcome = state
        .sessions()
        .update(&code, |session| {
            match &session.active_question {
                Some(active) if active.id == question_id => {}
                _ => {
                    return Err(ServiceError::InvalidState(
                        "question already closed".into(),
                    ));
                }
            }
            let Some(question) = session.active_question.take() else {
                return Err(ServiceError::InvalidState("question already closed".into()));
            };
            session.ended_questions.push(question.clone());
            closed = Some(question);
            Ok(())
        })
        .await;

    match (outcome, closed) {
        (Ok(_), Some(question)) => {
            socket_events::broadcast_question_ended(&state, &code, &question);
            info!(code = %code, question = %question.id, "question closed by timer");
        }
        _ => {
            debug!(code = %code, "countdown expired after the question was closed");
        }
    }
}

async fn read_session(state: &SharedState, code: &str) -> Result<Session, ServiceError> {
    state
        .sessions()
        .read(code)
        .await
        .map_err(|_| ServiceError::NotFound(format!("no session exists with code `{code}`")))
}

fn verify_host(session: &Session, host_secret: &str) -> Result<(), ServiceError> {
    if session.host_secret != host_secret {
        return Err(ServiceError::Unauthorized(
            "host secret does not match".into(),
        ));
    }
    Ok(())
}

fn ensure_not_in_room(state: &SharedState, socket_id: &str) -> Result<(), ServiceError> {
    match state.connection_room(socket_id)? {
        None => Ok(()),
        Some(_) => Err(ServiceError::InvalidState(
            "connection already joined a session".into(),
        )),
    }
}

fn generate_session_code() -> String {
    random_string(CODE_LENGTH, CODE_CHARSET)
}

fn generate_secret() -> String {
    random_string(SECRET_LENGTH, SECRET_CHARSET)
}

fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}
