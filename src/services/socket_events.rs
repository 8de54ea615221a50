use crate::{
    dto::{session::ResponseForHost, ws::SocketEvent},
    services::websocket_service::send_event,
    state::{
        AppState,
        session::{Participant, Question},
    },
};

/// Emit an event to every connection in the room `code`.
pub fn emit_to_room(state: &AppState, code: &str, event: &SocketEvent) {
    for tx in state.room_senders(code) {
        let _ = send_event(&tx, event);
    }
}

/// Emit an event to a single connection, silently skipping dead sockets.
pub fn emit_to_socket(state: &AppState, socket_id: &str, event: &SocketEvent) {
    if let Some(tx) = state.sender(socket_id) {
        let _ = send_event(&tx, event);
    }
}

/// Notify the host that a participant joined.
pub fn notify_participant_joined(state: &AppState, host_socket_id: &str, participant: &Participant) {
    emit_to_socket(
        state,
        host_socket_id,
        &SocketEvent::ParticipantJoined(participant.clone()),
    );
}

/// Notify the host of a new or updated response, identity-stripped where the
/// question was anonymous.
pub fn notify_new_response(state: &AppState, host_socket_id: &str, response: ResponseForHost) {
    emit_to_socket(state, host_socket_id, &SocketEvent::NewResponse(response));
}

/// Broadcast a freshly-activated question to the room, answers stripped.
pub fn broadcast_new_question(state: &AppState, code: &str, question: &Question) {
    emit_to_room(
        state,
        code,
        &SocketEvent::NewQuestion(question.without_answers()),
    );
}

/// Replay the active question (answers stripped) to one reconnecting socket.
pub fn send_question_to_socket(state: &AppState, socket_id: &str, question: &Question) {
    emit_to_socket(
        state,
        socket_id,
        &SocketEvent::NewQuestion(question.without_answers()),
    );
}

/// Broadcast that the active question closed, with its full content.
pub fn broadcast_question_ended(state: &AppState, code: &str, question: &Question) {
    emit_to_room(state, code, &SocketEvent::QuestionEnded(question.clone()));
}

/// Broadcast the remaining seconds of the active question's countdown.
pub fn broadcast_timer_update(state: &AppState, code: &str, seconds_remaining: u32) {
    emit_to_room(state, code, &SocketEvent::TimerUpdate(seconds_remaining));
}

/// Broadcast that the session ended; callers disconnect the room afterwards.
pub fn broadcast_session_ended(state: &AppState, code: &str) {
    emit_to_room(state, code, &SocketEvent::SessionEnded);
}
