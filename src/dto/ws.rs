use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::session::ResponseForHost,
    state::session::{Participant, Question},
};

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Events pushed to WebSocket clients, tagged `{ "event": ..., "payload": ... }`.
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum SocketEvent {
    /// First frame on every connection, carrying the server-assigned socket
    /// id the client must present as `X-Socket-ID`.
    Connected {
        /// Assigned connection identifier.
        #[serde(rename = "socketId")]
        socket_id: String,
    },
    /// Host-only: a participant joined the session.
    ParticipantJoined(Participant),
    /// Host-only: a response was submitted or updated.
    NewResponse(ResponseForHost),
    /// A question was activated (answers stripped) or replayed to a
    /// reconnecting participant.
    NewQuestion(Question),
    /// The active question was closed, by the host or by its timer.
    QuestionEnded(Question),
    /// Seconds remaining on the active question's countdown.
    TimerUpdate(u32),
    /// The session was ended by the host; the connection will be closed.
    SessionEnded,
}
