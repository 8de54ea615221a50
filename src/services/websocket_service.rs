use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::SocketEvent,
    state::{ClientConnection, SharedState},
};

/// Handle the full lifecycle for an individual client WebSocket connection.
///
/// The connection is assigned a fresh socket id, announced to the client via
/// a [`SocketEvent::Connected`] frame, and registered so REST handlers can
/// resolve the `X-Socket-ID` header against it. Room membership is applied by
/// the session operations; this loop only keeps the connection alive.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let socket_id = Uuid::new_v4().to_string();
    state.register_connection(ClientConnection {
        id: socket_id.clone(),
        room: None,
        tx: outbound_tx.clone(),
    });

    if send_event(
        &outbound_tx,
        &SocketEvent::Connected {
            socket_id: socket_id.clone(),
        },
    )
    .is_err()
    {
        warn!(id = %socket_id, "connection closed before the id handshake");
        state.remove_connection(&socket_id);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    info!(id = %socket_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            // Clients talk to the server over REST; inbound frames other
            // than control messages are ignored.
            Ok(Message::Text(_)) | Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %socket_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.remove_connection(&socket_id);
    info!(id = %socket_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize an event and push it onto the provided connection sender.
///
/// An `Err` means the writer channel is closed and the connection is gone;
/// callers that broadcast simply skip dead members.
pub fn send_event(
    tx: &mpsc::UnboundedSender<Message>,
    event: &SocketEvent,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            // A serialization failure is a bug in an event type, not a
            // connection problem; log and drop the frame.
            warn!(error = %err, "failed to serialize socket event `{event:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into())).map_err(|_| ())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
