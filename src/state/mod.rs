pub mod codes;
pub mod session;
pub mod store;
pub mod timer;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    error::ServiceError,
    state::{codes::CodeAllocator, session::Session, store::HandleStore, store::KeyedStore,
        timer::TimerHandle},
};

/// Shared handle to the process-wide application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected WebSocket client.
pub struct ClientConnection {
    /// Server-assigned connection identifier (the client's `X-Socket-ID`).
    pub id: String,
    /// Session code of the room this connection joined, if any.
    pub room: Option<String>,
    /// Sender feeding the connection's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: the three singleton stores plus the registry of
/// live WebSocket connections.
pub struct AppState {
    config: AppConfig,
    sessions: KeyedStore<Session>,
    timers: HandleStore<TimerHandle>,
    codes: CodeAllocator,
    connections: DashMap<String, ClientConnection>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config,
            sessions: KeyedStore::new(),
            timers: HandleStore::new(),
            codes: CodeAllocator::new(),
            connections: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Store of live sessions keyed by session code.
    pub fn sessions(&self) -> &KeyedStore<Session> {
        &self.sessions
    }

    /// Store of running countdown handles keyed by session code.
    pub fn timers(&self) -> &HandleStore<TimerHandle> {
        &self.timers
    }

    /// Allocator guaranteeing at-most-once session codes.
    pub fn codes(&self) -> &CodeAllocator {
        &self.codes
    }

    /// Register a freshly-opened connection.
    pub fn register_connection(&self, connection: ClientConnection) {
        self.connections.insert(connection.id.clone(), connection);
    }

    /// Drop a connection from the registry (socket closed or kicked).
    pub fn remove_connection(&self, socket_id: &str) {
        self.connections.remove(socket_id);
    }

    /// Room membership of a connection: `Err` when the connection is gone,
    /// `Ok(None)` when it exists but has not joined a room.
    pub fn connection_room(&self, socket_id: &str) -> Result<Option<String>, ServiceError> {
        self.connections
            .get(socket_id)
            .map(|entry| entry.room.clone())
            .ok_or_else(|| no_such_socket(socket_id))
    }

    /// Atomically place a connection into the room `code`.
    ///
    /// Fails when the connection vanished or already belongs to a room, so a
    /// socket can never end up in two rooms.
    pub fn join_room(&self, socket_id: &str, code: &str) -> Result<(), ServiceError> {
        let mut entry = self
            .connections
            .get_mut(socket_id)
            .ok_or_else(|| no_such_socket(socket_id))?;
        if entry.room.is_some() {
            return Err(ServiceError::InvalidState(
                "connection already joined a session".into(),
            ));
        }
        entry.room = Some(code.to_owned());
        Ok(())
    }

    /// Clear a connection's room membership, if it is still registered.
    pub fn leave_room(&self, socket_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(socket_id) {
            entry.room = None;
        }
    }

    /// Sender for a single connection, if it is still registered.
    pub fn sender(&self, socket_id: &str) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections
            .get(socket_id)
            .map(|entry| entry.tx.clone())
    }

    /// Senders for every connection currently in the room `code`.
    pub fn room_senders(&self, code: &str) -> Vec<mpsc::UnboundedSender<Message>> {
        self.connections
            .iter()
            .filter(|entry| entry.room.as_deref() == Some(code))
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// Forcibly disconnect every connection in the room `code`.
    ///
    /// Each socket gets a Close frame and is dropped from the registry; the
    /// per-socket reader task finishes its own cleanup when the peer goes
    /// away.
    pub fn disconnect_room(&self, code: &str) {
        let members: Vec<String> = self
            .connections
            .iter()
            .filter(|entry| entry.room.as_deref() == Some(code))
            .map(|entry| entry.id.clone())
            .collect();

        for socket_id in members {
            if let Some((_, connection)) = self.connections.remove(&socket_id) {
                let _ = connection.tx.send(Message::Close(None));
            }
        }
    }
}

fn no_such_socket(socket_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("no connection exists with id `{socket_id}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.register_connection(ClientConnection {
            id: id.into(),
            room: None,
            tx,
        });
        rx
    }

    #[tokio::test]
    async fn join_room_is_exclusive() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "s1");

        assert_eq!(state.connection_room("s1").unwrap(), None);
        state.join_room("s1", "AAAAAA").unwrap();
        assert_eq!(
            state.connection_room("s1").unwrap().as_deref(),
            Some("AAAAAA")
        );

        let again = state.join_room("s1", "BBBBBB");
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn unknown_socket_is_not_found() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            state.connection_room("ghost"),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            state.join_room("ghost", "AAAAAA"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn disconnect_room_closes_and_unregisters_members() {
        let state = AppState::new(AppConfig::default());
        let mut in_room = connect(&state, "s1");
        let mut outside = connect(&state, "s2");
        state.join_room("s1", "AAAAAA").unwrap();

        state.disconnect_room("AAAAAA");

        assert!(matches!(in_room.try_recv(), Ok(Message::Close(None))));
        assert!(outside.try_recv().is_err());
        assert!(state.connection_room("s1").is_err());
        assert!(state.connection_room("s2").is_ok());
    }
}
