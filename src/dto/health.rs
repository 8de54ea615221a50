use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status (always "ok" while the process is serving).
    pub status: String,
    /// Number of sessions currently live in the store.
    pub active_sessions: usize,
}

impl HealthResponse {
    /// Create a health response with the current live-session count.
    pub fn ok(active_sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_sessions,
        }
    }
}
