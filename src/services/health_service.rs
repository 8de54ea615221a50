use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the service status and the number of live sessions.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.sessions().len().await)
}
