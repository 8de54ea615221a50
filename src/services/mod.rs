/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session lifecycle orchestration.
pub mod session_service;
/// WebSocket event construction and delivery.
pub mod socket_events;
/// WebSocket connection handling.
pub mod websocket_service;
