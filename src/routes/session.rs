use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::session::{
        JoinSessionRequest, SessionExistsResponse, SessionForHost, SubmittedResponse,
    },
    error::AppError,
    services::session_service,
    state::{
        SharedState,
        session::{Participant, Question},
    },
};

/// Header carrying the WebSocket connection id of the caller.
pub const SOCKET_ID_HEADER: &str = "X-Socket-ID";
/// Header carrying the host secret returned at session creation.
pub const HOST_SECRET_HEADER: &str = "X-Host-Secret";
/// Header carrying the participant secret returned on join.
pub const PARTICIPANT_SECRET_HEADER: &str = "X-Participant-Secret";

/// Routes handling the session lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/sessionExists/{code}", get(session_exists))
        .route("/session/{code}", delete(end_session))
        .route("/session/{code}/participants", post(join_session))
        .route(
            "/session/{code}/activeQuestion",
            post(activate_question).delete(close_question),
        )
        .route(
            "/session/{code}/checkActiveQuestion",
            get(check_active_question),
        )
        .route("/session/{code}/responses", put(respond_to_question))
}

/// Create a new session hosted by the caller's WebSocket connection.
#[utoipa::path(
    post,
    path = "/api/session",
    tag = "session",
    params(("X-Socket-ID" = String, Header, description = "WebSocket connection id of the host")),
    responses(
        (status = 200, description = "Session created", body = SessionForHost)
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<SessionForHost>, AppError> {
    let socket_id = require_header(&headers, SOCKET_ID_HEADER)?;
    let session = session_service::create_session(&state, &socket_id).await?;
    Ok(Json(session))
}

/// Report whether a session with this code currently exists.
#[utoipa::path(
    get,
    path = "/api/sessionExists/{code}",
    tag = "session",
    params(("code" = String, Path, description = "Session code to probe")),
    responses(
        (status = 200, description = "Lookup result", body = SessionExistsResponse)
    )
)]
pub async fn session_exists(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Json<SessionExistsResponse> {
    let session_exists = session_service::check_session_exists(&state, &code).await;
    Json(SessionExistsResponse { session_exists })
}

/// End a session and return its final snapshot.
#[utoipa::path(
    delete,
    path = "/api/session/{code}",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Host-Secret" = String, Header, description = "Host secret of the session")
    ),
    responses(
        (status = 200, description = "Session ended", body = SessionForHost)
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionForHost>, AppError> {
    let host_secret = require_header(&headers, HOST_SECRET_HEADER)?;
    let session = session_service::end_session(&state, &code, &host_secret).await?;
    Ok(Json(session))
}

/// Join a session as a participant.
#[utoipa::path(
    post,
    path = "/api/session/{code}/participants",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Socket-ID" = String, Header, description = "WebSocket connection id of the participant")
    ),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Joined the session", body = Participant)
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<Json<Participant>, AppError> {
    let socket_id = require_header(&headers, SOCKET_ID_HEADER)?;
    let participant =
        session_service::join_session(&state, &code, payload.name, &socket_id).await?;
    Ok(Json(participant))
}

/// Activate a question for the session.
#[utoipa::path(
    post,
    path = "/api/session/{code}/activeQuestion",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Host-Secret" = String, Header, description = "Host secret of the session")
    ),
    request_body = Question,
    responses(
        (status = 204, description = "Question activated and broadcast")
    )
)]
pub async fn activate_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(question): Json<Question>,
) -> Result<StatusCode, AppError> {
    let host_secret = require_header(&headers, HOST_SECRET_HEADER)?;
    session_service::activate_question(&state, &code, &host_secret, question).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Close the active question ahead of its timer.
#[utoipa::path(
    delete,
    path = "/api/session/{code}/activeQuestion",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Host-Secret" = String, Header, description = "Host secret of the session")
    ),
    responses(
        (status = 204, description = "Question closed and broadcast")
    )
)]
pub async fn close_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let host_secret = require_header(&headers, HOST_SECRET_HEADER)?;
    session_service::close_question(&state, &code, &host_secret).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replay the active question to the caller's WebSocket connection.
#[utoipa::path(
    get,
    path = "/api/session/{code}/checkActiveQuestion",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Socket-ID" = String, Header, description = "WebSocket connection id to replay to")
    ),
    responses(
        (status = 204, description = "Active question sent over the socket, if any")
    )
)]
pub async fn check_active_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let socket_id = require_header(&headers, SOCKET_ID_HEADER)?;
    session_service::check_active_question(&state, &code, &socket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a participant's response to the active question.
#[utoipa::path(
    put,
    path = "/api/session/{code}/responses",
    tag = "session",
    params(
        ("code" = String, Path, description = "Session code"),
        ("X-Participant-Secret" = String, Header, description = "Secret of the responding participant")
    ),
    request_body = SubmittedResponse,
    responses(
        (status = 204, description = "Response stored and forwarded to the host")
    )
)]
pub async fn respond_to_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(submitted): Json<SubmittedResponse>,
) -> Result<StatusCode, AppError> {
    let participant_secret = require_header(&headers, PARTICIPANT_SECRET_HEADER)?;
    session_service::respond_to_question(&state, &code, &participant_secret, submitted).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_header(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| AppError::BadRequest(format!("header `{name}` is not present")))
}
