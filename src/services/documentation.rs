use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Pollwave Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::session::create_session,
        crate::routes::session::session_exists,
        crate::routes::session::end_session,
        crate::routes::session::join_session,
        crate::routes::session::activate_question,
        crate::routes::session::close_question,
        crate::routes::session::check_active_question,
        crate::routes::session::respond_to_question,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::JoinSessionRequest,
            crate::dto::session::SessionExistsResponse,
            crate::dto::session::SubmittedResponse,
            crate::dto::session::ResponseForHost,
            crate::dto::session::SessionForHost,
            crate::state::session::Participant,
            crate::state::session::AnswerChoice,
            crate::state::session::Question,
            crate::state::session::QuestionKind,
            crate::state::session::ResponseAnswer,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session lifecycle operations"),
    )
)]
pub struct ApiDoc;
