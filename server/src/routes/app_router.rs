use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;

use crate::{request_tracing, ServerState};

use super::{auth, emails};

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        Router::new()
            .route("/", get(|| async { "Inbox server" }))
            .route("/auth/google", get(auth::handler_auth_google))
            .route("/auth/callback", get(auth::handler_auth_callback))
            .route("/auth/session", get(auth::handler_session))
            .route("/auth/logout", post(auth::handler_logout))
            .route("/api/emails", get(emails::handler_list_emails))
            .route("/api/emails/action", post(emails::handler_bulk_action))
            .route("/api/emails/delete", post(emails::handler_bulk_delete))
            .route("/api/emails/send", post(emails::handler_send_email))
            .route("/api/emails/:id", get(emails::handler_get_email))
            .layer(request_tracing::trace_with_request_id_layer())
            .layer(CorsLayer::permissive())
            .layer(CookieManagerLayer::new())
            .with_state(state)
            .fallback(handler_404)
    }
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Route does not exist")
}
