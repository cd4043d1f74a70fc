//! Route definitions.

use axum::{Router, middleware, routing::get, routing::post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::require_session;
use crate::ws;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Protected routes: the auth gate runs before any of these handlers.
    let protected_routes = Router::new()
        .route("/chat", get(handlers::chat_page))
        .route("/room", get(ws::room_handler))
        .route("/uploader", post(handlers::upload_avatar))
        .layer(middleware::from_fn(require_session))
        .with_state(state.clone());

    // Public routes (no authentication).
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/login", get(handlers::login_page))
        .route("/auth/login/{provider}", get(handlers::login_start))
        .route("/auth/callback/{provider}", get(handlers::login_callback))
        .route("/logout", get(handlers::logout))
        .with_state(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/avatars", ServeDir::new(&state.avatar_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
