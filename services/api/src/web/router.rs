//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes. Note routes sit behind the session middleware;
//! signup, login, logout and the health probe are public.

use crate::web::{
    auth::{current_user_handler, login_handler, logout_handler, signup_handler},
    middleware::require_auth,
    rest::{
        create_note_handler, delete_note_handler, get_note_handler, list_notes_handler,
        search_notes_handler, update_note_handler,
    },
    state::AppState,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

async fn health_handler() -> &'static str {
    "ok"
}

/// Builds the application router over the given state.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/signup", post(signup_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/user", get(current_user_handler))
        .route("/api/notes", get(list_notes_handler).post(create_note_handler))
        .route("/api/notes/search", get(search_notes_handler))
        .route(
            "/api/notes/{id}",
            get(get_note_handler)
                .patch(update_note_handler)
                .delete(delete_note_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
