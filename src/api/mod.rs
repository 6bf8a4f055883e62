use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::controller::SearchController;
use crate::synthesizer::GenerativeBackend;

pub mod handlers;
pub mod models;

/// Everything the handlers share. One instance is one browsing context.
pub struct AppState<B> {
    pub controller: SearchController<B>,
    pub google_client_id: String,
    pub sign_in_enabled: bool,
}

pub fn create_router<B>(state: Arc<AppState<B>>) -> Router
where
    B: GenerativeBackend + 'static,
{
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/search", post(handlers::search_handler::<B>))
        .route("/api/state", get(handlers::state_handler::<B>))
        .route("/api/examples", get(handlers::examples_handler))
        .route("/api/session/sign-in", post(handlers::sign_in_handler::<B>))
        .route("/api/session/sign-out", post(handlers::sign_out_handler::<B>))
        .route("/api/session/subscribe", post(handlers::subscribe_handler::<B>))
        .route("/api/upsell/dismiss", post(handlers::dismiss_upsell_handler::<B>))
        .route("/api/home", post(handlers::home_handler::<B>))
        .with_state(state)
        // Static file serving for the UI
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
}
