mod auth;
mod dto;
mod error;
mod handlers;
mod state;

pub use auth::{token_matches, ADMIN_TOKEN_HEADER};
pub use dto::*;
pub use error::ApiError;
pub use state::AppState;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// `/chat` checks the admin token itself through the command router; the
/// other gated routes sit behind the token middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .route("/web/search", get(handlers::web_search))
        .route("/notes", get(handlers::list_notes).post(handlers::save_note))
        .route("/send-command", post(handlers::send_command))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_admin_token,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/ping", get(handlers::ping))
        .route("/binance/price", get(handlers::price))
        .route("/price", get(handlers::price))
        .route("/rss/crypto", get(handlers::rss_crypto))
        .route("/news", get(handlers::news))
        .route("/sentiment", get(handlers::sentiment))
        .route("/chat", post(handlers::chat))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
