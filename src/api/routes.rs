//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // Transactions
        .route("/new_transaction", post(handlers::new_transaction))
        .route("/pending_tx", get(handlers::pending_tx))
        // Chain
        .route("/chain", get(handlers::get_chain))
        .route("/mine", get(handlers::mine))
        .route("/block/{index}/hash", get(handlers::block_hash))
        // Peers
        .route("/register_node", post(handlers::register_node))
        .route("/register_with", post(handlers::register_with))
        .route("/add_block", post(handlers::add_block))
        .route("/consensus", post(handlers::consensus))
        .route("/peers", get(handlers::get_peers))
        // Accounts
        .route("/keys", get(handlers::generate_keys))
        .with_state(state)
        .layer(cors)
}
