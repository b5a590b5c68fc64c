//! REST API handlers for node operations

use crate::core::{Block, Transaction};
use crate::crypto::{HexKeyPair, KeyPair};
use crate::network::{
    ChainResponse, MessageResponse, MineResponse, Node, NodeError, NodeStats, RegisterRequest,
    ResolveOutcome,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub node: Arc<Node>,
}

impl ApiState {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Map a node error to its HTTP status
pub fn status_for(error: &NodeError) -> StatusCode {
    match error {
        NodeError::Validation(_) | NodeError::BlockRejected(_) => StatusCode::BAD_REQUEST,
        NodeError::Authentication(_) => StatusCode::UNAUTHORIZED,
        NodeError::Duplicate | NodeError::TipMoved(_) => StatusCode::CONFLICT,
        NodeError::ChainTampered(_) => StatusCode::UNPROCESSABLE_ENTITY,
        NodeError::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
        NodeError::BlockNotFound(_) => StatusCode::NOT_FOUND,
        NodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: NodeError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&error);
    if status.is_server_error() {
        log::error!("Request failed: {}", error);
    }
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

fn bad_request(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message }))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// POST /new_transaction - Submit a signed transaction
pub async fn new_transaction(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(value) =
        payload.map_err(|e| bad_request(format!("Invalid transaction data: {}", e)))?;

    state
        .node
        .submit_transaction(value)
        .await
        .map_err(api_error)?;

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Success"))))
}

/// GET /chain - Full chain and known peers
pub async fn get_chain(State(state): State<ApiState>) -> Json<ChainResponse> {
    Json(state.node.chain().await)
}

/// GET /mine - Mine pending transactions
pub async fn mine(State(state): State<ApiState>) -> ApiResult<Json<MineResponse>> {
    state.node.mine().await.map(Json).map_err(api_error)
}

/// GET /pending_tx - Transactions waiting to be mined
pub async fn pending_tx(State(state): State<ApiState>) -> Json<Vec<Transaction>> {
    Json(state.node.pending().await)
}

/// GET /block/{index}/hash - Recomputed hash of a block
pub async fn block_hash(
    State(state): State<ApiState>,
    Path(index): Path<u64>,
) -> ApiResult<String> {
    state.node.block_hash(index).await.map_err(api_error)
}

/// POST /register_node - Add the caller as a peer
pub async fn register_node(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<ChainResponse>> {
    let Json(request) = payload.map_err(|e| bad_request(format!("Invalid data: {}", e)))?;

    state
        .node
        .register_peer(&request.node_address)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /register_with - Join the network through a remote node
pub async fn register_with(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload.map_err(|e| bad_request(format!("Invalid data: {}", e)))?;

    state
        .node
        .register_with(&request.node_address)
        .await
        .map_err(api_error)?;

    Ok(Json(MessageResponse::new("Registration successful")))
}

/// POST /add_block - Block mined by a peer
pub async fn add_block(
    State(state): State<ApiState>,
    payload: Result<Json<Block>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(block) = payload
        .map_err(|e| bad_request(format!("The block was discarded by the node: {}", e)))?;

    state.node.accept_block(block).await.map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Block added to the chain")),
    ))
}

/// POST /consensus - Adopt the longest valid chain among peers
pub async fn consensus(State(state): State<ApiState>) -> Json<ResolveOutcome> {
    Json(state.node.resolve().await)
}

/// GET /peers - Known peers
pub async fn get_peers(State(state): State<ApiState>) -> Json<Vec<String>> {
    Json(state.node.peers().await)
}

/// GET /keys - Fresh key pair for a new account
pub async fn generate_keys() -> Json<HexKeyPair> {
    Json(KeyPair::generate().to_hex())
}

/// GET /stats - Node counters
pub async fn get_stats(State(state): State<ApiState>) -> Json<NodeStats> {
    Json(state.node.stats().await)
}
