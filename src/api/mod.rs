//! REST API module
//!
//! HTTP/JSON surface of a node, used by clients and by other nodes.
//!
//! # Endpoints
//!
//! ## Transactions
//! - `POST /new_transaction` - Submit a signed transaction
//! - `GET /pending_tx` - List pending transactions
//!
//! ## Chain
//! - `GET /chain` - Full chain with known peers
//! - `GET /mine` - Mine pending transactions
//! - `GET /block/{index}/hash` - Recomputed block hash
//!
//! ## Peers
//! - `POST /register_node` - Register a peer, returns the chain
//! - `POST /register_with` - Join the network through a remote node
//! - `POST /add_block` - Accept a block mined by a peer
//! - `POST /consensus` - Resolve against peers
//! - `GET /peers` - Known peers
//!
//! ## Misc
//! - `GET /keys` - Generate a key pair
//! - `GET /stats` - Node counters
//! - `GET /health` - Liveness

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
