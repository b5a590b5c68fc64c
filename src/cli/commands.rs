//! CLI commands for the node
//!
//! Implements the command handlers behind the binary's subcommands.

use crate::api::{create_router, ApiState};
use crate::core::{Payload, Transaction};
use crate::crypto::KeyPair;
use crate::network::{Node, NodeConfig};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Run a node and serve its API until Ctrl+C
pub async fn cmd_start(config: NodeConfig) -> CliResult<()> {
    let listen_address = config.listen_address();
    let node = Arc::new(Node::new(config)?);

    let listener = tokio::net::TcpListener::bind(&listen_address).await?;
    let app = create_router(ApiState::new(node.clone()));

    println!("🚀 Node listening on http://{}", listen_address);
    println!("   🆔 Node id: {}", node.node_id());
    println!("   🔧 Difficulty: {}", node.config().difficulty);
    println!();

    // Register with the bootstrap peer once we can answer its announcements
    let bootstrap_node = node.clone();
    tokio::spawn(async move {
        if let Err(e) = bootstrap_node.bootstrap().await {
            log::error!("Bootstrap failed: {}", e);
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            println!("\n📴 Shutting down node...");
        })
        .await?;

    Ok(())
}

/// Print a fresh key pair
pub fn cmd_keygen() -> CliResult<()> {
    let pair = KeyPair::generate();

    println!("🔐 New key pair");
    println!("   🔑 Private key: {}", pair.private_key_hex());
    println!("   📍 Public key:  {}", pair.public_key_hex());
    println!("\n   ⚠️  Keep the private key secret; it is not stored anywhere.");
    Ok(())
}

/// Sign a transaction offline and print it as JSON
///
/// A receiver makes it a transfer, otherwise it is a post.
pub fn cmd_sign(
    private_key: &str,
    content: Option<String>,
    receiver: Option<String>,
    amount: Option<u64>,
) -> CliResult<()> {
    let payload = build_payload(content, receiver, amount)?;
    let key_pair = KeyPair::from_private_key_hex(private_key)?;

    let mut tx = Transaction::new(key_pair.public_key_hex(), payload);
    tx.sign(&key_pair)?;

    println!("{}", serde_json::to_string_pretty(&tx)?);
    Ok(())
}

fn build_payload(
    content: Option<String>,
    receiver: Option<String>,
    amount: Option<u64>,
) -> CliResult<Payload> {
    match (content, receiver, amount) {
        (None, Some(receiver), Some(amount)) => Ok(Payload::Transfer { receiver, amount }),
        (Some(content), None, None) => Ok(Payload::Post { content }),
        (None, Some(_), None) => Err("a transfer needs --amount".into()),
        _ => Err("pass either --content or --receiver with --amount".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload() {
        assert!(matches!(
            build_payload(Some("hi".into()), None, None),
            Ok(Payload::Post { .. })
        ));
        assert!(matches!(
            build_payload(None, Some("bob".into()), Some(3)),
            Ok(Payload::Transfer { amount: 3, .. })
        ));
        assert!(build_payload(None, Some("bob".into()), None).is_err());
        assert!(build_payload(Some("hi".into()), Some("bob".into()), Some(1)).is_err());
        assert!(build_payload(None, None, None).is_err());
    }

    #[test]
    fn test_sign_rejects_bad_key() {
        assert!(cmd_sign("not-hex", Some("hi".into()), None, None).is_err());
    }
}
