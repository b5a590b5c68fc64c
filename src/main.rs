//! Ledger node CLI application
//!
//! Runs a node, or works with keys and transactions offline.

use clap::{Parser, Subcommand};
use ledger_node::cli;
use ledger_node::core::DEFAULT_DIFFICULTY;
use ledger_node::network::{AnnouncerConfig, NodeConfig};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(version = "0.1.0")]
#[command(about = "A minimal proof-of-work ledger node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node and serve its HTTP API
    Start {
        /// Interface to listen on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Address peers use to reach this node (defaults to host:port)
        #[arg(long)]
        advertise: Option<String>,

        /// Mining difficulty (number of leading zero hex characters)
        #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: usize,

        /// Node to register with at startup
        #[arg(long)]
        peer: Option<String>,

        /// Announcement worker count
        #[arg(long, default_value = "10")]
        workers: usize,

        /// Peer request timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },

    /// Generate a key pair
    Keygen,

    /// Sign a transaction and print it as JSON
    Sign {
        /// Hex private key of the author
        #[arg(short = 'k', long)]
        private_key: String,

        /// Post content
        #[arg(short, long)]
        content: Option<String>,

        /// Transfer receiver
        #[arg(short, long)]
        receiver: Option<String>,

        /// Transfer amount
        #[arg(short, long)]
        amount: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            host,
            port,
            advertise,
            difficulty,
            peer,
            workers,
            timeout_ms,
        } => {
            let config = NodeConfig {
                host,
                port,
                advertise_address: advertise,
                difficulty,
                bootstrap_peer: peer,
                request_timeout: Duration::from_millis(timeout_ms),
                announcer: AnnouncerConfig {
                    workers,
                    ..AnnouncerConfig::default()
                },
            };

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_start(config))?;
        }

        Commands::Keygen => {
            cli::cmd_keygen()?;
        }

        Commands::Sign {
            private_key,
            content,
            receiver,
            amount,
        } => {
            cli::cmd_sign(&private_key, content, receiver, amount)?;
        }
    }

    Ok(())
}
