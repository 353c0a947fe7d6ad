//! Runs a standalone chat endpoint.
//!
//! Usage:
//!   cargo run --example chat_server
//!   cargo run --example chat_server -- --port 8080
//!   cargo run --example chat_server -- --config pairchat.json --debug

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use pairchat::{ChatServer, Result, ServerOptions};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
struct Args {
    debug: bool,
    port: Option<u16>,
    config: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--port" => args.port = iter.next().and_then(|p| p.parse().ok()),
                "--config" => args.config = iter.next().map(PathBuf::from),
                other => eprintln!("[WARN] Ignoring unknown argument: {other}"),
            }
        }

        args
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug { "pairchat=debug" } else { "pairchat=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => ServerOptions::from_json_file(path)?,
        None => ServerOptions::default(),
    };
    if let Some(port) = args.port {
        options.port = port;
    }

    let server = ChatServer::bind(options).await?;
    println!("Chat endpoint: {}", server.ws_url());
    println!("Press Ctrl+C to exit...");

    tokio::signal::ctrl_c().await?;

    println!("Shutting down ({:?})", server.stats());
    server.shutdown().await;
    Ok(())
}
