//! Line Chat Server - Entry Point
//!
//! Parses flags, starts logging and runs the accept loop until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use line_chat::{serve, Dispatcher, Registry, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat=trace
    let default_filter = if config.verbose {
        "line_chat=debug"
    } else {
        "line_chat=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat server listening on {}", addr);

    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    tokio::select! {
        _ = serve(listener, dispatcher, Arc::new(config)) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down with {} sessions online", registry.len());
        }
    }

    Ok(())
}
