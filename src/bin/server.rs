//! Broadcast chat server - entry point
//!
//! Binds the listener and accepts connections until killed.

use std::env;

use tracing_subscriber::EnvFilter;

use chat_relay::{cli, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let port = match cli::parse_port(env::args().skip(1)) {
        Ok(port) => port,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: chat-server [PORT]");
            std::process::exit(1);
        }
    };

    let server = Server::bind(("0.0.0.0", port)).await?;
    server.run().await;
    Ok(())
}
