//! Broadcast chat client - entry point
//!
//! Connects to a local server and relays between console and socket.
//! Logs go to stderr so chat text on stdout stays clean.

use std::env;

use tracing_subscriber::EnvFilter;

use chat_relay::{cli, client};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let port = match cli::parse_port(env::args().skip(1)) {
        Ok(port) => port,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: chat-client [PORT]");
            std::process::exit(1);
        }
    };

    client::run(&format!("127.0.0.1:{port}")).await?;
    Ok(())
}
