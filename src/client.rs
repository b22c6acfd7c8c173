//! Chat peer
//!
//! Connects once, then runs two concurrent flows until either side
//! closes: everything the socket delivers goes to stdout exactly as
//! received, and every console line goes to the socket.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::ChatError;

/// Connect to `addr` and relay between the console and the socket.
pub async fn run(addr: &str) -> Result<(), ChatError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(ChatError::Connect)?;
    info!(%addr, "connected to chat");
    let (read_half, write_half) = stream.into_split();

    tokio::select! {
        res = print_incoming(read_half) => res?,
        res = send_console_lines(write_half) => res?,
    }
    info!("session closed");
    Ok(())
}

/// Socket to stdout: print chunks exactly as they arrive.
async fn print_incoming(mut read_half: OwnedReadHalf) -> Result<(), ChatError> {
    let mut stdout = tokio::io::stdout();
    let mut buf = [0u8; 1024];
    loop {
        let read = read_half.read(&mut buf).await?;
        if read == 0 {
            debug!("server closed the connection");
            return Ok(());
        }
        stdout.write_all(&buf[..read]).await?;
        stdout.flush().await?;
    }
}

/// Console to socket: one line at a time; EOF shuts the write side down.
async fn send_console_lines(mut write_half: OwnedWriteHalf) -> Result<(), ChatError> {
    let mut console = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    loop {
        line.clear();
        if console.read_line(&mut line).await? == 0 {
            debug!("console closed");
            let _ = write_half.shutdown().await;
            return Ok(());
        }
        write_half.write_all(line.as_bytes()).await?;
    }
}
