//! Error types for the chat service
//!
//! Uses thiserror for ergonomic error definitions. Per-connection IO
//! failures never surface here: they are contained inside the owning
//! connection and reported through its disconnect path.

use thiserror::Error;

/// Errors surfaced by the client and server entry points.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Establishing the outbound connection failed (fatal for the attempt)
    #[error("failed to connect: {0}")]
    Connect(std::io::Error),

    /// Console or socket IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command-line argument errors. All are fatal with exit code 1.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// More than one positional argument was given
    #[error("expected at most one argument, a TCP port")]
    TooManyArguments,

    /// The port argument was not a number
    #[error("'{0}' is not a valid port number")]
    InvalidPort(String),

    /// The port argument was numeric but outside 0-65535
    #[error("port {0} is out of range; valid ports are 0-65535")]
    PortOutOfRange(u64),
}
