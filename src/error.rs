//! Error types for switch shell sessions and the session pool.
//!
//! Only connection and setup failures reach callers. Pump faults, failed
//! liveness checks, unknown devices and filter misses are handled inside the
//! crate and never show up here.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors that can occur while connecting to or driving a switch shell.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The shell channel went away before the login banner was drained.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnectError,

    /// The session has already been closed.
    ///
    /// Returned when a caller keeps using a session past eviction or
    /// replacement.
    #[error("connect closed")]
    ConnectClosedError,

    /// Dialing and authenticating did not finish in time.
    #[error("connect timeout: {0}")]
    ConnectTimeout(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Failed to queue a command line for the outbound pump.
    #[error("Failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),

    /// The signature catalog or pool configuration is not valid JSON.
    #[error("catalog parse error: {0}")]
    CatalogParseError(#[from] serde_json::Error),

    /// A signature pattern failed to compile.
    #[error("invalid signature pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Reading the catalog or writing the diagnostics log failed.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Brand detection returned no match for the device.
    #[error("unknown device brand on {0}")]
    UnknownBrand(String),

    /// No catalog entry carries the given brand name.
    #[error("no signature named {0}")]
    SignatureNotFound(String),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
