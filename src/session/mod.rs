//! Switch shell sessions and the session pool.
//!
//! A session wraps one interactive SSH shell. Two background tasks pump bytes
//! between the transport and a pair of bounded queues; reads poll the
//! inbound queue until the device goes quiet. The pool caches one session per
//! identity, serializes work per identity and evicts idle sessions.
//!
//! # Main Components
//!
//! - [`SessionPool`] - Session cache, per-identity locking and eviction
//! - [`SwitchSession`] - One shell with its pump and detected brand
//! - [`ShellTransport`] / [`Connector`] - Where shells come from
//! - [`DeviceTarget`] - Identity of a device login

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};
use log::{debug, trace, warn};
use russh::Preferred;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{self, PoolConfig, ReadTiming};
use crate::device::SignatureCatalog;
use crate::diagnostics::DiagnosticsSink;
use crate::error::ConnectError;
use crate::filter::filter_output;
use crate::templates::{self, PROMPT_CHARS};

pub use client::SwitchSession;
pub use manager::SessionPool;
pub use pump::PumpStatus;
pub use security::{ConnectionSecurityOptions, SecurityLevel};
pub use transport::{Connector, ShellTransport, SshConnector};

/// Login parameters of one device.
///
/// The password never appears in `Debug` output or in the identity key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceTarget {
    pub user: String,
    pub password: String,
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    22
}

impl std::fmt::Debug for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTarget")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("addr", &self.addr)
            .field("port", &self.port)
            .finish()
    }
}

impl DeviceTarget {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        addr: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            addr: addr.into(),
            port,
        }
    }

    /// `user@addr:port`, used in log lines.
    pub fn device_addr(&self) -> String {
        format!("{}@{}:{}", self.user, self.addr, self.port)
    }

    /// Cache key: the device address plus a SHA-256 digest of the password,
    /// so a credential change maps to a different session.
    pub fn identity_key(&self) -> String {
        let digest: [u8; 32] = Sha256::digest(self.password.as_bytes()).into();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{}#{}", self.device_addr(), hex)
    }
}

/// Lifecycle of a [`SwitchSession`].
///
/// `Connecting` covers dialing and PTY allocation inside a [`Connector`];
/// a session object only exists from `ShellReady` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SessionState {
    Connecting,
    /// Banner drained, brand not yet settled.
    ShellReady,
    /// Brand settled and pagination disabled.
    Active,
    Closed,
}

mod client;
mod manager;
mod pump;
mod reader;
mod security;
mod transport;
