//! # swshell - Pooled interactive shells for network switches
//!
//! `swshell` drives the interactive CLI of network switches over SSH the way
//! an operator would: it opens a shell, fingerprints the device, disables
//! pagination, sends commands and decides from output timing alone when the
//! device has finished answering.
//!
//! ## Features
//!
//! - **Session Pooling**: One cached shell per device login, validated with a
//!   liveness probe before reuse and evicted after ten idle minutes
//! - **Per-Device Serialization**: Commands for the same login never interleave
//! - **Brand Detection**: Version output is matched against a signature catalog
//! - **Idle-Timeout Reads**: A response ends when the device goes quiet
//! - **Output Filtering**: Echo noise and trailing prompts are stripped
//! - **Legacy Compatibility**: Optional SSH algorithm profile for old firmware
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swshell::config::PoolConfig;
//! use swshell::device::SignatureCatalog;
//! use swshell::diagnostics::UnknownDeviceLog;
//! use swshell::session::{ConnectionSecurityOptions, DeviceTarget, SessionPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(SignatureCatalog::from_path("devices.json")?);
//!     let pool = SessionPool::with_ssh(
//!         catalog,
//!         Arc::new(UnknownDeviceLog::default()),
//!         PoolConfig::default(),
//!         ConnectionSecurityOptions::legacy_compatible(),
//!     )?;
//!
//!     let target = DeviceTarget::new("admin", "password", "192.168.1.1", 22);
//!     println!("brand: {}", pool.brand(&target).await?);
//!
//!     let output = pool.run_commands(&target, None, &["show version"]).await?;
//!     println!("{output}");
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::SessionPool`] - Session cache, per-device locking and eviction
//! - [`session::SwitchSession`] - One shell with its stream pump
//! - [`device::SignatureCatalog`] - OS signatures and brand fingerprinting
//! - [`filter::filter_output`] - Echo and prompt stripping
//! - [`error::ConnectError`] - Error types for connection and setup
//! - [`config`] - SSH algorithm profiles and pool timing

pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod session;
pub mod templates;
