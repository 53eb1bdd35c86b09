//! SSH algorithm preferences and pool timing configuration.
//!
//! Switches in the field run anything from current firmware to decade-old
//! SSH stacks, so two algorithm profiles are provided: a strict modern one
//! and a legacy one that keeps CBC ciphers and SHA-1 key exchanges around.
//!
//! [`PoolConfig`] collects every timing knob of the pool: the idle-timeout
//! reader cadence, the quiet periods used at each protocol step, and the
//! eviction schedule. All fields are defaulted, so a JSON document only needs
//! the values it overrides.

use std::time::Duration;

use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// Modern key exchange algorithms.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
];

/// Key exchanges seen on older switch firmware, most preferred first.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_GEX_SHA256,
    kex::DH_GEX_SHA1,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_G1_SHA1,
];

pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

/// Ciphers for legacy devices. CBC modes are still common on access switches,
/// and the oldest ones only speak 3des-cbc.
pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_192_CTR,
    cipher::AES_256_CTR,
    cipher::AES_256_GCM,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
    cipher::TRIPLE_DES_CBC,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1,
    mac::HMAC_SHA1_ETM,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[compression::NONE];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

/// Host key types including SHA-1 RSA and DSA for old firmware.
pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

/// Polling parameters of the idle-timeout reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTiming {
    /// Sleep between two polls of the inbound buffer.
    pub poll_interval: Duration,
    /// Hard ceiling on the number of polls per read.
    pub max_polls: usize,
}

impl Default for ReadTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 300,
        }
    }
}

/// Timing configuration for sessions and the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PoolConfig {
    /// Reader poll cadence in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of polls per read.
    pub max_polls: usize,
    /// Quiet period while draining the login banner.
    pub banner_quiet_ms: u64,
    /// Quiet period of the liveness probe.
    pub liveness_quiet_ms: u64,
    /// Quiet period after the brand probe battery.
    pub probe_quiet_ms: u64,
    /// Quiet period after the pagination-disable command.
    pub pager_quiet_ms: u64,
    /// Quiet period after caller commands.
    pub command_quiet_ms: u64,
    /// Sessions idle for longer than this are evicted.
    pub retention_secs: u64,
    /// Interval between two eviction sweeps.
    pub sweep_interval_secs: u64,
    /// Dial and authentication timeout.
    pub connect_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_polls: 300,
            banner_quiet_ms: 1_000,
            liveness_quiet_ms: 2_000,
            probe_quiet_ms: 3_000,
            pager_quiet_ms: 1_000,
            command_quiet_ms: 2_000,
            retention_secs: 10 * 60,
            sweep_interval_secs: 30,
            connect_timeout_secs: 20,
        }
    }
}

impl PoolConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConnectError> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make reads or sweeps degenerate.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.poll_interval_ms == 0 {
            return Err(ConnectError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.max_polls == 0 {
            return Err(ConnectError::InvalidConfig(
                "max_polls must be positive".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConnectError::InvalidConfig(
                "sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read_timing(&self) -> ReadTiming {
        ReadTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_polls: self.max_polls,
        }
    }

    pub fn banner_quiet(&self) -> Duration {
        Duration::from_millis(self.banner_quiet_ms)
    }

    pub fn liveness_quiet(&self) -> Duration {
        Duration::from_millis(self.liveness_quiet_ms)
    }

    pub fn probe_quiet(&self) -> Duration {
        Duration::from_millis(self.probe_quiet_ms)
    }

    pub fn pager_quiet(&self) -> Duration {
        Duration::from_millis(self.pager_quiet_ms)
    }

    pub fn command_quiet(&self) -> Duration {
        Duration::from_millis(self.command_quiet_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
