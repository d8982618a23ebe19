// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broker configuration - single source of truth for wire constants.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: binary wire constants (slot width, type markers,
//!   structure magic values). **Never hardcode them elsewhere.**
//! - **Level 2 (Dynamic)**: [`BrokerConfig`] loaded from defaults, YAML and
//!   the environment, published through [`RuntimeConfig`] for lock-free
//!   reads and atomic replacement.
//!
//! # Example
//!
//! ```ignore
//! use cimbroker::config::{BrokerConfig, RuntimeConfig};
//!
//! let runtime = RuntimeConfig::new(BrokerConfig::from_env());
//! let host = runtime.hostname();
//! runtime.store(BrokerConfig { hostname: "srv2".into(), ..BrokerConfig::default() });
//! ```

use crate::aggregate::FailurePolicy;
use crate::error::{CimStatusCode, Error, Result};
use arc_swap::ArcSwap;
use std::sync::Arc;

// ============================================================================
// Binary wire constants
// ============================================================================

/// Width of every primitive slot and the alignment of every variable field.
pub const SLOT_SIZE: usize = 8;

/// Response unit marker: classic objects follow.
pub const BINARY_TYPE_CPPD: u32 = 0xFFFF_0002;

/// Response unit marker: compact objects follow.
pub const BINARY_TYPE_SCMO: u32 = 0xFFFF_0004;

/// Structure magic values written ahead of composite objects when
/// magic validation is enabled.
pub const MAGIC_PATH: u32 = 0x9E3A_4B10;
pub const MAGIC_QUALIFIER: u32 = 0x9E3A_4B11;
pub const MAGIC_PROPERTY: u32 = 0x9E3A_4B12;
pub const MAGIC_PARAMETER: u32 = 0x9E3A_4B13;
pub const MAGIC_METHOD: u32 = 0x9E3A_4B14;
pub const MAGIC_INSTANCE: u32 = 0x9E3A_4B15;
pub const MAGIC_CLASS: u32 = 0x9E3A_4B16;
pub const MAGIC_COMPACT_CLASS: u32 = 0x9E3A_4B17;
pub const MAGIC_COMPACT_OBJECT: u32 = 0x9E3A_4B18;

/// Upper bound accepted for any decoded element count.
///
/// Counts are checked against the remaining input as well; this caps the
/// up-front allocation for a corrupt count.
pub const MAX_DECODE_COUNT: usize = 1 << 24;

/// Deepest chain of embedded objects accepted by the decoders.
pub const MAX_NESTING_DEPTH: u16 = 32;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOSTNAME: &str = "localhost";

pub const ENV_HOSTNAME: &str = "CIMBROKER_HOSTNAME";
pub const ENV_BINARY_MAGIC: &str = "CIMBROKER_BINARY_MAGIC";

/// Broker settings consulted by the response and aggregation layers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-loaders", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(default))]
pub struct BrokerConfig {
    /// Host name stamped into result paths that carry none.
    pub hostname: String,
    /// Write and verify structure magic values in the binary codec.
    pub binary_magic: bool,
    /// Default for requests that do not say.
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    /// Status codes a partial may fail with without failing the whole
    /// aggregation. Empty selects first-failure-wins.
    pub tolerated_status_codes: Vec<u32>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            binary_magic: true,
            include_qualifiers: false,
            include_class_origin: false,
            tolerated_status_codes: Vec::new(),
        }
    }
}

impl BrokerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `CIMBROKER_HOSTNAME` and `CIMBROKER_BINARY_MAGIC` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(ENV_HOSTNAME) {
            if !host.trim().is_empty() {
                self.hostname = host.trim().to_string();
            }
        }
        if let Ok(flag) = std::env::var(ENV_BINARY_MAGIC) {
            match parse_flag(&flag) {
                Some(on) => self.binary_magic = on,
                None => log::warn!(
                    "[config] Ignoring {}='{}' (expected true/false/1/0)",
                    ENV_BINARY_MAGIC,
                    flag
                ),
            }
        }
    }

    /// Aggregation failure policy described by this configuration.
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.tolerated_status_codes.is_empty() {
            return FailurePolicy::FirstFailure;
        }
        let tolerated = self
            .tolerated_status_codes
            .iter()
            .filter_map(|code| {
                let status = CimStatusCode::from_code(*code);
                if status.is_none() {
                    log::warn!("[config] Unknown CIM status code {} ignored", code);
                }
                status
            })
            .collect();
        FailurePolicy::BestEffort { tolerated }
    }

    /// Parse a YAML document; absent keys keep their defaults.
    #[cfg(feature = "config-loaders")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Load a YAML file, then apply environment overrides.
    #[cfg(feature = "config-loaders")]
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides();
        log::debug!(
            "[config] Loaded {} (hostname={}, binary_magic={})",
            path.display(),
            config.hostname,
            config.binary_magic
        );
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared, atomically replaceable broker configuration.
///
/// Reads are a single atomic load; replacing the configuration never blocks
/// readers, which keep the snapshot they loaded.
#[derive(Clone)]
pub struct RuntimeConfig {
    current: Arc<ArcSwap<BrokerConfig>>,
}

impl RuntimeConfig {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current snapshot.
    #[inline]
    #[must_use]
    pub fn load(&self) -> Arc<BrokerConfig> {
        self.current.load_full()
    }

    /// Replace the configuration for all subsequent reads.
    pub fn store(&self, config: BrokerConfig) {
        log::debug!("[config] Runtime configuration replaced");
        self.current.store(Arc::new(config));
    }

    #[inline]
    pub fn hostname(&self) -> String {
        self.current.load().hostname.clone()
    }

    #[inline]
    pub fn binary_magic(&self) -> bool {
        self.current.load().binary_magic
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("current", &*self.current.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_distinct() {
        assert_ne!(BINARY_TYPE_CPPD, BINARY_TYPE_SCMO);
        let magics = [
            MAGIC_PATH,
            MAGIC_QUALIFIER,
            MAGIC_PROPERTY,
            MAGIC_PARAMETER,
            MAGIC_METHOD,
            MAGIC_INSTANCE,
            MAGIC_CLASS,
            MAGIC_COMPACT_CLASS,
            MAGIC_COMPACT_OBJECT,
        ];
        for (i, a) in magics.iter().enumerate() {
            assert!(magics[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn test_failure_policy_from_codes() {
        let mut config = BrokerConfig::default();
        assert_eq!(config.failure_policy(), FailurePolicy::FirstFailure);
        config.tolerated_status_codes = vec![7, 99];
        assert_eq!(
            config.failure_policy(),
            FailurePolicy::BestEffort {
                tolerated: vec![CimStatusCode::NotSupported]
            }
        );
    }

    #[test]
    fn test_runtime_swap_keeps_old_snapshot() {
        let runtime = RuntimeConfig::default();
        let before = runtime.load();
        runtime.store(BrokerConfig {
            hostname: "srv2".into(),
            ..BrokerConfig::default()
        });
        assert_eq!(before.hostname, DEFAULT_HOSTNAME);
        assert_eq!(runtime.hostname(), "srv2");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_yaml_partial_document() {
        let config = BrokerConfig::from_yaml_str("hostname: cimsrv\ntolerated_status_codes: [7]\n")
            .expect("valid yaml");
        assert_eq!(config.hostname, "cimsrv");
        assert!(config.binary_magic);
        assert_eq!(config.tolerated_status_codes, vec![7]);
        assert!(BrokerConfig::from_yaml_str("hostname: [").is_err());
    }
}
