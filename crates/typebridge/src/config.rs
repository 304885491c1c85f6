// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: Compile-time constants (ABI version, env var names)
//! - **Level 2 (Dynamic)**: [`BridgeConfig`] swapped atomically at runtime
//!
//! Reads go through an `ArcSwap`, so the invocation hot path never takes a
//! lock to consult the configuration.
//!
//! # Example
//!
//! ```
//! use typebridge::config::{self, BridgeConfig};
//! use std::time::Duration;
//!
//! config::set_config(BridgeConfig {
//!     future_timeout: Some(Duration::from_secs(5)),
//!     ..BridgeConfig::default()
//! });
//! assert_eq!(config::config().future_timeout, Some(Duration::from_secs(5)));
//! # config::set_config(BridgeConfig::default());
//! ```

use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Version of the `#[repr(C)]` record layouts exposed to foreign callers.
///
/// Any change to field order or size of a boundary record bumps this.
pub const ABI_VERSION: u32 = 1;

/// Default `future_get` timeout in milliseconds (env override).
pub const ENV_FUTURE_TIMEOUT_MS: &str = "TYPEBRIDGE_FUTURE_TIMEOUT_MS";

/// Reject non-null result buffers for void functions (env override).
pub const ENV_STRICT_VOID_RESULT: &str = "TYPEBRIDGE_STRICT_VOID_RESULT";

/// Contain panics raised by bound methods (env override).
pub const ENV_CATCH_PANICS: &str = "TYPEBRIDGE_CATCH_PANICS";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Timeout applied by `future_get` when the caller passes none.
    /// `None` waits until the value is available.
    pub future_timeout: Option<Duration>,
    /// When set, calling a void function with a non-null result buffer is
    /// rejected instead of ignored.
    pub strict_void_result: bool,
    /// Convert panics in bound methods into `BridgeError::Panicked`.
    pub catch_panics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            future_timeout: None,
            strict_void_result: false,
            catch_panics: true,
        }
    }
}

impl BridgeConfig {
    /// Build a configuration from the process environment, falling back to
    /// defaults for unset or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_FUTURE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => cfg.future_timeout = Some(Duration::from_millis(ms)),
                Err(_) => log::warn!(
                    "[config] ignoring {}={:?}: not a millisecond count",
                    ENV_FUTURE_TIMEOUT_MS,
                    raw
                ),
            }
        }
        if let Some(flag) = lookup(ENV_STRICT_VOID_RESULT).and_then(|v| parse_flag(&v)) {
            cfg.strict_void_result = flag;
        }
        if let Some(flag) = lookup(ENV_CATCH_PANICS).and_then(|v| parse_flag(&v)) {
            cfg.catch_panics = flag;
        }
        cfg
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            log::warn!("[config] ignoring unrecognized flag value {:?}", other);
            None
        }
    }
}

fn slot() -> &'static ArcSwap<BridgeConfig> {
    static CONFIG: OnceLock<ArcSwap<BridgeConfig>> = OnceLock::new();
    CONFIG.get_or_init(|| ArcSwap::from_pointee(BridgeConfig::from_env()))
}

/// Current configuration (atomic load, no lock).
#[inline]
#[must_use]
pub fn config() -> Arc<BridgeConfig> {
    slot().load_full()
}

/// Replace the process-wide configuration.
pub fn set_config(cfg: BridgeConfig) {
    log::debug!("[config] updated: {:?}", cfg);
    slot().store(Arc::new(cfg));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = BridgeConfig::from_lookup(|_| None);
        assert_eq!(cfg, BridgeConfig::default());
        assert!(cfg.catch_panics);
        assert!(!cfg.strict_void_result);
        assert!(cfg.future_timeout.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let cfg = BridgeConfig::from_lookup(lookup_from(&[
            (ENV_FUTURE_TIMEOUT_MS, "250"),
            (ENV_STRICT_VOID_RESULT, "yes"),
            (ENV_CATCH_PANICS, "off"),
        ]));
        assert_eq!(cfg.future_timeout, Some(Duration::from_millis(250)));
        assert!(cfg.strict_void_result);
        assert!(!cfg.catch_panics);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = BridgeConfig::from_lookup(lookup_from(&[
            (ENV_FUTURE_TIMEOUT_MS, "soon"),
            (ENV_CATCH_PANICS, "maybe"),
        ]));
        assert!(cfg.future_timeout.is_none());
        assert!(cfg.catch_panics);
    }
}
