//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the server and dispatcher.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `PORT` | listen port when no address is given on the command line | `8000` |
//! | `BENDF_STACK_SIZE` | coroutine stack size in bytes | `0x10000` (64 KB) |
//! | `BENDF_MAX_BODY_BYTES` | request body cap, `0` disables it | `10485760` (10 MiB) |
//! | `BENDF_SCHEMA_CACHE` | `off` disables compiled-schema caching | on |
//! | `BENDF_DOCS_PATH` | path serving the JSON route catalog | unset (disabled) |
//!
//! Sizes accept decimal (`32768`) or hexadecimal (`0x8000`). Unparsable values fall back
//! to the default.
//!
//! ## Usage
//!
//! ```rust
//! use bendf::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```
//!
//! ## Stack size
//!
//! `may_minihttp` runs every connection in its own coroutine, and the whole request
//! pipeline (multipart decoding, schema validation, the handler) runs on that
//! coroutine's stack. Total virtual memory is roughly `stack_size × open connections`.
//! The binary applies `stack_size` with `may::config().set_stack_size` before starting
//! the server.

use std::env;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_STACK_SIZE: usize = 0x10000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub port: u16,
    /// Stack size for connection coroutines in bytes
    pub stack_size: usize,
    /// `None` means request bodies are not capped
    pub max_body_bytes: Option<usize>,
    pub schema_cache: bool,
    /// Route catalog path, e.g. `/docs`
    pub docs_path: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            stack_size: DEFAULT_STACK_SIZE,
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            schema_cache: true,
            docs_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(defaults.port);

        let stack_size = lookup("BENDF_STACK_SIZE")
            .and_then(|v| parse_size(&v))
            .unwrap_or(defaults.stack_size);

        let max_body_bytes = match lookup("BENDF_MAX_BODY_BYTES").and_then(|v| parse_size(&v)) {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.max_body_bytes,
        };

        let schema_cache = lookup("BENDF_SCHEMA_CACHE").map_or(true, |v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "off" | "false" | "0" | "no"
            )
        });

        let docs_path = lookup("BENDF_DOCS_PATH")
            .map(|v| v.trim().to_string())
            .filter(|p| p.starts_with('/'));

        RuntimeConfig {
            port,
            stack_size,
            max_body_bytes,
            schema_cache,
            docs_path,
        }
    }
}

/// Decimal or `0x`-prefixed hexadecimal byte count.
fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), RuntimeConfig::default());
        assert_eq!(RuntimeConfig::default().max_body_bytes, Some(10_485_760));
    }

    #[test]
    fn test_sizes_decimal_and_hex() {
        let c = config(&[
            ("BENDF_STACK_SIZE", "0x8000"),
            ("BENDF_MAX_BODY_BYTES", "1024"),
            ("PORT", "9000"),
        ]);
        assert_eq!(c.stack_size, 0x8000);
        assert_eq!(c.max_body_bytes, Some(1024));
        assert_eq!(c.port, 9000);
    }

    #[test]
    fn test_zero_body_cap_disables_it() {
        assert_eq!(config(&[("BENDF_MAX_BODY_BYTES", "0")]).max_body_bytes, None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let c = config(&[
            ("PORT", "not-a-port"),
            ("BENDF_STACK_SIZE", "0xZZ"),
            ("BENDF_DOCS_PATH", "docs"),
        ]);
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(c.docs_path, None);
    }

    #[test]
    fn test_schema_cache_and_docs() {
        let c = config(&[
            ("BENDF_SCHEMA_CACHE", "off"),
            ("BENDF_DOCS_PATH", "/docs"),
            ("PORT", "9090"),
        ]);
        assert!(!c.schema_cache);
        assert_eq!(c.docs_path.as_deref(), Some("/docs"));
        assert_eq!(c.port, 9090);
    }
}
