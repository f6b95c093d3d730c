//! # Engine Configuration
//!
//! Every tunable of the engine lives in [`EngineConfig`]. All fields have defaults
//! matching the deployed display, so an empty TOML document is a valid config:
//!
//! ```toml
//! policy = "bounded"
//! capacity = 30
//! lock_timeout_ms = 1000
//! ```
//!
//! Unknown keys are rejected so that typos fail loudly at startup instead of
//! silently falling back to a default.

use crate::codec::{ITEM_NAME_CAP, MESSAGE_TEXT_CAP};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which queue policy drives the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// One order at a time is shown as "being prepared"; the rest wait in FIFO order.
    SingleFocus,
    /// Up to `capacity` orders are shown at once; the oldest is evicted on overflow.
    Bounded,
}

impl std::str::FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single_focus" | "single-focus" | "focus" => Ok(Self::SingleFocus),
            "bounded" | "multi" => Ok(Self::Bounded),
            other => Err(ConfigError::Invalid(format!("unknown queue policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub policy: PolicyKind,
    /// Live-order bound for the bounded policy.
    pub capacity: usize,
    /// Items beyond this count are dropped from the dish summary.
    pub max_items: usize,
    pub message_text_cap: usize,
    pub item_name_cap: usize,
    /// Inbound frames of this many bytes or more are rejected unparsed.
    pub max_message_len: usize,
    pub lock_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub lifecycle_popup_ms: u64,
    pub info_popup_ms: u64,
    /// Summary stored for an order that arrived without decodable items.
    pub empty_dishes_placeholder: String,
    pub time_key: String,
    /// A restored time further ahead of the device clock than this is discarded.
    pub restore_window_secs: i64,
    /// A saved time further ahead of the device clock than this is flagged.
    pub save_warn_window_secs: i64,
    /// Ingress channel depth.
    pub ingress_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::SingleFocus,
            capacity: 30,
            max_items: 20,
            message_text_cap: MESSAGE_TEXT_CAP,
            item_name_cap: ITEM_NAME_CAP,
            max_message_len: 1024,
            lock_timeout_ms: 1000,
            send_timeout_ms: 1000,
            lifecycle_popup_ms: 2000,
            info_popup_ms: 3000,
            empty_dishes_placeholder: "No items".to_string(),
            time_key: "system_time".to_string(),
            restore_window_secs: 24 * 60 * 60,
            save_warn_window_secs: 60 * 60,
            ingress_buffer: 32,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "reading config");
        Self::from_toml_str(&source)
    }

    /// Returns a copy using `policy`.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if self.max_items == 0 {
            return Err(ConfigError::Invalid("max_items must be at least 1".into()));
        }
        if self.message_text_cap == 0 || self.item_name_cap == 0 {
            return Err(ConfigError::Invalid("text caps must be non-zero".into()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid("lock_timeout_ms must be non-zero".into()));
        }
        if self.ingress_buffer == 0 {
            return Err(ConfigError::Invalid("ingress_buffer must be non-zero".into()));
        }
        if self.time_key.is_empty() {
            return Err(ConfigError::Invalid("time_key must not be empty".into()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn lifecycle_popup(&self) -> Duration {
        Duration::from_millis(self.lifecycle_popup_ms)
    }

    pub fn info_popup(&self) -> Duration {
        Duration::from_millis(self.info_popup_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.policy, PolicyKind::SingleFocus);
        assert_eq!(config.capacity, 30);
        assert_eq!(config.max_items, 20);
        assert_eq!(config.message_text_cap, 256);
        assert_eq!(config.item_name_cap, 128);
        assert_eq!(config.lock_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_toml_str(
            r#"
            policy = "bounded"
            capacity = 5
            empty_dishes_placeholder = "-"
            "#,
        )
        .unwrap();
        assert_eq!(config.policy, PolicyKind::Bounded);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.empty_dishes_placeholder, "-");
        assert_eq!(config.max_items, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("capacty = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = EngineConfig::from_toml_str("capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn policy_parses_from_env_style_strings() {
        assert_eq!("bounded".parse::<PolicyKind>().unwrap(), PolicyKind::Bounded);
        assert_eq!("single-focus".parse::<PolicyKind>().unwrap(), PolicyKind::SingleFocus);
        assert!("round_robin".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kds.toml");
        std::fs::write(&path, "policy = \"bounded\"\n").unwrap();
        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.policy, PolicyKind::Bounded);

        let missing = EngineConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
