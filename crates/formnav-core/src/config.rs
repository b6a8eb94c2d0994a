//! Configuration model shared by every layer.
//!
//! Loading lives in the infrastructure crate; this module only defines the
//! shape, the defaults and validation.

use crate::error::{NavigationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default lock table mask: 65536 buckets.
pub const DEFAULT_LOCK_MASK: u32 = 0xFFFF;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct NavigatorConfig {
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl NavigatorConfig {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_lock_mask(self.lock.mask)?;
        if self.lock.lock_duration_secs == 0 {
            return Err(NavigationError::config("lock.lock_duration_secs must be > 0"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LockConfig {
    /// Bucket mask, `2^n - 1`.
    #[serde(default = "default_mask")]
    pub mask: u32,
    /// Holding a lock longer than this makes it eligible for eviction.
    #[serde(default = "default_lock_duration_secs")]
    pub lock_duration_secs: u64,
    /// How long an interrupted owner gets to exit before eviction is reported as failed.
    #[serde(default = "default_eviction_grace_secs")]
    pub eviction_grace_secs: u64,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl LockConfig {
    pub fn lock_duration(&self) -> Duration {
        Duration::from_secs(self.lock_duration_secs)
    }

    pub fn eviction_grace(&self) -> Duration {
        Duration::from_secs(self.eviction_grace_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            mask: default_mask(),
            lock_duration_secs: default_lock_duration_secs(),
            eviction_grace_secs: default_eviction_grace_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Base URL used to derive install references.
    #[serde(default = "default_host")]
    pub host: String,
    /// Domain suffix of fully-qualified usernames.
    #[serde(default = "default_username_suffix")]
    pub username_suffix: String,
    #[serde(default = "default_true")]
    pub auto_advance_menus: bool,
    /// Overrides where session records are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username_suffix: default_username_suffix(),
            auto_advance_menus: true,
            storage_dir: None,
        }
    }
}

/// Rejects masks that are not of the form `2^n - 1` or need 32 bits or more.
pub fn validate_lock_mask(mask: u32) -> Result<()> {
    let bits = 32 - mask.leading_zeros();
    let is_low_ones = mask & mask.wrapping_add(1) == 0;
    if bits >= 32 || !is_low_ones {
        return Err(NavigationError::config(format!(
            "Mask must be a power of 2 - 1, got {:#x}",
            mask
        )));
    }
    Ok(())
}

fn default_mask() -> u32 {
    DEFAULT_LOCK_MASK
}

fn default_lock_duration_secs() -> u64 {
    300
}

fn default_eviction_grace_secs() -> u64 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "http://localhost:8000".to_string()
}

fn default_username_suffix() -> String {
    "commcarehq.org".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_validation() {
        assert!(validate_lock_mask(0).is_ok());
        assert!(validate_lock_mask(1).is_ok());
        assert!(validate_lock_mask(0xFFFF).is_ok());
        assert!(validate_lock_mask(0x7FFF_FFFF).is_ok());
        assert!(validate_lock_mask(0xFFFF_FFFF).is_err());
        assert!(validate_lock_mask(6).is_err());
        assert!(validate_lock_mask(0x10).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: NavigatorConfig = toml::from_str(
            r#"
[lock]
mask = 255

[session]
host = "https://example.org"
"#,
        )
        .unwrap();

        assert_eq!(config.lock.mask, 255);
        assert_eq!(config.lock.lock_duration_secs, 300);
        assert_eq!(config.session.host, "https://example.org");
        assert_eq!(config.session.username_suffix, "commcarehq.org");
        assert!(config.session.auto_advance_menus);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let mut config = NavigatorConfig::default();
        config.lock.lock_duration_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("lock_duration"));
    }
}
