//! Configuration service.
//!
//! Loads [`NavigatorConfig`] from `~/.config/formnav/config.toml` (or an
//! explicit path) and caches it.

use crate::paths::FormnavPaths;
use crate::storage::AtomicTomlFile;
use formnav_core::config::NavigatorConfig;
use formnav_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Loads and caches the navigator configuration.
///
/// A missing or empty file yields the defaults; a present but invalid file is
/// an error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration, loaded lazily on first access.
    config: Arc<RwLock<Option<NavigatorConfig>>>,
}

impl ConfigService {
    /// Reads from the platform default location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolved path of the config file.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => FormnavPaths::config_file(),
        }
    }

    /// Returns the configuration, loading it on first use.
    pub fn get_config(&self) -> Result<NavigatorConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    /// Validates and writes `config`, then refreshes the cache.
    pub fn save_config(&self, config: &NavigatorConfig) -> Result<()> {
        config.validate()?;
        AtomicTomlFile::<NavigatorConfig>::new(self.config_path()?).save(config)?;
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(config.clone());
        Ok(())
    }

    fn load_config(&self) -> Result<NavigatorConfig> {
        let path = self.config_path()?;
        let config = match AtomicTomlFile::<NavigatorConfig>::new(path.clone()).load()? {
            Some(config) => config,
            None => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                NavigatorConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formnav_core::NavigationError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let config = service.get_config().unwrap();
        assert_eq!(config, NavigatorConfig::default());
        assert_eq!(config.lock.mask, 0xFFFF);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[lock]\nmask = 255\n\n[session]\nauto_advance_menus = false\n").unwrap();

        let config = ConfigService::with_path(path).get_config().unwrap();
        assert_eq!(config.lock.mask, 255);
        assert_eq!(config.lock.lock_duration_secs, 300);
        assert!(!config.session.auto_advance_menus);
        assert_eq!(config.session.username_suffix, "commcarehq.org");
    }

    #[test]
    fn test_invalid_mask_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[lock]\nmask = 1000\n").unwrap();

        let err = ConfigService::with_path(path).get_config().unwrap_err();
        assert!(matches!(err, NavigationError::Config(_)));
    }

    #[test]
    fn test_cache_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::with_path(path.clone());
        assert_eq!(service.get_config().unwrap().lock.mask, 0xFFFF);

        fs::write(&path, "[lock]\nmask = 15\n").unwrap();
        assert_eq!(service.get_config().unwrap().lock.mask, 0xFFFF);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().lock.mask, 15);
    }

    #[test]
    fn test_save_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::with_path(path.clone());

        let mut config = NavigatorConfig::default();
        config.session.host = "https://forms.example.org".to_string();
        service.save_config(&config).unwrap();

        let reloaded = ConfigService::with_path(path).get_config().unwrap();
        assert_eq!(reloaded.session.host, "https://forms.example.org");
    }
}
