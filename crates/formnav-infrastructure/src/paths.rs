//! Path resolution for formnav files.
//!
//! ```text
//! ~/.config/formnav/           # Config directory
//! ├── config.toml              # NavigatorConfig
//! └── sessions/                # One TOML record per session id (default)
//! ```

use formnav_core::error::{NavigationError, Result};
use formnav_core::config::NavigatorConfig;
use std::path::PathBuf;

const APP_DIR: &str = "formnav";

pub struct FormnavPaths;

impl FormnavPaths {
    /// Platform config directory joined with `formnav`.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| NavigationError::config("cannot determine the config directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Where session records live: the configured override, else `<config_dir>/sessions`.
    pub fn sessions_dir(config: &NavigatorConfig) -> Result<PathBuf> {
        match &config.session.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("sessions")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_override_wins() {
        let mut config = NavigatorConfig::default();
        config.session.storage_dir = Some(PathBuf::from("/var/lib/formnav"));
        assert_eq!(
            FormnavPaths::sessions_dir(&config).unwrap(),
            PathBuf::from("/var/lib/formnav")
        );
    }

    #[test]
    fn test_config_file_is_under_app_dir() {
        if let Ok(path) = FormnavPaths::config_file() {
            assert!(path.ends_with("formnav/config.toml"));
        }
    }
}
