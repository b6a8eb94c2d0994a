pub mod config;
pub mod lock_table;
pub mod session;

use anyhow::{Context, Result};
use formnav_core::config::NavigatorConfig;
use formnav_infrastructure::ConfigService;
use std::path::PathBuf;

/// Config plus the file it came from.
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: NavigatorConfig,
}

pub fn load_config(path: Option<PathBuf>) -> Result<LoadedConfig> {
    let service = match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let path = service.config_path()?;
    let config = service
        .get_config()
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(LoadedConfig { path, config })
}
