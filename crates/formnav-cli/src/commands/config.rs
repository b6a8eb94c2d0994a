use super::LoadedConfig;
use anyhow::Result;

pub fn show(loaded: &LoadedConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(&loaded.config)?);
    Ok(())
}

pub fn path(loaded: &LoadedConfig) -> Result<()> {
    let state = if loaded.path.exists() { "" } else { " (missing, using defaults)" };
    println!("{}{}", loaded.path.display(), state);
    Ok(())
}
