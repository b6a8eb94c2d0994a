use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use formnav_core::config::NavigatorConfig;
use formnav_core::session::SessionRecordRepository;
use formnav_infrastructure::dto::SessionRecordV1;
use formnav_infrastructure::storage::AtomicTomlFile;
use formnav_infrastructure::{FileSessionRepository, FormnavPaths};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub fn list(config: &NavigatorConfig) -> Result<()> {
    let dir = FormnavPaths::sessions_dir(config)?;
    if !dir.exists() {
        println!("No sessions in {}", dir.display());
        return Ok(());
    }
    let ids = FileSessionRepository::new(&dir)?.list_ids()?;
    println!("{} session(s) in {}", ids.len(), dir.display());
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

pub fn inspect(config: &NavigatorConfig, target: &str) -> Result<()> {
    let path = record_path(config, target)?;
    let Some(dto) = AtomicTomlFile::<SessionRecordV1>::new(path.clone()).load()? else {
        bail!("No session record at {}", path.display());
    };

    println!("Record:   {}", path.display());
    println!("Schema:   {}", dto.schema_version);
    println!("Saved at: {}", dto.saved_at);
    let record = dto
        .into_domain()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let identity = &record.identity;
    println!("Id:       {}", identity.id);
    println!("User:     {}@{}", identity.username, identity.domain);
    if let Some(as_user) = &identity.as_user {
        println!("As user:  {}", as_user);
    }
    println!("App:      {} ({})", identity.app_id, identity.install_reference);
    println!("Locale:   {}", identity.locale);
    println!("Preview:  {}", identity.preview);
    println!("Frame:    {} bytes", record.frame.len());
    println!();
    println!("{}", describe_frame(&record.frame));
    Ok(())
}

/// A file path if `target` names an existing file, else the record file of that id.
fn record_path(config: &NavigatorConfig, target: &str) -> Result<PathBuf> {
    let candidate = Path::new(target);
    if candidate.is_file() {
        return Ok(candidate.to_path_buf());
    }
    Ok(FormnavPaths::sessions_dir(config)?.join(format!("{}.toml", target)))
}

/// Pretty JSON when the frame is JSON, else base64.
fn describe_frame(frame: &[u8]) -> String {
    match serde_json::from_slice::<Value>(frame) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string()),
        Err(_) => STANDARD.encode(frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_frame_is_pretty_printed() {
        let text = describe_frame(br#"{"version":1,"frame":{"cursor":2}}"#);
        assert!(text.contains("\"cursor\": 2"));
    }

    #[test]
    fn test_binary_frame_falls_back_to_base64() {
        let frame = [0u8, 159, 146, 150];
        assert_eq!(describe_frame(&frame), "AJ+Slg==");
    }

    #[test]
    fn test_id_resolves_under_sessions_dir() {
        let mut config = NavigatorConfig::default();
        config.session.storage_dir = Some(PathBuf::from("/var/lib/formnav"));
        assert_eq!(
            record_path(&config, "s-1").unwrap(),
            PathBuf::from("/var/lib/formnav/s-1.toml")
        );
    }
}
