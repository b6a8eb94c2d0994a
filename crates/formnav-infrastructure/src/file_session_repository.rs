//! TOML file-backed `SessionRecordRepository`.

use crate::dto::SessionRecordV1;
use crate::storage::AtomicTomlFile;
use chrono::Utc;
use formnav_core::error::{NavigationError, Result};
use formnav_core::session::{SessionRecord, SessionRecordRepository};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each session record as its own TOML file.
///
/// ```text
/// sessions_dir/
/// ├── <session-id-1>.toml
/// └── <session-id-2>.toml
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    sessions_dir: PathBuf,
}

impl FileSessionRepository {
    /// Creates the directory if needed.
    pub fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn record_file(&self, session_id: &str) -> Result<AtomicTomlFile<SessionRecordV1>> {
        // Ids become file names.
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(NavigationError::internal(format!(
                "invalid session id '{}'",
                session_id
            )));
        }
        Ok(AtomicTomlFile::new(
            self.sessions_dir.join(format!("{}.toml", session_id)),
        ))
    }
}

impl SessionRecordRepository for FileSessionRepository {
    fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        match self.record_file(session_id)?.load()? {
            Some(dto) => dto.into_domain().map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let dto = SessionRecordV1::from_domain(record, Utc::now());
        self.record_file(&record.identity.id)?.save(&dto)?;
        tracing::debug!(session_id = %record.identity.id, bytes = record.frame.len(), "saved session record");
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        if self.record_file(session_id)?.remove()? {
            tracing::debug!(session_id, "deleted session record");
        }
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.sessions_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
