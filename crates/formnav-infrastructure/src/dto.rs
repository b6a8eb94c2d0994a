//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs are the on-disk schema. They are private to the
//! infrastructure layer and convert to and from the domain types in
//! `formnav_core`.
//!
//! ### SessionRecord Version History
//! - **1.0.0**: Identity fields plus the base64-encoded frame blob

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use formnav_core::error::{NavigationError, Result};
use formnav_core::session::{SessionIdentity, SessionRecord};
use serde::{Deserialize, Serialize};

/// Current schema version for session records.
pub const SESSION_RECORD_VERSION: &str = "1.0.0";

/// One persisted session, as written to `<sessions_dir>/<id>.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecordV1 {
    /// The schema version of this data structure.
    pub schema_version: String,
    /// When the record was written (RFC 3339).
    pub saved_at: String,
    pub id: String,
    pub username: String,
    pub domain: String,
    pub app_id: String,
    pub install_reference: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_user: Option<String>,
    #[serde(default)]
    pub preview: bool,
    /// Serialized frame, base64 (standard alphabet).
    pub frame: String,
}

impl SessionRecordV1 {
    pub fn from_domain(record: &SessionRecord, saved_at: DateTime<Utc>) -> Self {
        let identity = &record.identity;
        Self {
            schema_version: SESSION_RECORD_VERSION.to_string(),
            saved_at: saved_at.to_rfc3339(),
            id: identity.id.clone(),
            username: identity.username.clone(),
            domain: identity.domain.clone(),
            app_id: identity.app_id.clone(),
            install_reference: identity.install_reference.clone(),
            locale: identity.locale.clone(),
            as_user: identity.as_user.clone(),
            preview: identity.preview,
            frame: STANDARD.encode(&record.frame),
        }
    }

    /// # Errors
    ///
    /// Fails on an unknown major schema version or a malformed frame blob.
    pub fn into_domain(self) -> Result<SessionRecord> {
        let major = self.schema_version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(NavigationError::serialization(
                "TOML",
                format!(
                    "unsupported session record schema {} for {}",
                    self.schema_version, self.id
                ),
            ));
        }

        let frame = STANDARD.decode(self.frame.as_bytes()).map_err(|e| {
            NavigationError::serialization("base64", format!("frame of {}: {}", self.id, e))
        })?;

        Ok(SessionRecord {
            identity: SessionIdentity {
                id: self.id,
                username: self.username,
                domain: self.domain,
                app_id: self.app_id,
                install_reference: self.install_reference,
                locale: self.locale,
                as_user: self.as_user,
                preview: self.preview,
            },
            frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            identity: SessionIdentity {
                id: "0b5c6a52-9a43-4e9e-8f0e-3f2a4b1c7d10".to_string(),
                username: "worker".to_string(),
                domain: "demo".to_string(),
                app_id: "app-1".to_string(),
                install_reference: "http://localhost:8000/a/demo/apps/api/download_ccz/?app_id=app-1"
                    .to_string(),
                locale: "en".to_string(),
                as_user: None,
                preview: true,
            },
            frame: vec![0, 159, 146, 150, b'{', b'}'],
        }
    }

    #[test]
    fn test_binary_frame_survives_toml() {
        let dto = SessionRecordV1::from_domain(&record(), Utc::now());
        let text = toml::to_string_pretty(&dto).unwrap();
        assert!(!text.contains("as_user"));

        let parsed: SessionRecordV1 = toml::from_str(&text).unwrap();
        assert_eq!(parsed.into_domain().unwrap(), record());
    }

    #[test]
    fn test_rejects_future_major_version() {
        let mut dto = SessionRecordV1::from_domain(&record(), Utc::now());
        dto.schema_version = "2.0.0".to_string();
        assert!(matches!(
            dto.into_domain(),
            Err(NavigationError::Serialization { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_frame() {
        let mut dto = SessionRecordV1::from_domain(&record(), Utc::now());
        dto.frame = "not base64!".to_string();
        let err = dto.into_domain().unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
