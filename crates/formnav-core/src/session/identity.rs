//! Immutable identity of one navigation session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is navigating which app. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Username, scrubbed for use as a storage name
    pub username: String,
    pub domain: String,
    pub app_id: String,
    /// Where the app bundle is installed from
    pub install_reference: String,
    pub locale: String,
    /// User the session acts on behalf of, unqualified
    #[serde(default)]
    pub as_user: Option<String>,
    #[serde(default)]
    pub preview: bool,
}

/// Parameters for starting a brand new session.
#[derive(Debug, Clone, Default)]
pub struct NewSessionRequest {
    pub username: String,
    pub domain: String,
    pub app_id: String,
    pub locale: String,
    pub as_user: Option<String>,
    pub preview: bool,
}

impl SessionIdentity {
    /// Builds the identity of a fresh session with a generated id.
    pub fn create(request: NewSessionRequest, host: &str) -> Self {
        let install_reference = install_reference(host, &request.domain, &request.app_id);
        Self {
            id: Uuid::new_v4().to_string(),
            username: scrub_username(&request.username),
            domain: request.domain,
            app_id: request.app_id,
            install_reference,
            locale: request.locale,
            as_user: request.as_user,
            preview: request.preview,
        }
    }

    /// Fully-qualified "as user" name for sync requests.
    pub fn sync_as_user(&self, username_suffix: &str) -> Option<String> {
        self.as_user
            .as_deref()
            .map(|user| full_username(user, &self.domain, username_suffix))
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn scrub_username(username: &str) -> String {
    username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn install_reference(host: &str, domain: &str, app_id: &str) -> String {
    format!(
        "{}/a/{}/apps/api/download_ccz/?app_id={}",
        host.trim_end_matches('/'),
        domain,
        app_id
    )
}

/// `user@domain.suffix`, unless `user` is already qualified.
pub fn full_username(user: &str, domain: &str, suffix: &str) -> String {
    if user.contains('@') {
        user.to_string()
    } else {
        format!("{}@{}.{}", user, domain, suffix)
    }
}
