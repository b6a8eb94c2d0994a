//! Error types for the navigation engine.

use thiserror::Error;

/// Suffix appended to every input-handling failure shown to the user.
pub const RELOAD_ADVICE: &str =
    "Please try reloading this application and if the problem persists please report a bug.";

/// A shared error type for the entire navigation workspace.
///
/// Resolution-level variants (`Protocol`, `Expression`) abort the request. Lock
/// related variants are surfaced to callers as retryable failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// The frame stack asked for something the engine does not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A computed datum carried an unparsable or failing expression.
    #[error("Expression error in '{expression}': {detail}")]
    Expression { expression: String, detail: String },

    /// A screen failed while applying input, typically against a stale session.
    #[error("Screen {screen} handling input {input} threw exception {detail}. {}", RELOAD_ADVICE)]
    InputHandling {
        screen: String,
        input: String,
        detail: String,
    },

    /// A screen reported a session-level failure.
    #[error("Screen error: {0}")]
    Screen(String),

    /// The per-session lock could not be acquired in time.
    #[error("Timed out after {waited_secs}s waiting for lock '{key}'")]
    LockTimeout { key: String, waited_secs: u64 },

    /// An expired lock owner did not exit within the grace period.
    #[error("Unable to evict owner {owner} of lock '{key}'")]
    EvictionFailed { key: String, owner: String },

    /// The current thread was asked to stop by the lock registry.
    #[error("Interrupted while holding lock")]
    Interrupted,

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NavigationError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn expression(expression: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
            detail: detail.into(),
        }
    }

    pub fn screen(message: impl Into<String>) -> Self {
        Self::Screen(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// True for failures a caller may retry with the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout { .. } | Self::EvictionFailed { .. } | Self::Interrupted
        )
    }

    /// True for failures that signal a broken engine or app definition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Expression { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for NavigationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for NavigationError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for NavigationError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

impl From<toml::ser::Error> for NavigationError {
    fn from(err: toml::ser::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

/// Conversion from anyhow::Error (used at collaborator boundaries)
impl From<anyhow::Error> for NavigationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, NavigationError>`.
pub type Result<T> = std::result::Result<T, NavigationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_handling_message_advises_reload() {
        let err = NavigationError::InputHandling {
            screen: "EntityScreen".to_string(),
            input: "3".to_string(),
            detail: "index 3 out of bounds".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Screen EntityScreen handling input 3"));
        assert!(message.ends_with(RELOAD_ADVICE));
    }

    #[test]
    fn test_classification() {
        assert!(NavigationError::protocol("x").is_fatal());
        assert!(NavigationError::expression("1 +", "syntax").is_fatal());
        assert!(!NavigationError::protocol("x").is_retryable());
        assert!(
            NavigationError::LockTimeout {
                key: "s".into(),
                waited_secs: 3
            }
            .is_retryable()
        );
        assert!(NavigationError::Interrupted.is_retryable());
        assert!(NavigationError::not_found("Session", "abc").is_not_found());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NavigationError = io.into();
        assert!(err.to_string().contains("NotFound"));
    }
}
