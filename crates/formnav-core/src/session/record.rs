//! Persisted session layout and the ports that read and write it.

use super::identity::SessionIdentity;
use crate::error::Result;
use crate::frame::SessionFrame;

/// Everything that survives between requests: identity plus the opaque frame blob.
///
/// Breadcrumbs, selections and the entity screen cache are rebuilt per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub identity: SessionIdentity,
    pub frame: Vec<u8>,
}

/// Turns frames into bytes and back.
///
/// Implementations must satisfy `serialize(restore(serialize(x))) == serialize(x)`.
pub trait SessionSerializer: Send + Sync {
    fn serialize(&self, frame: &dyn SessionFrame) -> Result<Vec<u8>>;

    fn restore(&self, bytes: &[u8]) -> Result<Box<dyn SessionFrame>>;
}

/// Storage for session records.
///
/// Called while the current thread holds the per-session lock.
pub trait SessionRecordRepository: Send + Sync {
    fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Succeeds when the record did not exist.
    fn delete(&self, session_id: &str) -> Result<()>;

    fn list_ids(&self) -> Result<Vec<String>>;
}
