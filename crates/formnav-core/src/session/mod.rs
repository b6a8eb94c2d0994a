//! Session model.
//!
//! A session is split into an immutable [`SessionIdentity`], the mutable
//! [`SessionState`] the engine works on, and the [`MenuSession`] facade that
//! the request layer drives.
//!
//! # Module Structure
//!
//! - `identity`: Who is navigating which app (`SessionIdentity`, `NewSessionRequest`)
//! - `state`: Frame handle plus request-derived bookkeeping (`SessionState`)
//! - `history`: Breadcrumbs and selections (`NavigationHistory`)
//! - `entity_cache`: Per-request entity screen cache (`EntityScreenCache`)
//! - `record`: Persisted layout and storage ports (`SessionRecord`, `SessionRecordRepository`)
//! - `menu_session`: Request-facing facade (`MenuSession`)

mod entity_cache;
mod history;
mod identity;
mod menu_session;
mod record;
mod state;

pub use entity_cache::{EntityScreenCache, EntityScreenKey};
pub use history::NavigationHistory;
pub use identity::{
    NewSessionRequest, SessionIdentity, full_username, install_reference, scrub_username,
};
pub use menu_session::{FormEntryHandoff, MenuSession, SessionServices};
pub use record::{SessionRecord, SessionRecordRepository, SessionSerializer};
pub use state::{SessionState, TransientFlags};
