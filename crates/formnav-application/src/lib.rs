//! Application layer for FORMNAV.
//!
//! Request-level use cases that tie the navigation engine in `formnav-core`
//! to the locking and persistence in `formnav-infrastructure`.

pub mod logging;
pub mod navigation_usecase;
pub mod telemetry;

pub use navigation_usecase::{
    NavigationRequest, NavigationResponse, NavigationService, ScreenSummary, SessionTarget,
    advance_with_selections, settle_next_screen,
};
pub use telemetry::{NavigationEvent, NavigationEventLayer};
