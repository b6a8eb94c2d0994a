use super::entity_cache::EntityScreenCache;
use super::history::NavigationHistory;
use crate::frame::SessionFrame;

/// Request-scoped flags that are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientFlags {
    pub current_browser_location: Option<String>,
    pub here_function_evaluated: bool,
    pub smart_link_redirect: Option<String>,
}

/// The mutable half of a session.
///
/// The frame is the only protocol state; everything else is derived from
/// the inputs applied during this request.
pub struct SessionState {
    pub frame: Box<dyn SessionFrame>,
    pub history: NavigationHistory,
    pub entity_cache: EntityScreenCache,
    pub flags: TransientFlags,
}

impl SessionState {
    pub fn new(frame: Box<dyn SessionFrame>, app_title: impl Into<String>) -> Self {
        Self {
            frame,
            history: NavigationHistory::seeded(app_title),
            entity_cache: EntityScreenCache::new(),
            flags: TransientFlags::default(),
        }
    }

    /// Swaps in a fresh frame and drops cache and history.
    pub fn reset(&mut self, frame: Box<dyn SessionFrame>, app_title: impl Into<String>) {
        self.frame = frame;
        self.entity_cache.clear();
        self.history.reset(app_title);
    }
}
