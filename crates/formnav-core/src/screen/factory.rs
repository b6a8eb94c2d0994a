use super::behavior::{MenuScreen, ScreenBehavior, ScreenResult};
use super::context::EntityScreenContext;
use super::{SharedEntityScreen, SharedMultiSelectScreen};
use crate::frame::EntityDatum;
use crate::instance::VirtualInstanceStorage;
use std::sync::Arc;

/// Constructs concrete screens for the resolver.
///
/// Screens come back uninitialised; the resolver calls `init` on them.
pub trait ScreenFactory: Send + Sync {
    fn menu(&self) -> Box<dyn MenuScreen>;

    fn entity(
        &self,
        datum: &EntityDatum,
        needs_full_entity_screen: bool,
        context: &EntityScreenContext,
    ) -> ScreenResult<SharedEntityScreen>;

    fn multi_select_entity(
        &self,
        datum: &EntityDatum,
        needs_full_entity_screen: bool,
        storage: Arc<dyn VirtualInstanceStorage>,
        context: &EntityScreenContext,
    ) -> ScreenResult<SharedMultiSelectScreen>;

    fn query(&self, storage: Arc<dyn VirtualInstanceStorage>) -> Box<dyn ScreenBehavior>;

    /// `as_user` is the fully-qualified username to sync as, if any.
    fn sync(&self, as_user: Option<String>) -> Box<dyn ScreenBehavior>;
}
