use super::identity::SessionIdentity;
use super::record::{SessionRecord, SessionSerializer};
use super::state::SessionState;
use crate::app::{Endpoint, InstalledApp};
use crate::error::{NavigationError, Result};
use crate::expression::ExpressionParser;
use crate::frame::{FrameFactory, SessionFrame};
use crate::instance::VirtualInstanceStorage;
use crate::navigation::{self, InputOptions, NavigationEnv};
use crate::screen::{EntityScreenContext, Screen, ScreenFactory};
use std::sync::Arc;

/// External collaborators a session is built against.
#[derive(Clone)]
pub struct SessionServices {
    pub app: Arc<dyn InstalledApp>,
    pub frames: Arc<dyn FrameFactory>,
    pub screens: Arc<dyn ScreenFactory>,
    pub expressions: Arc<dyn ExpressionParser>,
    pub instance_storage: Arc<dyn VirtualInstanceStorage>,
}

/// What form entry needs once navigation is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEntryHandoff {
    /// Namespace of the form to open.
    pub xmlns: String,
    pub session_data: Vec<(String, String)>,
    pub identity: SessionIdentity,
    /// Serialized frame, so form entry can resume navigation after submission.
    pub frame: Vec<u8>,
}

/// One navigation session as seen by the request layer.
///
/// Built fresh per request, driven by a single thread, then serialized and
/// dropped. Not `Send`: entity screens are shared through `Rc`.
pub struct MenuSession {
    identity: SessionIdentity,
    state: SessionState,
    services: SessionServices,
    env: NavigationEnv,
}

impl MenuSession {
    /// Starts a session on an empty frame.
    ///
    /// Applies the identity's locale to the app and seeds the breadcrumb
    /// trail with the app title.
    pub fn new(identity: SessionIdentity, services: SessionServices, username_suffix: &str) -> Self {
        let frame = services.frames.fresh();
        Self::assemble(identity, frame, services, username_suffix)
    }

    /// Rebuilds a session from a persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame blob cannot be restored.
    pub fn restore(
        record: SessionRecord,
        services: SessionServices,
        serializer: &dyn SessionSerializer,
        username_suffix: &str,
    ) -> Result<Self> {
        let frame = serializer.restore(&record.frame)?;
        tracing::debug!(session_id = %record.identity.id, "restored session frame");
        Ok(Self::assemble(record.identity, frame, services, username_suffix))
    }

    fn assemble(
        identity: SessionIdentity,
        frame: Box<dyn SessionFrame>,
        services: SessionServices,
        username_suffix: &str,
    ) -> Self {
        services.app.set_locale(&identity.locale);
        let env = NavigationEnv {
            screens: services.screens.clone(),
            expressions: services.expressions.clone(),
            instance_storage: services.instance_storage.clone(),
            sync_as_user: identity.sync_as_user(username_suffix),
        };
        let state = SessionState::new(frame, services.app.title());
        Self {
            identity,
            state,
            services,
            env,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn frame(&self) -> &dyn SessionFrame {
        self.state.frame.as_ref()
    }

    /// See [`navigation::handle_input`].
    pub fn handle_input(
        &mut self,
        screen: Option<Screen>,
        input: &str,
        options: InputOptions,
        context: &EntityScreenContext,
    ) -> Result<bool> {
        navigation::handle_input(&mut self.state, &self.env, screen, input, options, context)
    }

    /// See [`navigation::resolve`].
    pub fn get_next_screen(
        &mut self,
        needs_full_entity_screen: bool,
        context: &EntityScreenContext,
    ) -> Result<Option<Screen>> {
        navigation::resolve(&mut self.state, &self.env, needs_full_entity_screen, context)
    }

    /// Lets a menu advance itself when it has a single navigable choice.
    ///
    /// Returns false for anything but menus, or when `enabled` is off.
    pub fn auto_advance_menu(
        &mut self,
        screen: &mut Screen,
        enabled: bool,
        respect_relevancy: bool,
    ) -> Result<bool> {
        if !enabled {
            return Ok(false);
        }
        screen
            .handle_auto_menu_advance(self.state.frame.as_mut(), respect_relevancy)
            .map_err(navigation::screen_failure)
    }

    /// Starts over on an empty frame, dropping cached screens and history.
    pub fn reset_session(&mut self) {
        tracing::debug!(session_id = %self.identity.id, "resetting session");
        let frame = self.services.frames.fresh();
        self.state.reset(frame, self.services.app.title());
    }

    pub fn serialize(&self, serializer: &dyn SessionSerializer) -> Result<SessionRecord> {
        Ok(SessionRecord {
            identity: self.identity.clone(),
            frame: serializer.serialize(self.state.frame.as_ref())?,
        })
    }

    pub fn breadcrumbs(&self) -> &[String] {
        self.state.history.breadcrumbs()
    }

    pub fn selections(&self) -> &[String] {
        self.state.history.selections()
    }

    pub fn add_selection(&mut self, selection: impl Into<String>) {
        self.state.history.add_selection(selection);
    }

    pub fn endpoint(&self, id: &str) -> Option<Endpoint> {
        self.services.app.endpoint(id)
    }

    pub fn app_version(&self) -> String {
        self.services.app.version()
    }

    pub fn app_title(&self) -> String {
        self.services.app.title()
    }

    /// Copy of the committed session data, in commit order.
    pub fn session_data(&self) -> Vec<(String, String)> {
        self.state.frame.session_data()
    }

    /// Packages everything form entry needs.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if navigation has not reached a form.
    pub fn form_entry_handoff(&self, serializer: &dyn SessionSerializer) -> Result<FormEntryHandoff> {
        let xmlns = self.state.frame.target_form_namespace().ok_or_else(|| {
            NavigationError::protocol(format!(
                "session {} has no target form to hand off",
                self.identity.id
            ))
        })?;
        Ok(FormEntryHandoff {
            xmlns,
            session_data: self.session_data(),
            identity: self.identity.clone(),
            frame: serializer.serialize(self.state.frame.as_ref())?,
        })
    }

    pub fn on_here_function_evaluated(&mut self) {
        self.state.flags.here_function_evaluated = true;
    }

    pub fn here_function_evaluated(&self) -> bool {
        self.state.flags.here_function_evaluated
    }

    /// True when an expression asked for the device location and the browser has not sent one.
    pub fn location_request_needed(&self) -> bool {
        self.state.flags.here_function_evaluated
            && self.state.flags.current_browser_location.is_none()
    }

    pub fn set_current_browser_location(&mut self, location: Option<String>) {
        self.state.flags.current_browser_location = location;
    }

    pub fn current_browser_location(&self) -> Option<&str> {
        self.state.flags.current_browser_location.as_deref()
    }

    pub fn set_smart_link_redirect(&mut self, url: Option<String>) {
        self.state.flags.smart_link_redirect = url;
    }

    pub fn smart_link_redirect(&self) -> Option<&str> {
        self.state.flags.smart_link_redirect.as_deref()
    }
}
