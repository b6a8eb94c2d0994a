//! Request-level navigation use case.
//!
//! One request locks its session id, rebuilds the `MenuSession` (or starts a
//! new one), replays the client's selections, lets single-choice menus advance
//! themselves, persists the frame and answers with a summary of where the
//! session now stands.

use anyhow::Context;
use formnav_core::config::NavigatorConfig;
use formnav_core::error::{NavigationError, Result};
use formnav_core::navigation::InputOptions;
use formnav_core::screen::{EntityScreenContext, Screen, USE_SELECTED_VALUES};
use formnav_core::session::{
    MenuSession, NewSessionRequest, SessionIdentity, SessionRecordRepository, SessionSerializer,
    SessionServices,
};
use formnav_infrastructure::LockRegistry;
use formnav_infrastructure::lock_registry::interruption;
use serde::Serialize;
use std::sync::Arc;

/// Where a request starts from.
#[derive(Debug, Clone)]
pub enum SessionTarget {
    /// Continue a persisted session.
    Existing(String),
    /// Start a fresh one.
    New(NewSessionRequest),
}

#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub target: SessionTarget,
    /// Inputs to apply in order, one per step.
    pub selections: Vec<String>,
    /// Entity ids picked on a multi-select screen.
    pub selected_values: Vec<String>,
    pub needs_full_entity_screen: bool,
    pub respect_relevancy: bool,
}

impl NavigationRequest {
    pub fn new(target: SessionTarget) -> Self {
        Self {
            target,
            selections: Vec::new(),
            selected_values: Vec::new(),
            needs_full_entity_screen: true,
            respect_relevancy: true,
        }
    }

    pub fn with_selections<I, S>(mut self, selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections = selections.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_selected_values(mut self, values: Vec<String>) -> Self {
        self.selected_values = values;
        self
    }

    fn options(&self) -> InputOptions {
        InputOptions {
            needs_full_entity_screen: self.needs_full_entity_screen,
            respect_relevancy: self.respect_relevancy,
            ..InputOptions::default()
        }
    }

    fn context(&self) -> EntityScreenContext {
        EntityScreenContext::with_selected_values(self.selected_values.clone())
    }
}

/// The screen a client should render next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenSummary {
    pub kind: String,
    pub name: String,
}

impl From<&Screen> for ScreenSummary {
    fn from(screen: &Screen) -> Self {
        Self {
            kind: screen.kind().to_string(),
            name: screen.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationResponse {
    pub session_id: String,
    pub app_title: String,
    pub breadcrumbs: Vec<String>,
    pub selections: Vec<String>,
    /// `None` once navigation is complete.
    pub screen: Option<ScreenSummary>,
    /// Namespace of the form to open when navigation is complete.
    pub form_xmlns: Option<String>,
    pub location_request_needed: bool,
}

/// Feeds each token to the session as one input step.
///
/// A token that advanced the session is recorded in its selections, except for
/// the "use selected values" sentinel, whose storage key is recorded by the
/// dispatcher instead. Stops early when navigation completes. Returns the number
/// of tokens applied.
///
/// # Errors
///
/// Propagates input failures, and `Interrupted` when the lock holding this
/// request was evicted.
pub fn advance_with_selections(
    session: &mut MenuSession,
    selections: &[String],
    options: InputOptions,
    context: &EntityScreenContext,
) -> Result<usize> {
    for (applied, token) in selections.iter().enumerate() {
        interruption::check_interrupted()?;
        if !session.handle_input(None, token, options, context)? {
            tracing::warn!(
                session_id = %session.id(),
                ignored = selections.len() - applied,
                "navigation completed before all selections were applied"
            );
            return Ok(applied);
        }
        if token != USE_SELECTED_VALUES {
            session.add_selection(token.clone());
        }
    }
    Ok(selections.len())
}

/// Resolves the next screen, letting single-choice menus advance themselves.
pub fn settle_next_screen(
    session: &mut MenuSession,
    auto_advance: bool,
    options: InputOptions,
    context: &EntityScreenContext,
) -> Result<Option<Screen>> {
    loop {
        interruption::check_interrupted()?;
        let Some(mut screen) = session.get_next_screen(options.needs_full_entity_screen, context)?
        else {
            return Ok(None);
        };
        if !session.auto_advance_menu(&mut screen, auto_advance, options.respect_relevancy)? {
            return Ok(Some(screen));
        }
        tracing::debug!(session_id = %session.id(), screen = %screen, "menu advanced itself");
    }
}

/// Drives navigation requests against persisted sessions.
///
/// # Thread Safety
///
/// A `MenuSession` never leaves the thread that built it. Concurrent requests
/// for the same session id serialize on the lock registry.
pub struct NavigationService {
    config: NavigatorConfig,
    services: SessionServices,
    serializer: Arc<dyn SessionSerializer>,
    repository: Arc<dyn SessionRecordRepository>,
    locks: Arc<LockRegistry>,
}

impl NavigationService {
    /// # Errors
    ///
    /// Fails if the lock settings in `config` are invalid.
    pub fn new(
        config: NavigatorConfig,
        services: SessionServices,
        serializer: Arc<dyn SessionSerializer>,
        repository: Arc<dyn SessionRecordRepository>,
    ) -> Result<Self> {
        config.validate()?;
        let locks = Arc::new(LockRegistry::new(&config.lock)?);
        Ok(Self {
            config,
            services,
            serializer,
            repository,
            locks,
        })
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Runs one request to completion on the calling thread.
    pub fn navigate(&self, request: NavigationRequest) -> Result<NavigationResponse> {
        let (session_id, fresh) = match &request.target {
            SessionTarget::Existing(id) => (id.clone(), None),
            SessionTarget::New(new_session) => {
                let identity =
                    SessionIdentity::create(new_session.clone(), &self.config.session.host);
                (identity.id.clone(), Some(identity))
            }
        };

        // Blocking-pool threads are reused; a stale flag belongs to an earlier request.
        interruption::clear_interrupted();
        let _guard = self
            .locks
            .acquire(&session_id, self.config.lock.acquire_timeout())?;

        let mut session = match fresh {
            Some(identity) => {
                tracing::info!(session_id = %identity.id, app_id = %identity.app_id, "starting session");
                MenuSession::new(identity, self.services.clone(), self.username_suffix())
            }
            None => self.load(&session_id)?,
        };

        let options = request.options();
        let context = request.context();
        advance_with_selections(&mut session, &request.selections, options, &context)?;
        let screen = settle_next_screen(
            &mut session,
            self.config.session.auto_advance_menus,
            options,
            &context,
        )?;

        self.repository
            .save(&session.serialize(self.serializer.as_ref())?)?;

        let form_xmlns = match screen {
            Some(_) => None,
            None => session.frame().target_form_namespace(),
        };
        Ok(NavigationResponse {
            session_id,
            app_title: session.app_title(),
            breadcrumbs: session.breadcrumbs().to_vec(),
            selections: session.selections().to_vec(),
            screen: screen.as_ref().map(ScreenSummary::from),
            form_xmlns,
            location_request_needed: session.location_request_needed(),
        })
    }

    /// Runs [`navigate`](Self::navigate) on the blocking pool.
    pub async fn navigate_async(
        self: &Arc<Self>,
        request: NavigationRequest,
    ) -> anyhow::Result<NavigationResponse> {
        let service = Arc::clone(self);
        let response = tokio::task::spawn_blocking(move || service.navigate(request))
            .await
            .context("navigation task panicked")??;
        Ok(response)
    }

    /// Drops a persisted session. Waits for any request still working on it.
    pub fn end_session(&self, session_id: &str) -> Result<()> {
        let _guard = self
            .locks
            .acquire(session_id, self.config.lock.acquire_timeout())?;
        self.repository.delete(session_id)?;
        tracing::info!(session_id, "session ended");
        Ok(())
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        self.repository.list_ids()
    }

    fn load(&self, session_id: &str) -> Result<MenuSession> {
        let record = self
            .repository
            .find_by_id(session_id)?
            .ok_or_else(|| NavigationError::not_found("session", session_id))?;
        MenuSession::restore(
            record,
            self.services.clone(),
            self.serializer.as_ref(),
            self.username_suffix(),
        )
    }

    fn username_suffix(&self) -> &str {
        &self.config.session.username_suffix
    }
}
