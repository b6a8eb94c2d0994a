//! The navigation engine.
//!
//! Pure functions over [`SessionState`](crate::session::SessionState) and a set
//! of collaborators. Nothing in here persists anything or keeps state of its own.
//!
//! # Module Structure
//!
//! - `resolver`: Decides the next screen from the frame signal (`resolve`)
//! - `dispatcher`: Applies one input under the launch/select policy (`handle_input`)
//! - `datum`: Evaluates computed datums (`compute_datum`)

mod datum;
mod dispatcher;
mod resolver;

pub use datum::compute_datum;
pub use dispatcher::{InputOptions, handle_input};
pub use resolver::resolve;

use crate::error::NavigationError;
use crate::expression::ExpressionParser;
use crate::instance::VirtualInstanceStorage;
use crate::screen::{ScreenError, ScreenFactory};
use std::sync::Arc;

/// Collaborators the engine needs to build screens and evaluate datums.
#[derive(Clone)]
pub struct NavigationEnv {
    pub screens: Arc<dyn ScreenFactory>,
    pub expressions: Arc<dyn ExpressionParser>,
    pub instance_storage: Arc<dyn VirtualInstanceStorage>,
    /// Fully-qualified user that sync screens act as.
    pub sync_as_user: Option<String>,
}

/// Screen failures outside input handling are session errors.
pub(crate) fn screen_failure(err: ScreenError) -> NavigationError {
    NavigationError::screen(err.to_string())
}
