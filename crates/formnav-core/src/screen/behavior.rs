//! Behaviour contracts implemented by concrete screens.

use crate::frame::SessionFrame;
use std::fmt;
use thiserror::Error;

/// Failures raised by a screen while binding to or mutating the frame.
///
/// `IndexOutOfBounds` and `MissingValue` usually mean the client sent input
/// built against an older frame or app definition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreenError {
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("missing value: {0}")]
    MissingValue(String),

    #[error("{0}")]
    Session(String),
}

pub type ScreenResult<T> = std::result::Result<T, ScreenError>;

/// Lifecycle shared by every screen variant.
pub trait ScreenBehavior: fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> String;

    /// Binds the screen to the current frame state.
    fn init(&mut self, frame: &mut dyn SessionFrame) -> ScreenResult<()>;

    /// Set by `init` when the screen has nothing to ask the user.
    fn should_be_skipped(&self) -> bool {
        false
    }

    fn handle_input_and_update_session(
        &mut self,
        frame: &mut dyn SessionFrame,
        input: &str,
        allow_auto_launch: bool,
        selected_values: &[String],
        respect_relevancy: bool,
    ) -> ScreenResult<()>;

    /// Display string recorded after `input` was applied.
    fn breadcrumb(&self, input: &str, frame: &dyn SessionFrame) -> String;
}

pub trait MenuScreen: ScreenBehavior {
    /// Advances past the menu when exactly one choice is navigable.
    fn handle_auto_menu_advance(
        &mut self,
        frame: &mut dyn SessionFrame,
        respect_relevancy: bool,
    ) -> ScreenResult<bool>;
}

pub trait EntityScreen: ScreenBehavior {
    fn has_auto_launch_action(&self) -> bool;

    /// Selects entities without user input when the current state allows it.
    /// Returns true if the frame was advanced.
    fn auto_select_entities(&mut self, frame: &mut dyn SessionFrame) -> ScreenResult<bool>;

    /// Commits an already-validated selection without re-initialising.
    fn update_datum(&mut self, frame: &mut dyn SessionFrame, input: &str) -> ScreenResult<()>;
}

pub trait MultiSelectEntityScreen: EntityScreen {
    /// Key of the virtual instance holding the confirmed selection.
    fn storage_reference_id(&self) -> Option<String>;
}
