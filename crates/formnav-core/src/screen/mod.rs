//! Screens the user can be shown.
//!
//! A screen is constructed by the resolver, bound to the frame with `init`,
//! receives one input, mutates the frame and is then dropped. Entity screens
//! are the exception: they are shared handles so the per-session cache can
//! hand out the same instance again within one request.
//!
//! # Module Structure
//!
//! - `behavior`: Traits concrete screens implement (`ScreenBehavior`, `EntityScreen`, ...)
//! - `context`: Per-request entity screen parameters (`EntityScreenContext`)
//! - `factory`: Screen construction seam (`ScreenFactory`)

mod behavior;
mod context;
mod factory;

pub use behavior::{
    EntityScreen, MenuScreen, MultiSelectEntityScreen, ScreenBehavior, ScreenError, ScreenResult,
};
pub use context::EntityScreenContext;
pub use factory::ScreenFactory;

use crate::frame::SessionFrame;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Input prefix that triggers a case-list action.
pub const ACTION_PREFIX: &str = "action ";

/// Input token confirming the values currently selected on a multi-select screen.
pub const USE_SELECTED_VALUES: &str = "use_selected_values";

pub type SharedEntityScreen = Rc<RefCell<dyn EntityScreen>>;
pub type SharedMultiSelectScreen = Rc<RefCell<dyn MultiSelectEntityScreen>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Menu,
    Entity,
    MultiSelectEntity,
    Query,
    Sync,
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScreenKind::Menu => "MenuScreen",
            ScreenKind::Entity => "EntityScreen",
            ScreenKind::MultiSelectEntity => "MultiSelectEntityScreen",
            ScreenKind::Query => "QueryScreen",
            ScreenKind::Sync => "SyncScreen",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum Screen {
    Menu(Box<dyn MenuScreen>),
    Entity(SharedEntityScreen),
    MultiSelectEntity(SharedMultiSelectScreen),
    Query(Box<dyn ScreenBehavior>),
    Sync(Box<dyn ScreenBehavior>),
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Menu(_) => ScreenKind::Menu,
            Screen::Entity(_) => ScreenKind::Entity,
            Screen::MultiSelectEntity(_) => ScreenKind::MultiSelectEntity,
            Screen::Query(_) => ScreenKind::Query,
            Screen::Sync(_) => ScreenKind::Sync,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Screen::Entity(_) | Screen::MultiSelectEntity(_))
    }

    pub fn name(&self) -> String {
        match self {
            Screen::Menu(s) => s.name(),
            Screen::Entity(s) => s.borrow().name(),
            Screen::MultiSelectEntity(s) => s.borrow().name(),
            Screen::Query(s) | Screen::Sync(s) => s.name(),
        }
    }

    /// Another handle to the same entity screen; `None` for owned variants.
    pub fn share(&self) -> Option<Screen> {
        match self {
            Screen::Entity(s) => Some(Screen::Entity(Rc::clone(s))),
            Screen::MultiSelectEntity(s) => Some(Screen::MultiSelectEntity(Rc::clone(s))),
            _ => None,
        }
    }

    /// True when both handles point at the same entity screen instance.
    pub fn same_instance(&self, other: &Screen) -> bool {
        match (self, other) {
            (Screen::Entity(a), Screen::Entity(b)) => Rc::ptr_eq(a, b),
            (Screen::MultiSelectEntity(a), Screen::MultiSelectEntity(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn init(&mut self, frame: &mut dyn SessionFrame) -> ScreenResult<()> {
        match self {
            Screen::Menu(s) => s.init(frame),
            Screen::Entity(s) => s.borrow_mut().init(frame),
            Screen::MultiSelectEntity(s) => s.borrow_mut().init(frame),
            Screen::Query(s) | Screen::Sync(s) => s.init(frame),
        }
    }

    pub fn should_be_skipped(&self) -> bool {
        match self {
            Screen::Menu(s) => s.should_be_skipped(),
            Screen::Entity(s) => s.borrow().should_be_skipped(),
            Screen::MultiSelectEntity(s) => s.borrow().should_be_skipped(),
            Screen::Query(s) | Screen::Sync(s) => s.should_be_skipped(),
        }
    }

    pub fn handle_input_and_update_session(
        &mut self,
        frame: &mut dyn SessionFrame,
        input: &str,
        allow_auto_launch: bool,
        selected_values: &[String],
        respect_relevancy: bool,
    ) -> ScreenResult<()> {
        match self {
            Screen::Menu(s) => s.handle_input_and_update_session(
                frame,
                input,
                allow_auto_launch,
                selected_values,
                respect_relevancy,
            ),
            Screen::Entity(s) => s.borrow_mut().handle_input_and_update_session(
                frame,
                input,
                allow_auto_launch,
                selected_values,
                respect_relevancy,
            ),
            Screen::MultiSelectEntity(s) => s.borrow_mut().handle_input_and_update_session(
                frame,
                input,
                allow_auto_launch,
                selected_values,
                respect_relevancy,
            ),
            Screen::Query(s) | Screen::Sync(s) => s.handle_input_and_update_session(
                frame,
                input,
                allow_auto_launch,
                selected_values,
                respect_relevancy,
            ),
        }
    }

    pub fn breadcrumb(&self, input: &str, frame: &dyn SessionFrame) -> String {
        match self {
            Screen::Menu(s) => s.breadcrumb(input, frame),
            Screen::Entity(s) => s.borrow().breadcrumb(input, frame),
            Screen::MultiSelectEntity(s) => s.borrow().breadcrumb(input, frame),
            Screen::Query(s) | Screen::Sync(s) => s.breadcrumb(input, frame),
        }
    }

    /// `None` for screens that cannot auto-launch.
    pub fn has_auto_launch_action(&self) -> Option<bool> {
        match self {
            Screen::Entity(s) => Some(s.borrow().has_auto_launch_action()),
            Screen::MultiSelectEntity(s) => Some(s.borrow().has_auto_launch_action()),
            _ => None,
        }
    }

    /// Returns false for non-entity screens.
    pub fn auto_select_entities(&mut self, frame: &mut dyn SessionFrame) -> ScreenResult<bool> {
        match self {
            Screen::Entity(s) => s.borrow_mut().auto_select_entities(frame),
            Screen::MultiSelectEntity(s) => s.borrow_mut().auto_select_entities(frame),
            _ => Ok(false),
        }
    }

    /// Fast path for entity screens; other screens fall back to full handling.
    pub fn update_datum(&mut self, frame: &mut dyn SessionFrame, input: &str) -> ScreenResult<()> {
        match self {
            Screen::Entity(s) => s.borrow_mut().update_datum(frame, input),
            Screen::MultiSelectEntity(s) => s.borrow_mut().update_datum(frame, input),
            _ => self.handle_input_and_update_session(frame, input, false, &[], true),
        }
    }

    pub fn storage_reference_id(&self) -> Option<String> {
        match self {
            Screen::MultiSelectEntity(s) => s.borrow().storage_reference_id(),
            _ => None,
        }
    }

    pub fn handle_auto_menu_advance(
        &mut self,
        frame: &mut dyn SessionFrame,
        respect_relevancy: bool,
    ) -> ScreenResult<bool> {
        match self {
            Screen::Menu(s) => s.handle_auto_menu_advance(frame, respect_relevancy),
            _ => Ok(false),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind(), self.name())
    }
}
