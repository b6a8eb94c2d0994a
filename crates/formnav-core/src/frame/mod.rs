//! Session frame protocol.
//!
//! The frame stack is an external stack machine that encodes pending commands
//! and data requirements. The navigation engine only talks to it through
//! [`SessionFrame`]; push/pop semantics of the underlying grammar stay on the
//! other side of this trait.
//!
//! # Module Structure
//!
//! - `datum`: Frame entries that need a value (`Datum`, `EntityDatum`, `ComputedDatum`)
//! - `kind`: What the frame currently requires (`NeededDataKind`)

mod datum;
mod kind;

pub use datum::{ComputedDatum, Datum, EntityDatum};
pub use kind::NeededDataKind;

use crate::error::Result;
use crate::expression::EvaluationContext;
use serde::{Deserialize, Serialize};

/// Identifier of a menu command (`m0`, `m1-f0`, ...).
pub type CommandId = String;

/// Key committed alongside the placeholder value once a form-id datum is resolved.
pub const FORM_ID_SENTINEL_KEY: &str = "";
/// Value committed for a resolved form-id datum; the real answer is the form namespace.
pub const FORM_ID_PLACEHOLDER: &str = "awful";

/// Where a computed value is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitTarget {
    /// The datum currently needed by the frame.
    Datum(Datum),
    /// A fixed key that does not correspond to a declared datum.
    Sentinel(&'static str),
}

/// Opaque, serializable image of a frame stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameSnapshot(pub serde_json::Value);

/// The query interface the engine needs from a frame stack.
pub trait SessionFrame {
    fn needed_data_kind(&self, context: &dyn EvaluationContext) -> NeededDataKind;

    /// The datum the frame is waiting on, if the current kind is datum-shaped.
    fn needed_datum(&self) -> Option<Datum>;

    fn current_command(&self) -> Option<CommandId>;

    /// True when the command only displays something and has no action attached.
    fn is_view_command(&self, command: &str) -> bool;

    fn step_back(&mut self);

    /// Pushes the command chosen on a menu.
    fn set_command(&mut self, command: CommandId);

    fn evaluation_context(&self) -> Box<dyn EvaluationContext + '_>;

    fn commit(&mut self, target: CommitTarget, value: String);

    fn set_target_form_namespace(&mut self, namespace: String);

    fn target_form_namespace(&self) -> Option<String>;

    /// Committed session data in commit order.
    fn session_data(&self) -> Vec<(String, String)>;

    fn snapshot(&self) -> FrameSnapshot;
}

/// Builds frames, either empty or from a persisted snapshot.
pub trait FrameFactory: Send + Sync {
    fn fresh(&self) -> Box<dyn SessionFrame>;

    fn restore(&self, snapshot: FrameSnapshot) -> Result<Box<dyn SessionFrame>>;
}
