use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of what the frame stack currently requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeededDataKind {
    /// Nothing pending: either a view command or ready for form entry.
    None,
    Command,
    EntitySelection,
    DatumComputed,
    QueryRequest,
    SyncRequest,
    /// Anything the engine does not recognise. Always a protocol error.
    Unknown(String),
}

impl fmt::Display for NeededDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeededDataKind::None => f.write_str("none"),
            NeededDataKind::Command => f.write_str("command-id"),
            NeededDataKind::EntitySelection => f.write_str("entity-selection"),
            NeededDataKind::DatumComputed => f.write_str("datum-computed"),
            NeededDataKind::QueryRequest => f.write_str("query-request"),
            NeededDataKind::SyncRequest => f.write_str("sync-request"),
            NeededDataKind::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}
