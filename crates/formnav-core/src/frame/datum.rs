use serde::{Deserialize, Serialize};

/// A frame entry that requires a value before the stack can progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Datum {
    /// Select exactly one entity from a nodeset.
    Entity(EntityDatum),
    /// Select any number of entities from a nodeset.
    MultiSelectEntity(EntityDatum),
    /// Computes which form to open.
    FormId(ComputedDatum),
    /// Computes a plain value.
    Computed(ComputedDatum),
}

impl Datum {
    pub fn data_id(&self) -> &str {
        match self {
            Datum::Entity(d) | Datum::MultiSelectEntity(d) => &d.data_id,
            Datum::FormId(d) | Datum::Computed(d) => &d.data_id,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityDatum> {
        match self {
            Datum::Entity(d) | Datum::MultiSelectEntity(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_computed(&self) -> Option<&ComputedDatum> {
        match self {
            Datum::FormId(d) | Datum::Computed(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_multi_select(&self) -> bool {
        matches!(self, Datum::MultiSelectEntity(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDatum {
    pub data_id: String,
    /// Nodeset expression text, as declared by the app.
    pub nodeset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedDatum {
    pub data_id: String,
    /// Value expression text.
    pub value: String,
}
