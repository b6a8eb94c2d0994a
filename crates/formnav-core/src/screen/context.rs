use serde::{Deserialize, Serialize};

/// Per-request parameters for entity (case list) screens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScreenContext {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub sort_index: Option<i32>,
    #[serde(default)]
    pub case_id: Option<String>,
    /// Ids chosen on a multi-select screen, sent with the confirm token.
    #[serde(default)]
    pub selected_values: Option<Vec<String>>,
}

impl EntityScreenContext {
    pub fn with_selected_values(values: Vec<String>) -> Self {
        Self {
            selected_values: Some(values),
            ..Self::default()
        }
    }

    pub fn selected_values(&self) -> &[String] {
        self.selected_values.as_deref().unwrap_or(&[])
    }
}
