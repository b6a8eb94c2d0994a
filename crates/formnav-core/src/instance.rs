//! Virtual data instances.
//!
//! Query and multi-select screens stash user-provided data (search inputs,
//! selected entity ids) in small virtual instances so later frames can refer
//! to them by an opaque storage key instead of re-sending the raw values.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub const SEARCH_INSTANCE_ROOT_NAME: &str = "input";
pub const SEARCH_INSTANCE_NODE_NAME: &str = "field";
pub const SEARCH_INPUT_NODE_NAME_ATTR: &str = "name";
pub const SELECTED_ENTITIES_ROOT_NAME: &str = "results";
pub const SELECTED_ENTITIES_NODE_NAME: &str = "value";

const SELECTED_ENTITIES_REFERENCE: &str = "jr://instance/selected-entities";
const SEARCH_INPUT_REFERENCE: &str = "jr://instance/search-input";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceNode {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualInstance {
    pub instance_id: String,
    pub reference: String,
    pub root_name: String,
    pub nodes: Vec<InstanceNode>,
}

impl VirtualInstance {
    /// One `<value>` node per selected entity id.
    pub fn selected_values(instance_id: &str, values: &[String]) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            reference: format!("{}/{}", SELECTED_ENTITIES_REFERENCE, instance_id),
            root_name: SELECTED_ENTITIES_ROOT_NAME.to_string(),
            nodes: values
                .iter()
                .map(|v| InstanceNode {
                    name: SELECTED_ENTITIES_NODE_NAME.to_string(),
                    attributes: Vec::new(),
                    text: v.clone(),
                })
                .collect(),
        }
    }

    /// One `<field name="...">` node per search prompt.
    pub fn search_input(ref_id: &str, inputs: &[(String, String)]) -> Self {
        Self {
            instance_id: format!("search-input:{}", ref_id),
            reference: format!("{}/{}", SEARCH_INPUT_REFERENCE, ref_id),
            root_name: SEARCH_INSTANCE_ROOT_NAME.to_string(),
            nodes: inputs
                .iter()
                .map(|(key, value)| InstanceNode {
                    name: SEARCH_INSTANCE_NODE_NAME.to_string(),
                    attributes: vec![(SEARCH_INPUT_NODE_NAME_ATTR.to_string(), key.clone())],
                    text: value.clone(),
                })
                .collect(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.text.as_str()).collect()
    }
}

/// Storage for virtual instances, shared across screens of one request.
pub trait VirtualInstanceStorage: Send + Sync {
    /// Stores under a freshly generated key and returns it.
    fn write(&self, instance: VirtualInstance) -> Result<String>;

    /// Stores under the given key. Fails if the key is already taken.
    fn write_with_key(&self, key: &str, instance: VirtualInstance) -> Result<String>;

    fn read(&self, key: &str) -> Option<VirtualInstance>;

    fn contains(&self, key: &str) -> bool;
}

/// Builds the selected-entities instance and stores it, returning the storage key.
pub fn store_selected_values(
    storage: &dyn VirtualInstanceStorage,
    values: &[String],
    instance_id: &str,
) -> Result<String> {
    storage.write(VirtualInstance::selected_values(instance_id, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_values_instance_shape() {
        let instance =
            VirtualInstance::selected_values("selected_cases", &["a".into(), "b".into()]);
        assert_eq!(instance.root_name, "results");
        assert_eq!(instance.reference, "jr://instance/selected-entities/selected_cases");
        assert_eq!(instance.texts(), vec!["a", "b"]);
        assert!(instance.nodes.iter().all(|n| n.name == "value"));
    }

    #[test]
    fn test_search_input_instance_carries_names() {
        let instance = VirtualInstance::search_input(
            "results",
            &[("name".into(), "Ada".into()), ("age".into(), "36".into())],
        );
        assert_eq!(instance.instance_id, "search-input:results");
        assert_eq!(
            instance.nodes[1].attributes,
            vec![("name".to_string(), "age".to_string())]
        );
        assert_eq!(instance.nodes[1].text, "36");
    }
}
