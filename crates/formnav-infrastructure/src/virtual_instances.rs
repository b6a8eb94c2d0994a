//! In-memory virtual instance storage.

use formnav_core::error::{NavigationError, Result};
use formnav_core::instance::{VirtualInstance, VirtualInstanceStorage};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Request-scoped storage for search inputs and selected entity sets.
#[derive(Debug, Default)]
pub struct MemoryVirtualInstanceStorage {
    instances: RwLock<HashMap<String, VirtualInstance>>,
}

impl MemoryVirtualInstanceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.instances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.instances.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VirtualInstanceStorage for MemoryVirtualInstanceStorage {
    fn write(&self, instance: VirtualInstance) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        self.instances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), instance);
        Ok(key)
    }

    fn write_with_key(&self, key: &str, instance: VirtualInstance) -> Result<String> {
        let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
        if instances.contains_key(key) {
            return Err(NavigationError::internal(format!(
                "Virtual instance with key '{}' already exists",
                key
            )));
        }
        instances.insert(key.to_string(), instance);
        Ok(key.to_string())
    }

    fn read(&self, key: &str) -> Option<VirtualInstance> {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn contains(&self, key: &str) -> bool {
        self.instances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}
