use crate::frame::EntityDatum;
use crate::screen::Screen;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Cache key for a constructed entity screen.
///
/// The nodeset is hashed by its text, so semantically equal but textually
/// different nodesets land on different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityScreenKey {
    pub datum_id: String,
    pub nodeset_hash: String,
}

impl EntityScreenKey {
    pub fn for_datum(datum: &EntityDatum) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(datum.nodeset.as_bytes());
        Self {
            datum_id: datum.data_id.clone(),
            nodeset_hash: hex::encode(hasher.finalize()),
        }
    }
}

/// Entity screens built during one request.
///
/// Remote queries can re-enter an entity selection with the same datum id
/// inside one request; this keeps those resolutions idempotent. Entries are
/// never replaced or evicted, only dropped wholesale by [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct EntityScreenCache {
    screens: HashMap<EntityScreenKey, Screen>,
}

impl EntityScreenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Another handle to the cached screen, if present.
    pub fn get(&self, key: &EntityScreenKey) -> Option<Screen> {
        self.screens.get(key).and_then(Screen::share)
    }

    /// Stores a handle to `screen` unless the key is already taken.
    /// Returns false for non-entity screens or occupied keys.
    pub fn insert(&mut self, key: EntityScreenKey, screen: &Screen) -> bool {
        if self.screens.contains_key(&key) {
            return false;
        }
        match screen.share() {
            Some(handle) => {
                self.screens.insert(key, handle);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn clear(&mut self) {
        self.screens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEntityScreen;

    fn datum(id: &str, nodeset: &str) -> EntityDatum {
        EntityDatum {
            data_id: id.to_string(),
            nodeset: nodeset.to_string(),
        }
    }

    #[test]
    fn test_key_depends_on_nodeset_text() {
        let a = EntityScreenKey::for_datum(&datum("case_id", "instance('casedb')/casedb/case"));
        let b = EntityScreenKey::for_datum(&datum("case_id", "instance('casedb')/casedb/case"));
        let c = EntityScreenKey::for_datum(&datum("case_id", "instance( 'casedb')/casedb/case"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.nodeset_hash.len(), 64);
    }

    #[test]
    fn test_insert_keeps_first_entry() {
        let key = EntityScreenKey::for_datum(&datum("case_id", "nodeset"));
        let first = Screen::Entity(FakeEntityScreen::shared("first"));
        let second = Screen::Entity(FakeEntityScreen::shared("second"));

        let mut cache = EntityScreenCache::new();
        assert!(cache.insert(key.clone(), &first));
        assert!(!cache.insert(key.clone(), &second));

        let cached = cache.get(&key).unwrap();
        assert!(cached.same_instance(&first));
        assert!(!cached.same_instance(&second));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }
}
