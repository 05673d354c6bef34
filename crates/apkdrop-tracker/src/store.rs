use std::collections::HashMap;
use std::sync::RwLock;

/// Tab-scoped key/value storage.
///
/// In a browser this is `sessionStorage`: values survive component teardown
/// within one tab but not a new tab. Embedders can provide their own
/// implementation; [`MemoryStore`] is the in-process default.
pub trait SessionStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    /// Drop everything — the "new tab" case.
    fn clear(&self);
}

/// In-process [`SessionStore`] backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.values.write() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut map) = self.values.write() {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.clear();
        assert_eq!(store.get("k"), None);
    }
}
