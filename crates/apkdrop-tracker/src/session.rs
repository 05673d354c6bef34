use std::sync::Arc;

use crate::store::SessionStore;

const SESSION_ID_KEY: &str = "analytics_session_id";
const VISIT_TRACKED_KEY: &str = "visit_tracked";

/// Generate a session identifier: current millis plus a random suffix.
///
/// Uniqueness only needs to be good enough for analytics grouping, not
/// cryptographic.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("session_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Explicit tab-session state shared by the emitter and the heartbeat.
///
/// Initialized on first use and deliberately never torn down — it outlives
/// component unmounts within a tab. A fresh store (new tab, cleared storage)
/// yields a fresh session id and re-arms the visit guard.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The tab-session identifier, generated and persisted on first call.
    pub fn session_id(&self) -> String {
        if let Some(id) = self.store.get(SESSION_ID_KEY) {
            return id;
        }
        let id = generate_session_id();
        self.store.set(SESSION_ID_KEY, &id);
        id
    }

    /// Whether the one-per-tab `visit` event has already been sent.
    pub fn visit_already_tracked(&self) -> bool {
        self.store.get(VISIT_TRACKED_KEY).is_some()
    }

    pub fn mark_visit_tracked(&self) {
        self.store.set(VISIT_TRACKED_KEY, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn session_id_is_stable_within_one_context() {
        let ctx = SessionContext::new(Arc::new(MemoryStore::new()));
        let first = ctx.session_id();
        assert_eq!(ctx.session_id(), first);
        assert_eq!(ctx.session_id(), first);
    }

    #[test]
    fn session_id_has_expected_shape() {
        let ctx = SessionContext::new(Arc::new(MemoryStore::new()));
        let id = ctx.session_id();
        let mut parts = id.splitn(3, '_');
        assert_eq!(parts.next(), Some("session"));
        let millis = parts.next().unwrap_or_default();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        let suffix = parts.next().unwrap_or_default();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn cleared_store_yields_a_new_session() {
        let store = Arc::new(MemoryStore::new());
        let ctx = SessionContext::new(store.clone());
        let first = ctx.session_id();
        ctx.mark_visit_tracked();

        store.clear();
        let second = ctx.session_id();
        assert_ne!(first, second);
        assert!(!ctx.visit_already_tracked());
    }

    #[test]
    fn two_contexts_over_one_store_share_identity() {
        // Same tab, multiple mounts: the storage is the source of truth.
        let store = Arc::new(MemoryStore::new());
        let a = SessionContext::new(store.clone());
        let b = SessionContext::new(store);
        assert_eq!(a.session_id(), b.session_id());
    }
}
