use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use apkdrop_core::event::{EventType, TrackPayload};

use crate::session::SessionContext;
use crate::transport::Transport;

/// Fire-and-forget analytics emission.
///
/// Every emit runs in a spawned task and swallows failures — telemetry must
/// never block or degrade the page it instruments. The returned join handles
/// exist so tests can await delivery; production callers drop them.
pub struct Emitter {
    transport: Arc<dyn Transport>,
    session: SessionContext,
    user_agent: String,
}

impl Emitter {
    pub fn new(transport: Arc<dyn Transport>, session: SessionContext, user_agent: &str) -> Self {
        Self {
            transport,
            session,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn payload(&self, event_type: EventType, duration_seconds: Option<i64>) -> TrackPayload {
        TrackPayload {
            event_type,
            session_id: Some(self.session.session_id()),
            duration_seconds,
            user_agent: Some(self.user_agent.clone()),
        }
    }

    /// Hand a payload to the transport without waiting for the outcome.
    fn emit(&self, event_type: EventType, duration_seconds: Option<i64>) -> JoinHandle<()> {
        let payload = self.payload(event_type, duration_seconds);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.deliver(payload).await {
                debug!(error = %e, "analytics delivery failed, dropping event");
            }
        })
    }

    /// Emit the one-per-tab `visit` event.
    ///
    /// Guarded by the session store flag: repeated calls within one tab
    /// session (remounts, re-renders) emit nothing and return `None`.
    pub fn track_visit(&self) -> Option<JoinHandle<()>> {
        if self.session.visit_already_tracked() {
            return None;
        }
        let handle = self.emit(EventType::Visit, None);
        self.session.mark_visit_tracked();
        Some(handle)
    }

    /// Emit a `download_click` event. Unbounded per session.
    pub fn track_download_click(&self) -> JoinHandle<()> {
        self.emit(EventType::DownloadClick, None)
    }

    /// Emit a `session` heartbeat carrying the cumulative duration.
    pub fn emit_session(&self, duration_seconds: i64) -> JoinHandle<()> {
        self.emit(EventType::Session, Some(duration_seconds))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    /// Transport that records payloads instead of sending them.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Mutex<Vec<TrackPayload>>,
        pub(crate) fail: bool,
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(&self, payload: TrackPayload) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("network down");
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(payload);
            }
            Ok(())
        }
    }

    pub(crate) fn emitter_with(
        transport: Arc<RecordingTransport>,
        store: Arc<MemoryStore>,
    ) -> Emitter {
        Emitter::new(
            transport,
            SessionContext::new(store),
            "Mozilla/5.0 Chrome/120",
        )
    }

    #[tokio::test]
    async fn visit_emitted_exactly_once_across_repeated_calls() {
        let transport = Arc::new(RecordingTransport::default());
        let emitter = emitter_with(Arc::clone(&transport), Arc::new(MemoryStore::new()));

        let first = emitter.track_visit();
        assert!(first.is_some());
        if let Some(handle) = first {
            handle.await.ok();
        }
        // Remounts within the same tab session must not re-emit.
        assert!(emitter.track_visit().is_none());
        assert!(emitter.track_visit().is_none());

        let sent = transport.sent.lock().ok().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_type, EventType::Visit);
        assert!(sent[0].session_id.is_some());
    }

    #[tokio::test]
    async fn visit_guard_survives_a_new_emitter_over_the_same_store() {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(MemoryStore::new());

        let first = emitter_with(Arc::clone(&transport), Arc::clone(&store));
        if let Some(handle) = first.track_visit() {
            handle.await.ok();
        }

        let second = emitter_with(Arc::clone(&transport), store);
        assert!(second.track_visit().is_none());
    }

    #[tokio::test]
    async fn click_events_are_unbounded() {
        let transport = Arc::new(RecordingTransport::default());
        let emitter = emitter_with(Arc::clone(&transport), Arc::new(MemoryStore::new()));

        emitter.track_download_click().await.ok();
        emitter.track_download_click().await.ok();

        let sent = transport.sent.lock().ok().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|p| p.event_type == EventType::DownloadClick));
        // Both clicks belong to the same tab session.
        assert_eq!(sent[0].session_id, sent[1].session_id);
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let emitter = emitter_with(Arc::clone(&transport), Arc::new(MemoryStore::new()));

        // The spawned task must complete cleanly despite the transport error.
        emitter.track_download_click().await.ok();
        emitter.emit_session(30).await.ok();
    }
}
