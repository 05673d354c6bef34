use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::emitter::Emitter;

/// Tick period matching the page tracker: one heartbeat every 30 seconds.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Periodic + teardown reporting of cumulative session duration.
///
/// Each tick re-sends the full elapsed time since start (a snapshot, not a
/// delta), so a dropped or late heartbeat is simply superseded by a later
/// one. The teardown beacon and the last tick may race and arrive out of
/// order; the aggregator's max-reduction absorbs that, and no sequencing is
/// attempted here.
pub struct Heartbeat {
    emitter: Arc<Emitter>,
    started: Instant,
    ticker: JoinHandle<()>,
    beacon_fired: AtomicBool,
}

impl Heartbeat {
    /// Start ticking. The first heartbeat fires one `period` after start.
    pub fn start(emitter: Arc<Emitter>, period: Duration) -> Self {
        let started = Instant::now();
        let ticker = tokio::spawn({
            let emitter = Arc::clone(&emitter);
            async move {
                let mut ticker = tokio::time::interval_at(started + period, period);
                loop {
                    let tick = ticker.tick().await;
                    let duration = (tick - started).as_secs() as i64;
                    // Ordinary emitter path: droppable, superseded by the
                    // next tick.
                    let _ = emitter.emit_session(duration);
                }
            }
        });
        Self {
            emitter,
            started,
            ticker,
            beacon_fired: AtomicBool::new(false),
        }
    }

    /// Cumulative whole seconds since the session started.
    pub fn elapsed_seconds(&self) -> i64 {
        self.started.elapsed().as_secs() as i64
    }

    /// Teardown trigger: report the final cumulative duration without
    /// waiting for delivery.
    ///
    /// Guaranteed attempt, zero guarantee of delivery — the handoff must not
    /// be upgraded to an awaited call, since the surrounding context is going
    /// away. Fires at most once; later calls are no-ops.
    pub fn beacon(&self) -> Option<JoinHandle<()>> {
        if self.beacon_fired.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.emitter.emit_session(self.elapsed_seconds()))
    }

    /// Cancel the periodic tick. No heartbeats are emitted afterwards.
    pub fn stop(&self) {
        self.ticker.abort();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::tests::{emitter_with, RecordingTransport};
    use crate::store::MemoryStore;
    use apkdrop_core::event::EventType;

    fn setup() -> (Arc<RecordingTransport>, Arc<Emitter>) {
        let transport = Arc::new(RecordingTransport::default());
        let emitter = Arc::new(emitter_with(
            Arc::clone(&transport),
            Arc::new(MemoryStore::new()),
        ));
        (transport, emitter)
    }

    /// Let spawned delivery tasks run to completion on the current-thread
    /// test runtime.
    async fn drain() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn durations(transport: &RecordingTransport) -> Vec<i64> {
        transport
            .sent
            .lock()
            .ok()
            .map(|sent| {
                sent.iter()
                    .filter(|p| p.event_type == EventType::Session)
                    .filter_map(|p| p.duration_seconds)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_resend_cumulative_durations() {
        let (transport, emitter) = setup();
        let hb = Heartbeat::start(emitter, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(30)).await;
        drain().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        drain().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        drain().await;

        // Snapshots, not deltas: 30, 60, 90.
        assert_eq!(durations(&transport), vec![30, 60, 90]);
        hb.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_before_first_period() {
        let (transport, emitter) = setup();
        let hb = Heartbeat::start(emitter, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(29)).await;
        drain().await;
        assert!(durations(&transport).is_empty());
        hb.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn beacon_fires_at_most_once() {
        let (transport, emitter) = setup();
        let hb = Heartbeat::start(emitter, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(45)).await;
        drain().await;

        let first = hb.beacon();
        assert!(first.is_some());
        if let Some(handle) = first {
            handle.await.ok();
        }
        assert!(hb.beacon().is_none());

        let reported = durations(&transport);
        // One 30 s tick plus one 45 s beacon.
        assert_eq!(reported, vec![30, 45]);
        hb.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_emitted_after_stop() {
        let (transport, emitter) = setup();
        let hb = Heartbeat::start(emitter, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(30)).await;
        drain().await;
        hb.stop();
        drain().await;

        tokio::time::advance(Duration::from_secs(120)).await;
        drain().await;

        assert_eq!(durations(&transport), vec![30]);
    }

    #[tokio::test(start_paused = true)]
    async fn beacon_and_tick_may_race_max_reduction_resolves() {
        // The aggregator side of this contract lives in apkdrop-core; here we
        // only assert both reports go out with cumulative values.
        let (transport, emitter) = setup();
        let hb = Heartbeat::start(emitter, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(30)).await;
        if let Some(handle) = hb.beacon() {
            handle.await.ok();
        }
        drain().await;

        let mut reported = durations(&transport);
        reported.sort_unstable();
        assert_eq!(reported, vec![30, 30]);
        hb.stop();
    }
}
