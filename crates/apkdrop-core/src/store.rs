//! Event store abstraction.

use chrono::{DateTime, Utc};

use crate::event::{AnalyticsEvent, EventType};

/// A `download_click` row as read back for the click-details view.
///
/// `created_at` is the store's string rendering of the timestamp; the
/// aggregator passes it through untouched.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub id: String,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// One `session` heartbeat row: a cumulative duration snapshot.
///
/// Rows with a NULL `duration_seconds` are filtered out at the store layer;
/// non-positive values survive to here and are ignored by the reduction.
#[derive(Debug, Clone)]
pub struct DurationSample {
    pub session_id: String,
    pub duration_seconds: i64,
}

/// Read/write surface of the append-only analytics event table.
///
/// Implemented by the DuckDB backend; aggregation logic depends only on this
/// trait so failure paths can be exercised with mock stores.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Append a batch of events. Called by the server's buffer-flush task.
    async fn insert_events(&self, events: &[AnalyticsEvent]) -> anyhow::Result<()>;

    /// Count events of one type, optionally restricted to `created_at >= since`.
    async fn count_events(
        &self,
        event_type: EventType,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<i64>;

    /// The most recent `download_click` events, newest first, at most `limit`.
    async fn recent_download_clicks(&self, limit: u32) -> anyhow::Result<Vec<ClickEvent>>;

    /// All `session` rows (with a recorded duration) for the given sessions.
    async fn session_durations(
        &self,
        session_ids: &[String],
    ) -> anyhow::Result<Vec<DurationSample>>;

    /// All `session` rows (with a recorded duration) created at or after `since`.
    async fn session_durations_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DurationSample>>;
}
