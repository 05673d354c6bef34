use anyhow::Result;
use chrono::{DateTime, Utc};

use apkdrop_core::event::{AnalyticsEvent, EventType};
use apkdrop_core::store::{ClickEvent, DurationSample, EventStore};

use crate::DuckDbBackend;

/// Timestamp rendering used for range comparisons against the TIMESTAMP
/// column. Inserts use RFC 3339; DuckDB casts both forms consistently.
fn ts_param(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

impl DuckDbBackend {
    /// Insert a batch of analytics events in a single transaction.
    ///
    /// Called by the buffer-flush background task. Returns immediately
    /// (no-op) if `events` is empty.
    pub async fn insert_analytics_events(&self, events: &[AnalyticsEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;

        // One transaction for the whole batch: atomicity and one fsync
        // instead of N.
        let tx = conn.transaction()?;
        for event in events {
            tx.execute(
                "INSERT INTO analytics (id, event_type, session_id, duration_seconds, user_agent, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                duckdb::params![
                    event.id,
                    event.event_type.as_str(),
                    event.session_id,
                    event.duration_seconds,
                    event.user_agent,
                    event.created_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        tracing::info!("Inserted {} analytics events into DuckDB", events.len());
        Ok(())
    }

    /// Count events of one type, optionally bounded below by `since`.
    pub async fn count_analytics_events(
        &self,
        event_type: EventType,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = match since {
            Some(since) => conn
                .prepare(
                    "SELECT COUNT(*) FROM analytics \
                     WHERE event_type = ?1 AND created_at >= ?2",
                )?
                .query_row(duckdb::params![event_type.as_str(), ts_param(since)], |row| {
                    row.get(0)
                })?,
            None => conn
                .prepare("SELECT COUNT(*) FROM analytics WHERE event_type = ?1")?
                .query_row(duckdb::params![event_type.as_str()], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// The most recent `download_click` rows, newest first.
    pub async fn recent_download_click_events(&self, limit: u32) -> Result<Vec<ClickEvent>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, CAST(created_at AS VARCHAR) \
             FROM analytics WHERE event_type = 'download_click' \
             ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(duckdb::params![limit as i64], |row| {
            Ok(ClickEvent {
                id: row.get(0)?,
                session_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut clicks = Vec::new();
        for row in rows {
            clicks.push(row?);
        }
        Ok(clicks)
    }

    /// All heartbeat rows with a recorded duration for the given sessions.
    ///
    /// Placeholders are generated per id — DuckDB has no array bind.
    pub async fn session_duration_rows(
        &self,
        session_ids: &[String],
    ) -> Result<Vec<DurationSample>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=session_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT session_id, duration_seconds FROM analytics \
             WHERE event_type = 'session' AND duration_seconds IS NOT NULL \
               AND session_id IN ({placeholders})"
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn duckdb::types::ToSql> = session_ids
            .iter()
            .map(|id| id as &dyn duckdb::types::ToSql)
            .collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok(DurationSample {
                session_id: row.get(0)?,
                duration_seconds: row.get(1)?,
            })
        })?;
        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }

    /// All heartbeat rows with a recorded duration created at or after `since`.
    pub async fn session_duration_rows_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DurationSample>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT session_id, duration_seconds FROM analytics \
             WHERE event_type = 'session' AND duration_seconds IS NOT NULL \
               AND session_id IS NOT NULL AND created_at >= ?1",
        )?;
        let rows = stmt.query_map(duckdb::params![ts_param(since)], |row| {
            Ok(DurationSample {
                session_id: row.get(0)?,
                duration_seconds: row.get(1)?,
            })
        })?;
        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }
}

#[async_trait::async_trait]
impl EventStore for DuckDbBackend {
    async fn insert_events(&self, events: &[AnalyticsEvent]) -> Result<()> {
        self.insert_analytics_events(events).await
    }

    async fn count_events(
        &self,
        event_type: EventType,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        self.count_analytics_events(event_type, since).await
    }

    async fn recent_download_clicks(&self, limit: u32) -> Result<Vec<ClickEvent>> {
        self.recent_download_click_events(limit).await
    }

    async fn session_durations(&self, session_ids: &[String]) -> Result<Vec<DurationSample>> {
        self.session_duration_rows(session_ids).await
    }

    async fn session_durations_since(&self, since: DateTime<Utc>) -> Result<Vec<DurationSample>> {
        self.session_duration_rows_since(since).await
    }
}
