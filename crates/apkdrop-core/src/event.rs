use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three event kinds the tracker emits.
///
/// Wire values are the lowercase snake_case strings stored in the
/// `analytics.event_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Visit,
    Session,
    DownloadClick,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Visit => "visit",
            EventType::Session => "session",
            EventType::DownloadClick => "download_click",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload the tracker sends to POST /api/track.
///
/// The beacon path on page teardown posts exactly this shape to the same
/// endpoint — there is no separate wire format for unload delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackPayload {
    pub event_type: EventType,
    pub session_id: Option<String>,
    /// Cumulative whole seconds since the session started. Only meaningful
    /// on `session` events; the server nulls it out everywhere else.
    pub duration_seconds: Option<i64>,
    pub user_agent: Option<String>,
}

/// The stored version of an event — mirrors the `analytics` table columns.
///
/// `id` and `created_at` are server-assigned at ingest time; rows are
/// immutable once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: String,
    pub event_type: EventType,
    pub session_id: Option<String>,
    pub duration_seconds: Option<i64>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Build a stored event from a wire payload, assigning id and timestamp.
    ///
    /// `duration_seconds` is normalized to `None` for non-session events:
    /// the column is only defined for heartbeat rows.
    pub fn from_payload(payload: TrackPayload, now: DateTime<Utc>) -> Self {
        let duration_seconds = match payload.event_type {
            EventType::Session => payload.duration_seconds,
            _ => None,
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: payload.event_type,
            session_id: payload.session_id,
            duration_seconds,
            user_agent: payload.user_agent,
            created_at: now,
        }
    }
}
