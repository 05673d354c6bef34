//! Analytics aggregation over the raw event table.
//!
//! Heartbeat rows are cumulative snapshots that may arrive out of order (the
//! periodic tick and the teardown beacon race freely), so the only correct
//! per-session duration is the maximum over all of a session's rows. Every
//! read in here degrades to empty/zero on failure: the dashboard shows "0",
//! it never errors.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::event::EventType;
use crate::store::{DurationSample, EventStore};

/// Click-details page size.
pub const CLICK_DETAILS_LIMIT: u32 = 100;

/// Trailing window for the average-session-duration stat, in days.
pub const AVG_DURATION_WINDOW_DAYS: i64 = 30;

/// Summary statistics for the admin dashboard.
///
/// Field casing matches the dashboard wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_visits: i64,
    pub download_clicks: i64,
    pub avg_duration_minutes: f64,
    pub today_visits: i64,
    pub today_clicks: i64,
}

/// One download click annotated with its session's duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadClickDetail {
    pub id: String,
    pub created_at: String,
    pub session_id: Option<String>,
    pub session_duration_minutes: f64,
}

/// Reduce heartbeat samples to the maximum duration per session.
///
/// Ordering-independent; non-positive samples are ignored, so a session whose
/// only rows are 0 s counts as having no recorded duration.
pub fn max_duration_by_session(samples: &[DurationSample]) -> HashMap<String, i64> {
    let mut max_by_session: HashMap<String, i64> = HashMap::new();
    for sample in samples {
        if sample.duration_seconds <= 0 {
            continue;
        }
        let entry = max_by_session.entry(sample.session_id.clone()).or_insert(0);
        if sample.duration_seconds > *entry {
            *entry = sample.duration_seconds;
        }
    }
    max_by_session
}

/// Convert seconds to minutes rounded to one decimal place.
pub fn minutes_rounded(seconds: i64) -> f64 {
    (seconds as f64 / 60.0 * 10.0).round() / 10.0
}

/// Midnight today in `tz`, expressed as a UTC instant.
///
/// Used as the lower bound for the "today" counters. Falls back to UTC
/// midnight if the local datetime is ambiguous (DST gap at 00:00).
pub fn local_midnight(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    local_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            Utc.from_utc_datetime(&now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default())
        })
}

/// The 100 most recent download clicks, each annotated with the associated
/// session's duration in minutes.
///
/// Two sequential reads: the click rows, then the duration rows for their
/// distinct session ids. A heartbeat inserted between the two reads may or
/// may not be reflected — analytics are eventually consistent.
pub async fn download_click_details(store: &dyn EventStore) -> Vec<DownloadClickDetail> {
    let clicks = match store.recent_download_clicks(CLICK_DETAILS_LIMIT).await {
        Ok(clicks) => clicks,
        Err(e) => {
            warn!(error = %e, "click details read failed, returning empty list");
            return Vec::new();
        }
    };
    if clicks.is_empty() {
        return Vec::new();
    }

    let session_ids: Vec<String> = clicks
        .iter()
        .filter_map(|c| c.session_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let samples = if session_ids.is_empty() {
        Vec::new()
    } else {
        match store.session_durations(&session_ids).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "session duration read failed, reporting 0 minutes");
                Vec::new()
            }
        }
    };
    let max_by_session = max_duration_by_session(&samples);

    clicks
        .into_iter()
        .map(|click| {
            let session_duration_minutes = click
                .session_id
                .as_deref()
                .and_then(|sid| max_by_session.get(sid))
                .map(|secs| minutes_rounded(*secs))
                .unwrap_or(0.0);
            DownloadClickDetail {
                id: click.id,
                created_at: click.created_at,
                session_id: click.session_id,
                session_duration_minutes,
            }
        })
        .collect()
}

/// Dashboard summary: all-time and today counts plus the trailing-30-day
/// average session duration.
///
/// Sessions with no positive duration rows are excluded from the average,
/// not counted as zero.
pub async fn analytics_stats(store: &dyn EventStore, tz: &Tz, now: DateTime<Utc>) -> AnalyticsStats {
    let today_start = local_midnight(now, tz);
    let window_start = now - chrono::Duration::days(AVG_DURATION_WINDOW_DAYS);

    let total_visits = count_or_zero(store, EventType::Visit, None).await;
    let download_clicks = count_or_zero(store, EventType::DownloadClick, None).await;
    let today_visits = count_or_zero(store, EventType::Visit, Some(today_start)).await;
    let today_clicks = count_or_zero(store, EventType::DownloadClick, Some(today_start)).await;

    let samples = match store.session_durations_since(window_start).await {
        Ok(samples) => samples,
        Err(e) => {
            warn!(error = %e, "session duration read failed, average reported as 0");
            Vec::new()
        }
    };
    let max_by_session = max_duration_by_session(&samples);
    let avg_duration_minutes = if max_by_session.is_empty() {
        0.0
    } else {
        let total: i64 = max_by_session.values().sum();
        let avg_seconds = total as f64 / max_by_session.len() as f64;
        (avg_seconds / 60.0 * 10.0).round() / 10.0
    };

    AnalyticsStats {
        total_visits,
        download_clicks,
        avg_duration_minutes,
        today_visits,
        today_clicks,
    }
}

async fn count_or_zero(
    store: &dyn EventStore,
    event_type: EventType,
    since: Option<DateTime<Utc>>,
) -> i64 {
    match store.count_events(event_type, since).await {
        Ok(count) => count,
        Err(e) => {
            warn!(event_type = %event_type, error = %e, "event count failed, reporting 0");
            0
        }
    }
}
