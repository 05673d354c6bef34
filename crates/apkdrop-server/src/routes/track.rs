use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use apkdrop_core::event::{AnalyticsEvent, TrackPayload};

use crate::{error::AppError, state::AppState};

/// `POST /api/track` — ingest one analytics event.
///
/// ## Auth
/// None required: the landing page fires these anonymously. The teardown
/// beacon posts the same body to this same endpoint — whether the client
/// waits for the response is the client's business.
///
/// ## Rate limiting
/// 60 req/min per IP (sliding window in [`AppState`]).
///
/// ## Normalization
/// - `id` and `created_at` are server-assigned.
/// - `duration_seconds` is nulled for non-`session` events.
/// - `user_agent` falls back to the `User-Agent` header when the body omits it.
///
/// ## Response
/// `202 Accepted` with `{ "ok": true }` — the event sits in the in-memory
/// buffer until the next flush.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TrackPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client_ip = extract_client_ip(&headers);
    if !state.check_rate_limit(&client_ip).await {
        return Err(AppError::RateLimited {
            retry_after_seconds: None,
        });
    }

    let header_ua = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut payload = payload;
    if payload.user_agent.is_none() {
        payload.user_agent = header_ua;
    }

    let event = AnalyticsEvent::from_payload(payload, Utc::now());
    state.push_events(vec![event]).await;

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(json!({ "ok": true })),
    ))
}

/// Extract the real client IP from `X-Forwarded-For` (first entry).
///
/// Falls back to `"unknown"` when the header is absent — good enough for the
/// sliding-window limiter, which only needs a stable per-client key.
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
