use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use apkdrop_core::aggregate;
use apkdrop_core::store::EventStore;

use crate::state::AppState;

/// `GET /api/stats` — dashboard summary statistics.
///
/// Always `200`: aggregation-read failures degrade to zeros inside the
/// aggregator, the dashboard renders "0" rather than an error state.
#[tracing::instrument(skip(state))]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tz = state.config.reporting_timezone();
    let store: &dyn EventStore = state.db.as_ref();
    let stats = aggregate::analytics_stats(store, &tz, Utc::now()).await;
    Json(json!({ "data": stats }))
}
