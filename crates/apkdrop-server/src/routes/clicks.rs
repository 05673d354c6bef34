use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use apkdrop_core::aggregate;
use apkdrop_core::store::EventStore;

use crate::state::AppState;

/// `GET /api/clicks` — the most recent download clicks with per-session
/// durations.
///
/// Always `200`; a failed read yields an empty list (same degrade contract
/// as the stats endpoint).
#[tracing::instrument(skip(state))]
pub async fn get_clicks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store: &dyn EventStore = state.db.as_ref();
    let details = aggregate::download_click_details(store).await;
    Json(json!({ "data": details }))
}
