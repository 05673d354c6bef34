use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use serde_json::Value;

use apkdrop_core::config::{AuthMode, Config};
use apkdrop_duckdb::DuckDbBackend;
use apkdrop_server::app::build_app;
use apkdrop_server::state::AppState;

/// Build a test Config with sensible defaults for integration tests.
///
/// `data_dir` is per-test so upload suites don't trample each other.
pub fn test_config(data_dir: &str) -> Config {
    Config {
        port: 0,
        data_dir: data_dir.to_string(),
        public_url: "http://localhost:3000".to_string(),
        auth_mode: AuthMode::None,
        session_days: 7,
        timezone: "UTC".to_string(),
        cors_origins: vec![],
        max_upload_bytes: 10 * 1024 * 1024,
        buffer_flush_interval_ms: 5000,
        buffer_max_size: 100,
        duckdb_memory_limit: "1GB".to_string(),
        // Keep Argon2 cheap in tests; production default is 64MB.
        argon2_memory_kb: 8192,
        rate_limit_disable: true,
    }
}

/// Create a fresh in-memory backend + state + app for each test.
pub async fn setup_with(config: Config) -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, config));
    let app = build_app(Arc::clone(&state));
    (state, app)
}

pub async fn setup() -> (Arc<AppState>, axum::Router) {
    setup_with(test_config("/tmp/apkdrop-test")).await
}

/// Helper: extract the JSON body from a response.
pub async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}
