use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use apkdrop_core::config::AuthMode;

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Route groups:
/// - public: health, track ingestion, active-APK lookup, `/downloads` blobs,
///   and the auth endpoints (unless auth mode is `none`, in which case they
///   are not registered at all);
/// - admin: stats, click details, and APK management, behind the cookie-JWT
///   middleware.
///
/// Middleware is applied in outer-to-inner order:
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — permissive CORS: the landing page and the tracker run on
///    a different origin than this API.
pub fn build_app(state: Arc<AppState>) -> Router {
    let auth_state = Arc::clone(&state);
    let admin = Router::new()
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/clicks", get(routes::clicks::get_clicks))
        .route(
            "/api/apks",
            get(routes::apks::list_apks).post(routes::apks::upload_apk),
        )
        .route("/api/apks/{id}/activate", post(routes::apks::activate_apk))
        .route("/api/apks/{id}", delete(routes::apks::delete_apk))
        .layer(middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                let state = Arc::clone(&auth_state);
                async move { auth::middleware::require_auth(state, request, next).await }
            },
        ))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    let mut app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/track", post(routes::track::track))
        .route("/api/apks/active", get(routes::apks::get_active_apk))
        .merge(admin);

    if state.config.auth_mode != AuthMode::None {
        app = app
            .route("/api/auth/status", get(auth::handlers::auth_status))
            .route("/api/auth/setup", post(auth::handlers::auth_setup))
            .route("/api/auth/login", post(auth::handlers::auth_login))
            .route("/api/auth/logout", post(auth::handlers::auth_logout));
    }

    app.nest_service("/downloads", ServeDir::new(state.apk_storage.root()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
