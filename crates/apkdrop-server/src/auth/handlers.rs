use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use apkdrop_core::config::AuthMode;

use crate::{error::AppError, routes::track::extract_client_ip, state::AppState};

use super::jwt::{decode_jwt, encode_jwt};
use super::password::{hash_password, validate_password_strength, verify_password};
use super::SESSION_COOKIE;

const LOGIN_RATE_LIMIT_RETRY_AFTER_SECONDS: u64 = 15 * 60;

// ---------------------------------------------------------------------------
// GET /api/auth/status
// ---------------------------------------------------------------------------

/// `GET /api/auth/status` — Public, no auth required.
///
/// Flat response (no `{"data":...}` wrapper). Never returns 401.
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (mode_str, setup_required) = match &state.config.auth_mode {
        AuthMode::Password(_) => ("password", false),
        AuthMode::Local => {
            let configured = state
                .db
                .is_admin_configured()
                .await
                .map_err(AppError::Internal)?;
            ("local", !configured)
        }
        AuthMode::None => {
            // Not reachable when the router is set up correctly.
            return Err(AppError::NotFound("Not found".to_string()));
        }
    };

    let authenticated = is_cookie_authenticated(&state, &headers).await;

    Ok(Json(json!({
        "mode": mode_str,
        "setup_required": setup_required,
        "authenticated": authenticated,
    })))
}

async fn is_cookie_authenticated(state: &AppState, headers: &HeaderMap) -> bool {
    let token = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .find_map(|c| c.trim().strip_prefix(&format!("{SESSION_COOKIE}=")[..]))
                .map(|t| t.to_string())
        });
    let Some(token) = token else {
        return false;
    };
    let Ok(Some(secret)) = state.db.get_setting("jwt_secret").await else {
        return false;
    };
    decode_jwt(&token, &secret).is_ok()
}

// ---------------------------------------------------------------------------
// POST /api/auth/setup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub password: String,
}

/// `POST /api/auth/setup` — First-run setup (local mode only).
///
/// Returns 201 first time, 410 after setup is complete.
pub async fn auth_setup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetupRequest>,
) -> Result<impl IntoResponse, AppError> {
    match &state.config.auth_mode {
        AuthMode::Local => {}
        _ => {
            return Err(AppError::BadRequest(
                "setup only available in local mode".to_string(),
            ))
        }
    }

    let configured = state
        .db
        .is_admin_configured()
        .await
        .map_err(AppError::Internal)?;
    if configured {
        return Err(AppError::Gone);
    }

    validate_password_strength(&req.password).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let hash =
        hash_password(&req.password, state.config.argon2_memory_kb).map_err(AppError::Internal)?;

    state
        .db
        .set_setting("admin_password_hash", &hash)
        .await
        .map_err(AppError::Internal)?;

    Ok((StatusCode::CREATED, Json(json!({ "data": { "ok": true } }))))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// `POST /api/auth/login` — Login with the admin password.
///
/// Rate limited: 5 failed attempts per 15 min per IP. On success sets the
/// HttpOnly session cookie.
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client_ip = extract_client_ip(&headers);

    let allowed = state
        .db
        .check_login_rate_limit(&client_ip)
        .await
        .map_err(AppError::Internal)?;
    if !allowed {
        return Err(AppError::RateLimited {
            retry_after_seconds: Some(LOGIN_RATE_LIMIT_RETRY_AFTER_SECONDS),
        });
    }

    let valid = match &state.config.auth_mode {
        AuthMode::Password(pw) => req.password == *pw,
        AuthMode::Local => {
            let hash = state
                .db
                .get_setting("admin_password_hash")
                .await
                .map_err(AppError::Internal)?;
            match hash {
                Some(hash) => verify_password(&req.password, &hash),
                None => return Err(AppError::SetupRequired),
            }
        }
        AuthMode::None => {
            return Err(AppError::NotFound("Not found".to_string()));
        }
    };

    state
        .db
        .record_login_attempt(&client_ip, valid)
        .await
        .map_err(AppError::Internal)?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    let secret = state
        .db
        .ensure_jwt_secret()
        .await
        .map_err(AppError::Internal)?;
    let (token, expires_at) =
        encode_jwt(&secret, state.config.session_days).map_err(AppError::Internal)?;

    let max_age = u64::from(state.config.session_days) * 24 * 60 * 60;
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "data": { "ok": true, "expires_at": expires_at } })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/logout
// ---------------------------------------------------------------------------

/// `POST /api/auth/logout` — clear the session cookie.
pub async fn auth_logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "data": { "ok": true } })),
    )
}
