use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use apkdrop_core::config::AuthMode;

use crate::state::AppState;

use super::jwt::decode_jwt;
use super::SESSION_COOKIE;

/// Auth context injected into request extensions after successful auth.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Stable identifier of the authenticated operator.
    pub subject: String,
}

/// Require an admin session cookie on the wrapped routes.
///
/// In `none` auth mode everything passes with a synthetic context; in `local`
/// mode requests are rejected with `setup_required` until the admin password
/// has been configured.
pub async fn require_auth(state: Arc<AppState>, mut request: Request, next: Next) -> Response {
    if let AuthMode::None = &state.config.auth_mode {
        request.extensions_mut().insert(AuthContext {
            subject: "admin".to_string(),
        });
        return next.run(request).await;
    }

    // Check if setup is required in local mode.
    if let AuthMode::Local = &state.config.auth_mode {
        match state.db.is_admin_configured().await {
            Ok(false) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "error": {
                            "code": "setup_required",
                            "message": "Admin setup required. POST /api/auth/setup first.",
                            "field": null
                        }
                    })),
                )
                    .into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to check admin configured");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            _ => {}
        }
    }

    // Extract the cookie token synchronously to avoid holding &Request across
    // an await.
    let cookie_token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .find_map(|c| c.trim().strip_prefix(&format!("{SESSION_COOKIE}=")[..]))
                .map(|t| t.to_string())
        });

    if let Some(token) = cookie_token {
        if let Some(ctx) = validate_cookie_jwt(&state, &token).await {
            request.extensions_mut().insert(ctx);
            return next.run(request).await;
        }
    }

    unauthorized_response()
}

async fn validate_cookie_jwt(state: &AppState, token: &str) -> Option<AuthContext> {
    let jwt_secret = state.db.get_setting("jwt_secret").await.ok()??;
    let claims = decode_jwt(token, &jwt_secret).ok()?;

    Some(AuthContext {
        subject: claims.sub,
    })
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": "unauthorized",
                "message": "Not authenticated",
                "field": null
            }
        })),
    )
        .into_response()
}
