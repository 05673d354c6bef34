use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use apkdrop_duckdb::apk::NewApkFile;

use crate::{
    auth::middleware::AuthContext, error::AppError, state::AppState, storage::ApkStorage,
};

/// `GET /api/apks/active` — public: metadata of the APK currently offered on
/// the landing page, or `null` when none is activated.
#[tracing::instrument(skip(state))]
pub async fn get_active_apk(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let apk = state.db.active_apk().await.map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": apk })))
}

/// `GET /api/apks` — all uploaded APKs, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_apks(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let apks = state.db.list_apks().await.map_err(AppError::Internal)?;
    Ok(Json(json!({ "data": apks })))
}

/// `POST /api/apks` — multipart upload of a new APK.
///
/// Fields: `file` (the binary, name must end in `.apk`) and optional
/// `version`. The blob is stored as `{unix_millis}-{file_name}` so repeated
/// uploads of the same name never collide; the row starts inactive.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_apk(
    State(state): State<Arc<AppState>>,
    ctx: Option<Extension<AuthContext>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut version: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("version") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid version field: {e}")))?;
                let value = value.trim();
                if !value.is_empty() {
                    version = Some(value.to_string());
                }
            }
            Some("file") => {
                file_name = field.file_name().map(sanitize_file_name);
                file_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|_| AppError::PayloadTooLarge)?,
                );
            }
            _ => {}
        }
    }

    let (Some(file_name), Some(bytes)) = (file_name, file_bytes) else {
        return Err(AppError::BadRequest("missing file field".to_string()));
    };
    if !file_name.ends_with(".apk") {
        return Err(AppError::BadRequest(
            "only .apk files are accepted".to_string(),
        ));
    }

    let stored_name = format!("{}-{}", Utc::now().timestamp_millis(), file_name);
    state
        .apk_storage
        .save(&stored_name, &bytes)
        .await
        .map_err(AppError::Internal)?;

    let uploaded_by = ctx.map(|Extension(ctx)| ctx.subject);
    let apk = state
        .db
        .insert_apk(NewApkFile {
            file_name,
            file_url: state.apk_storage.url_for(&stored_name),
            file_size: bytes.len() as i64,
            version,
            uploaded_by,
        })
        .await;

    match apk {
        Ok(apk) => Ok((StatusCode::CREATED, Json(json!({ "data": apk })))),
        Err(e) => {
            // The row insert failed after the blob was written; remove the
            // orphan so retries don't accumulate files.
            if let Err(remove_err) = state.apk_storage.remove(&stored_name).await {
                warn!(error = %remove_err, stored_name, "failed to remove orphaned upload");
            }
            Err(AppError::Internal(e))
        }
    }
}

/// `POST /api/apks/{id}/activate` — make this APK the landing-page download.
///
/// Deactivates every other row in the same transaction (at most one active).
#[tracing::instrument(skip(state))]
pub async fn activate_apk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let found = state
        .db
        .set_active_apk(&id)
        .await
        .map_err(AppError::Internal)?;
    if !found {
        return Err(AppError::NotFound(format!("Unknown apk id: {id}")));
    }
    Ok(Json(json!({ "data": { "ok": true } })))
}

/// `DELETE /api/apks/{id}` — remove the row and (best-effort) the blob.
///
/// A missing blob only logs a warning: the row is the source of truth, and
/// the UI must see the delete succeed either way.
#[tracing::instrument(skip(state))]
pub async fn delete_apk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(apk) = state.db.get_apk(&id).await.map_err(AppError::Internal)? else {
        return Err(AppError::NotFound(format!("Unknown apk id: {id}")));
    };

    state
        .db
        .delete_apk(&id)
        .await
        .map_err(AppError::Internal)?;

    if let Some(stored_name) = ApkStorage::stored_name_from_url(&apk.file_url) {
        if let Err(e) = state.apk_storage.remove(stored_name).await {
            warn!(error = %e, stored_name, "failed to remove apk blob");
        }
    }

    Ok(Json(json!({ "data": { "ok": true } })))
}

/// Strip any path components from an uploaded file name.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string()
}
