use anyhow::Result;
use serde::Serialize;

use crate::DuckDbBackend;

/// One uploaded APK release.
#[derive(Debug, Clone, Serialize)]
pub struct ApkFile {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub version: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub uploaded_by: Option<String>,
}

pub struct NewApkFile {
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub version: Option<String>,
    pub uploaded_by: Option<String>,
}

/// Generate an APK record ID: "apk_" + 10 random alphanumeric chars.
fn generate_apk_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("apk_{}", chars)
}

const APK_COLUMNS: &str = "id, file_name, file_url, file_size, version, is_active, \
                           CAST(created_at AS VARCHAR), uploaded_by";

fn row_to_apk(row: &duckdb::Row<'_>) -> duckdb::Result<ApkFile> {
    Ok(ApkFile {
        id: row.get(0)?,
        file_name: row.get(1)?,
        file_url: row.get(2)?,
        file_size: row.get(3)?,
        version: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        uploaded_by: row.get(7)?,
    })
}

impl DuckDbBackend {
    /// Insert a new (inactive) APK row and read it back with timestamps.
    pub async fn insert_apk(&self, params: NewApkFile) -> Result<ApkFile> {
        let conn = self.conn.lock().await;
        let id = generate_apk_id();

        conn.execute(
            "INSERT INTO apk_files (id, file_name, file_url, file_size, version, is_active, created_at, uploaded_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, false, CURRENT_TIMESTAMP, ?6)",
            duckdb::params![
                id,
                params.file_name,
                params.file_url,
                params.file_size,
                params.version,
                params.uploaded_by
            ],
        )?;

        let mut stmt =
            conn.prepare(&format!("SELECT {APK_COLUMNS} FROM apk_files WHERE id = ?1"))?;
        let apk = stmt.query_row(duckdb::params![id], |row| row_to_apk(row))?;
        Ok(apk)
    }

    /// All APK rows, newest first.
    pub async fn list_apks(&self) -> Result<Vec<ApkFile>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {APK_COLUMNS} FROM apk_files ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], |row| row_to_apk(row))?;
        let mut apks = Vec::new();
        for row in rows {
            apks.push(row?);
        }
        Ok(apks)
    }

    /// Look up one APK row by id.
    pub async fn get_apk(&self, id: &str) -> Result<Option<ApkFile>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare(&format!("SELECT {APK_COLUMNS} FROM apk_files WHERE id = ?1"))?;
        let apk = stmt.query_row(duckdb::params![id], |row| row_to_apk(row)).ok();
        Ok(apk)
    }

    /// The currently active APK, if any.
    pub async fn active_apk(&self) -> Result<Option<ApkFile>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {APK_COLUMNS} FROM apk_files WHERE is_active = true LIMIT 1"
        ))?;
        let apk = stmt.query_row([], |row| row_to_apk(row)).ok();
        Ok(apk)
    }

    /// Make `id` the single active APK.
    ///
    /// Deactivate-all then activate-one, in one transaction so there is never
    /// a window with two active rows. Returns `false` if `id` does not exist.
    pub async fn set_active_apk(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute_batch("UPDATE apk_files SET is_active = false")?;
        let changed = tx.execute(
            "UPDATE apk_files SET is_active = true WHERE id = ?1",
            duckdb::params![id],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Delete an APK row. Returns `false` if `id` does not exist.
    ///
    /// Blob removal is the caller's job — the row's `file_url` names the
    /// stored object.
    pub async fn delete_apk(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM apk_files WHERE id = ?1", duckdb::params![id])?;
        Ok(changed > 0)
    }
}
