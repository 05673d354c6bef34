use anyhow::Result;
use chrono::Utc;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

/// Failed-login window: 5 failures per 15 minutes per IP.
const LOGIN_WINDOW_MINUTES: i64 = 15;
const LOGIN_MAX_FAILURES: i64 = 5;

impl DuckDbBackend {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?
            .query_row(duckdb::params![key], |row| row.get::<_, String>(0))
            .ok();
        Ok(result)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            duckdb::params![key, value],
        )?;
        Ok(())
    }

    /// Ensure a JWT secret exists in settings. If not, generate one.
    /// Returns the JWT secret.
    pub async fn ensure_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = self.get_setting("jwt_secret").await? {
            return Ok(secret);
        }
        let secret = rand_hex(32);
        self.set_setting("jwt_secret", &secret).await?;
        Ok(secret)
    }

    /// Check if the admin password has been configured (for `local` mode).
    pub async fn is_admin_configured(&self) -> Result<bool> {
        let result = self.get_setting("admin_password_hash").await?;
        Ok(result.is_some())
    }

    /// Return `true` if `ip` is still within the failed-login budget.
    pub async fn check_login_rate_limit(&self, ip: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let cutoff = Utc::now() - chrono::Duration::minutes(LOGIN_WINDOW_MINUTES);
        let cutoff_str = cutoff.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string();
        let failures: i64 = conn
            .prepare(
                "SELECT COUNT(*) FROM login_attempts \
                 WHERE ip_address = ?1 AND attempted_at > ?2 AND succeeded = false",
            )?
            .query_row(duckdb::params![ip, cutoff_str], |row| row.get(0))?;
        Ok(failures < LOGIN_MAX_FAILURES)
    }

    /// Record a login attempt for brute-force accounting.
    pub async fn record_login_attempt(&self, ip: &str, succeeded: bool) -> Result<()> {
        let conn = self.conn.lock().await;
        let now_str = Utc::now()
            .naive_utc()
            .format("%Y-%m-%d %H:%M:%S%.f")
            .to_string();
        conn.execute(
            "INSERT INTO login_attempts (id, ip_address, attempted_at, succeeded) \
             VALUES (?1, ?2, ?3, ?4)",
            duckdb::params![rand_hex(8), ip, now_str, succeeded],
        )?;
        Ok(())
    }
}
