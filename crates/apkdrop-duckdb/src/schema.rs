/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `APKDROP_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit — the DuckDB default (80% of system RAM) is not acceptable for a
/// server process. `SET threads = 2` caps the background pool for
/// single-writer embedded use.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret'           – 32-byte random hex signing admin session cookies
--   'admin_password_hash'  – Argon2id hash, absent until first-run setup (local auth mode)
--   'version'              – Database schema version (for migrations)
--   'install_id'           – Unique installation identifier
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- ANALYTICS EVENTS (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS analytics (
    id               VARCHAR NOT NULL,             -- UUID v4, server-assigned
    event_type       VARCHAR NOT NULL,             -- 'visit' | 'session' | 'download_click'
    session_id       VARCHAR,                      -- client-generated tab-session id
    duration_seconds BIGINT,                       -- cumulative snapshot; session events only
    user_agent       VARCHAR,
    created_at       TIMESTAMP NOT NULL
);

-- Primary query pattern: per-type counts within a date range
CREATE INDEX IF NOT EXISTS idx_analytics_type_time
    ON analytics(event_type, created_at DESC);

-- Accelerates duration lookups for the click-details view
CREATE INDEX IF NOT EXISTS idx_analytics_session
    ON analytics(session_id, event_type);

-- ===========================================
-- APK FILES (release management)
-- ===========================================
-- At most one row has is_active = true; the activate operation swaps the
-- flag in a single transaction.
CREATE TABLE IF NOT EXISTS apk_files (
    id              VARCHAR PRIMARY KEY,           -- 'apk_' + 10 random alphanumerics
    file_name       VARCHAR NOT NULL,              -- original upload name
    file_url        VARCHAR NOT NULL,              -- public download URL
    file_size       BIGINT NOT NULL,
    version         VARCHAR,
    is_active       BOOLEAN NOT NULL DEFAULT false,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    uploaded_by     VARCHAR
);
CREATE INDEX IF NOT EXISTS idx_apk_files_created
    ON apk_files(created_at DESC);

-- ===========================================
-- LOGIN ATTEMPTS
-- Used for brute-force protection on POST /api/auth/login.
-- Rate limiter: SELECT COUNT(*) WHERE ip_address = ? AND attempted_at > ? AND succeeded = false
-- ===========================================
CREATE TABLE IF NOT EXISTS login_attempts (
    id           VARCHAR PRIMARY KEY,
    ip_address   VARCHAR NOT NULL,
    attempted_at TIMESTAMP NOT NULL,
    succeeded    BOOLEAN NOT NULL DEFAULT false
);
CREATE INDEX IF NOT EXISTS idx_login_attempts_ip_time
    ON login_attempts(ip_address, attempted_at DESC);
"#
    )
}

/// Migrations tracking table SQL.
///
/// Run before the schema init is applied. Tracks which numbered migrations
/// have been applied so restarts don't re-run them.
pub const MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id          VARCHAR PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;
