use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Base URL prepended to `/downloads/...` when building public file URLs.
    pub public_url: String,
    pub auth_mode: AuthMode,
    pub session_days: u32,
    /// IANA timezone name used for "today" boundaries in the stats queries.
    pub timezone: String,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub buffer_flush_interval_ms: u64,
    pub buffer_max_size: usize,
    pub duckdb_memory_limit: String,
    pub argon2_memory_kb: u32,
    pub rate_limit_disable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    None,
    /// Holds the plaintext password value read from `APKDROP_PASSWORD`.
    Password(String),
    Local,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("APKDROP_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("APKDROP_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            public_url: std::env::var("APKDROP_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            auth_mode: {
                let raw = std::env::var("APKDROP_AUTH").unwrap_or_else(|_| "local".to_string());
                match raw.as_str() {
                    "none" => AuthMode::None,
                    "password" => {
                        let pw = std::env::var("APKDROP_PASSWORD").map_err(|_| {
                            "APKDROP_PASSWORD required when APKDROP_AUTH=password".to_string()
                        })?;
                        AuthMode::Password(pw)
                    }
                    _ => AuthMode::Local,
                }
            },
            session_days: std::env::var("APKDROP_SESSION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            timezone: std::env::var("APKDROP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            cors_origins: std::env::var("APKDROP_CORS_ORIGINS")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            max_upload_bytes: std::env::var("APKDROP_MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "200".to_string())
                .parse::<usize>()
                .unwrap_or(200)
                * 1024
                * 1024,
            buffer_flush_interval_ms: 1000,
            buffer_max_size: 1000,
            duckdb_memory_limit: std::env::var("APKDROP_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            argon2_memory_kb: std::env::var("APKDROP_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .unwrap_or(65536),
            rate_limit_disable: std::env::var("APKDROP_RATE_LIMIT_DISABLE")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }

    pub fn buffer_flush_interval(&self) -> Duration {
        Duration::from_millis(self.buffer_flush_interval_ms)
    }

    /// Parse the configured reporting timezone, falling back to UTC.
    pub fn reporting_timezone(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}
