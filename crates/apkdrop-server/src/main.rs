use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use apkdrop_server::state::AppState;

/// `apkdrop health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$APKDROP_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("APKDROP_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before anything else so the binary
    // stays fast when used as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("apkdrop=info".parse()?),
        )
        .json()
        .init();

    let cfg = apkdrop_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    if cfg.timezone.parse::<chrono_tz::Tz>().is_err() {
        tracing::warn!(
            timezone = %cfg.timezone,
            "APKDROP_TIMEZONE is not a valid IANA name, falling back to UTC for today-boundaries"
        );
    }

    // Ensure the data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/apkdrop.db", cfg.data_dir);

    // Open DuckDB — initialises schema and seeds the settings table.
    let db = apkdrop_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    // Auth initialization for password/local modes.
    match &cfg.auth_mode {
        apkdrop_core::config::AuthMode::Password(_) | apkdrop_core::config::AuthMode::Local => {
            match db.ensure_jwt_secret().await {
                Ok(_) => info!("JWT secret ready"),
                Err(e) => tracing::error!(error = %e, "Failed to ensure JWT secret"),
            }

            if let apkdrop_core::config::AuthMode::Local = &cfg.auth_mode {
                match db.is_admin_configured().await {
                    Ok(true) => info!("Admin password configured"),
                    Ok(false) => {
                        info!("Admin not configured — setup required via POST /api/auth/setup")
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to check admin configured"),
                }
            }

            info!(auth_mode = ?cfg.auth_mode, "Auth enabled");
        }
        apkdrop_core::config::AuthMode::None => {
            info!("Auth disabled (APKDROP_AUTH=none) — all routes open");
        }
    }

    let state = Arc::new(AppState::new(db, cfg.clone()));

    // Ensure the APK blob directory exists so /downloads can serve it.
    state.apk_storage.ensure_dir().await?;

    // Spawn the background buffer-flush task.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_buffer_flush_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = apkdrop_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "apkdrop listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let state_for_shutdown = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    // One last flush so buffered events survive a clean shutdown.
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state_for_shutdown.flush_buffer(),
    )
    .await
    .ok();

    Ok(())
}
