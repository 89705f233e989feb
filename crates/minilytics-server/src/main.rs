use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use minilytics_server::{app, cache::FileCache, datadir, geo::GeoCache, state::AppState};

/// `minilytics health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$MINILYTICS_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("MINILYTICS_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before tokio does any real work so
    // the binary stays fast when used as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("minilytics=info".parse()?),
        )
        .json()
        .init();

    let cfg = minilytics_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Data directory (with protection files) must exist before DuckDB opens.
    let cache_dir = datadir::prepare_data_dir(&cfg.data_dir)?;
    let db_path = format!("{}/minilytics.duckdb", cfg.data_dir);
    let db = minilytics_duckdb::DuckDbBackend::open(&db_path)?;

    let geo = GeoCache::new(&cfg.geo_base_url, FileCache::new(cache_dir))?;

    if cfg.site_domain.is_none() {
        info!("No MINILYTICS_SITE_DOMAIN set — accepting events for any site");
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let state = Arc::new(AppState::new(db, cfg.clone(), geo));
    let app = app::build_app(state);

    info!(port = cfg.port, site = ?cfg.site_domain, "Minilytics listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    Ok(())
}
