use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drain_schemas::WorkerId;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if absent —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_dir = std::env::var("DRAIN_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));
    let env_name = std::env::var("DRAIN_ENV").ok();
    let settings = drain_config::Settings::load(&config_dir, env_name.as_deref())?;

    let pool =
        drain_db::connect_with_max_connections(&settings.database_url, settings.max_concurrent_masters + 2)
            .await?;
    drain_db::migrate(&pool).await?;

    let worker_id = WorkerId::generate();
    info!(worker = %worker_id, "identity assigned");

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_listener(Arc::clone(&shutdown));

    drain_worker::run(pool, settings, worker_id.as_str().to_string(), shutdown).await;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Observes SIGTERM/SIGINT and flips the shared cancellation flag once. The
/// worker loop polls this flag at each cycle boundary rather than being
/// forcibly torn down mid-write.
fn spawn_shutdown_listener(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::warn!("shutdown signal received; finishing active cycles");
        shutdown.store(true, Ordering::Relaxed);
    });
}
