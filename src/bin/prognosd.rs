//! prognosd — the prognos prediction daemon.
//!
//! Serves the HTTP surface:
//! - `GET  /symptoms` — the symptom catalog
//! - `POST /predict`  — run one worker invocation for the given symptoms
//! - `GET  /health`   — liveness + version
//!
//! Configuration comes from the XDG config file with `PROGNOS_*` environment
//! overrides. A PID file under the XDG runtime dir lets the `prognos` CLI
//! discover a running instance.
//!
//! Build and run: `cargo run --features server --bin prognosd`

use std::sync::Arc;

use prognos::config::ServiceConfig;
use prognos::paths::PrognosPaths;
use prognos::server::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = PrognosPaths::resolve().unwrap_or_else(|e| {
        tracing::error!("failed to resolve XDG paths: {e}");
        std::process::exit(1);
    });
    if let Err(e) = paths.ensure_dirs() {
        tracing::error!("failed to create XDG directories: {e}");
        std::process::exit(1);
    }

    let config = ServiceConfig::resolve(&paths, None).unwrap_or_else(|e| {
        tracing::error!("failed to load config: {e}");
        std::process::exit(1);
    });

    tracing::info!(
        worker = %config.worker.program,
        catalog = %config.catalog_path.display(),
        "prognosd initialized"
    );
    // Startup continues regardless; problems surface per request.
    for warning in config.preflight_warnings() {
        tracing::warn!("{warning}");
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let bind = config.bind.clone();
    let port = config.port;

    // In-flight invocations watch this flag and kill their workers on shutdown.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let state = Arc::new(AppState::new(config, shutdown_rx));
    let app = prognos::server::router(state);

    // Write PID file so the `prognos` CLI can discover this server.
    if let Err(e) = prognos::client::write_pid_file(&paths, port, &bind) {
        tracing::warn!("failed to write PID file: {e}");
    }

    tracing::info!("prognosd listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    // Serve with graceful shutdown on SIGTERM/SIGINT.
    let paths_for_shutdown = paths.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut sigterm =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                        .expect("failed to register SIGTERM handler");
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            #[cfg(not(unix))]
            {
                ctrl_c.await.ok();
            }
            tracing::info!("prognosd shutting down");
            let _ = shutdown_tx.send(true);
            prognos::client::remove_pid_file(&paths_for_shutdown);
        })
        .await
        .expect("server error");

    // Belt-and-suspenders: clean up PID file on normal exit too.
    prognos::client::remove_pid_file(&paths);
}
