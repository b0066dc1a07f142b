#![forbid(unsafe_code)]

use genecache_server::{build_router, build_state, ServiceConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cfg = ServiceConfig::from_env();
    init_tracing(cfg.as_ref().map_or(true, |c| c.log_json));
    let cfg = cfg.map_err(|e| {
        error!("invalid configuration: {e}");
        e.to_string()
    })?;

    let state = build_state(&cfg).await.map_err(|e| {
        error!("startup failed: {e}");
        e.to_string()
    })?;
    let app = build_router(state);

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .map_err(|e| format!("bind {} failed: {e}", cfg.bind_addr))?;
    info!(
        bind = %cfg.bind_addr,
        backend = ?cfg.store_backend,
        "genecache-server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))?;
    info!("genecache-server stopped");
    Ok(())
}
