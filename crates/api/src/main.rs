use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storemon_api::config::ServerConfig;
use storemon_api::router::build_app_router;
use storemon_api::state::AppState;
use storemon_core::snapshot::system::SystemUsageSource;

const DEFAULT_LOG_FILTER: &str = "storemon_api=debug,storemon_core=info,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        mount_root = %config.mount_root,
        fleet_capacity_tb = config.report.fleet_capacity_tb,
        critical_threshold = config.report.critical_threshold,
        refresh_script = %config.refresh.script,
        "Storage monitor configured"
    );

    let usage_source = Arc::new(SystemUsageSource::default());
    let app = build_app_router(AppState::new(config.clone(), usage_source), &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!(%addr, "Serving storage report");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Storage monitor stopped");
}

/// `RUST_LOG` if set, otherwise [`DEFAULT_LOG_FILTER`].
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolve on SIGINT or SIGTERM so in-flight requests can finish.
///
/// A refresh still running at shutdown is dropped with its request; its
/// child is killed on drop.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Shutting down");
}
