use std::sync::Arc;

use storemon_core::refresh::MountRefresher;
use storemon_core::snapshot::UsageSource;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Nothing in it is
/// mutated after startup; every report request takes its own snapshot.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (mount root, report settings, refresh settings).
    pub config: Arc<ServerConfig>,
    /// Source of mounted filesystems and their usage.
    pub usage_source: Arc<dyn UsageSource>,
    /// Credential-gated mount-refresh runner.
    pub refresher: Arc<MountRefresher>,
}

impl AppState {
    pub fn new(config: ServerConfig, usage_source: Arc<dyn UsageSource>) -> Self {
        let refresher = Arc::new(MountRefresher::new(config.refresh.clone()));
        Self {
            config: Arc::new(config),
            usage_source,
            refresher,
        }
    }
}
