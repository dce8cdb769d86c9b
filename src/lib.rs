pub mod commands;
pub mod config;
pub mod core_state;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod prefs;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::core_state::CoreState;

/// Initialize tracing from `RUST_LOG`, falling back to the default
/// filter. Call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Build the shared state for the deployment profile named by the
/// environment.
pub fn bootstrap() -> Arc<CoreState> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    Arc::new(CoreState::new(config::DeploymentProfile::from_env()))
}
