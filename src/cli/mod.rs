pub mod config_cmd;
pub mod output;
pub mod renderer;
pub mod show_cmd;
pub mod watch_cmd;

use anyhow::Result;
use tracing::warn;

use crate::core::config::AppConfig;
use crate::core::credentials::{CachedStore, SystemStore};
use crate::core::fetcher::UsageClient;
use crate::core::monitor::UsageMonitor;

pub type Monitor = UsageMonitor<CachedStore<SystemStore>, UsageClient>;

/// Load the config file, falling back to defaults when it is unreadable.
pub fn load_config() -> AppConfig {
    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, path = %AppConfig::config_path().display(), "using default config");
            AppConfig::default()
        }
    }
}

pub fn build_monitor(config: &AppConfig) -> Result<Monitor> {
    let credentials = CachedStore::new(SystemStore::from_config(&config.credentials));
    let client = UsageClient::from_config(config)?;
    Ok(UsageMonitor::new(credentials, client))
}
