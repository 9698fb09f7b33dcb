//! WebPulse bridge: a thin HTTP service in front of crypto price, news,
//! search and sentiment providers, guarded by a shared-secret header.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use webpulse::core::{BridgeServices, CommandRouter};
//! use webpulse::models::BridgeConfig;
//! use webpulse::server::{router, AppState};
//! ```

pub use webpulse_core as core;
pub use webpulse_models as models;
pub use webpulse_providers as providers;

pub mod server;

use anyhow::Context;
use webpulse_core::BridgeServices;
use webpulse_models::BridgeConfig;

/// Load configuration from an optional TOML file, then overlay the process
/// environment.
pub fn load_config(path: Option<&str>) -> anyhow::Result<BridgeConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&str>, lookup: F) -> anyhow::Result<BridgeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {path}"))?;
            toml::from_str(&raw).with_context(|| format!("Failed to parse config: {path}"))?
        }
        None => BridgeConfig::default(),
    };
    config.apply_env_with(lookup);
    Ok(config)
}

/// Build the provider-backed services from configuration.
pub fn build_services(config: &BridgeConfig) -> anyhow::Result<BridgeServices> {
    BridgeServices::from_config(config).context("Failed to build services")
}
