//! CLI command implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use balcao::config::{self, Config};

pub mod catalogs;
pub mod deliveries;
pub mod serve;

/// Config file plus the paths it names, resolved against its directory.
pub struct LoadedConfig {
    pub config: Config,
    pub catalog_dir: PathBuf,
    pub delivery_log_path: PathBuf,
}

pub async fn load_config(config_path: &str) -> Result<LoadedConfig> {
    let config = Config::load(config_path)
        .await
        .with_context(|| format!("Failed to load config from '{config_path}'"))?;

    let config_path = Path::new(config_path);
    let catalog_dir = config::resolve_path(config_path, &config.catalogs.dir);
    let delivery_log_path = config::resolve_path(config_path, &config.delivery_log.path);

    Ok(LoadedConfig {
        config,
        catalog_dir,
        delivery_log_path,
    })
}
