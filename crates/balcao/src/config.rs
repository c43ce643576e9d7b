use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub catalogs: CatalogsConfig,
    #[serde(default)]
    pub delivery_log: DeliveryLogConfig,
    /// External gateway bridging to the messaging platform.
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,

    #[error("invalid idle thresholds: warning after {warning}s must be below closing after {close}s")]
    InvalidIdleThresholds { warning: u64, close: u64 },

    #[error("idle threshold of {seconds}s exceeds the maximum of {max}s")]
    IdleThresholdTooLarge { seconds: u64, max: u64 },
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Config = serde_saphyr::from_str(&expand_env_vars(&contents)?)?;
        config.bot.validate()?;
        Ok(config)
    }
}

/// Resolve a path relative to the config file directory.
///
/// Absolute paths are returned unchanged.
pub fn resolve_path(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config_dir.join(path)
}

// ============================================================================
// Default Paths
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "balcao.yaml";
/// Default catalog directory (relative to config file).
pub const DEFAULT_CATALOG_DIR: &str = "arquivos/PDFs";
/// Default delivery log file (relative to config file).
pub const DEFAULT_DELIVERY_LOG: &str = "logs/catalog_requests.jsonl";

// ============================================================================
// Serde Defaults
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_typing_delay_ms() -> u64 {
    1500
}

fn default_bulk_delay_ms() -> u64 {
    1500
}

/// Upper bound for idle thresholds (30 days).
pub const MAX_IDLE_SECONDS: u64 = 30 * 24 * 60 * 60;

fn default_warning_after() -> u64 {
    3 * 60
}

fn default_close_after() -> u64 {
    10 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_store_location_url() -> String {
    "https://maps.app.goo.gl/mLiFQuJSGqHb6WvE7".to_string()
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CATALOG_DIR)
}

fn default_catalog_extension() -> String {
    "pdf".to_string()
}

fn default_delivery_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_DELIVERY_LOG)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
///
/// `$$` produces a literal `$`; a `$` not followed by `{` is kept as is.
/// A reference to an unset variable without a default is an error.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            let end = body.find('}').ok_or(ConfigError::UnclosedVarReference)?;
            out.push_str(&lookup_var(&body[..end])?);
            rest = &body[end + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn lookup_var(reference: &str) -> Result<String, ConfigError> {
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    match (std::env::var(name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

/// HTTP server exposing liveness and the pairing QR code.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// BotConfig
// ============================================================================

/// Conversation pacing and idle thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Pause between the typing indicator and each reply.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    /// Pause between documents when sending every catalog at once.
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,
    #[serde(default = "default_warning_after")]
    pub warning_after_seconds: u64,
    #[serde(default = "default_close_after")]
    pub close_after_seconds: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Link sent for the "store location" menu option.
    #[serde(default = "default_store_location_url")]
    pub store_location_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: default_typing_delay_ms(),
            bulk_delay_ms: default_bulk_delay_ms(),
            warning_after_seconds: default_warning_after(),
            close_after_seconds: default_close_after(),
            sweep_interval_seconds: default_sweep_interval(),
            store_location_url: default_store_location_url(),
        }
    }
}

impl BotConfig {
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn bulk_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.close_after_seconds > MAX_IDLE_SECONDS {
            return Err(ConfigError::IdleThresholdTooLarge {
                seconds: self.close_after_seconds,
                max: MAX_IDLE_SECONDS,
            });
        }
        if self.warning_after_seconds >= self.close_after_seconds {
            return Err(ConfigError::InvalidIdleThresholds {
                warning: self.warning_after_seconds,
                close: self.close_after_seconds,
            });
        }
        Ok(())
    }
}

// ============================================================================
// CatalogsConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogsConfig {
    /// Directory scanned for catalog documents.
    #[serde(default = "default_catalog_dir")]
    pub dir: PathBuf,
    /// File extension (without dot) recognized as a catalog, case-insensitive.
    #[serde(default = "default_catalog_extension")]
    pub extension: String,
}

impl Default for CatalogsConfig {
    fn default() -> Self {
        Self {
            dir: default_catalog_dir(),
            extension: default_catalog_extension(),
        }
    }
}

// ============================================================================
// DeliveryLogConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryLogConfig {
    #[serde(default = "default_delivery_log_path")]
    pub path: PathBuf,
}

impl Default for DeliveryLogConfig {
    fn default() -> Self {
        Self {
            path: default_delivery_log_path(),
        }
    }
}

// ============================================================================
// GatewayConfig
// ============================================================================

/// Configuration for the external (subprocess) gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway name (used for logging).
    #[serde(default = "default_gateway_name")]
    pub name: String,

    /// Command to execute (path to binary).
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables to set for the subprocess.
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub restart: RestartPolicy,
}

fn default_gateway_name() -> String {
    "whatsapp".to_string()
}

/// Restart policy for the gateway subprocess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Always restart on exit.
    Always,
    /// Restart only on non-zero exit.
    #[default]
    OnFailure,
    /// Never restart.
    Never,
}

// ============================================================================
// Tests
// ============================================================================
