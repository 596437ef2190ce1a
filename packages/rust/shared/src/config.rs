//! Application configuration for shopline-cli.
//!
//! User config lives at `~/.shopline/shopline.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShoplineError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "shopline.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".shopline";

/// Environment variables checked for an access token, in order, after the
/// one named in `[api] token_env`.
pub const TOKEN_ENV_VARS: [&str; 3] = [
    "SHOPLINE_ACCESS_TOKEN",
    "SHOPLINE_API_TOKEN",
    "SHOPLINE_TOKEN",
];

// ---------------------------------------------------------------------------
// Config structs (matching shopline.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listing/output defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// API endpoint and credentials lookup.
    #[serde(default)]
    pub api: ApiConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Page size used when `--page-size` is not given.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Concurrent detail lookups for `--expand`.
    #[serde(default = "default_jobs")]
    pub jobs: u32,

    /// Output format: "text" or "json".
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            jobs: default_jobs(),
            output: default_output(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}
fn default_jobs() -> u32 {
    4
}
fn default_output() -> String {
    "text".into()
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Open API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the access token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://open.shopline.io/v1".into()
}
fn default_token_env() -> String {
    TOKEN_ENV_VARS[0].into()
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.shopline/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ShoplineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.shopline/shopline.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ShoplineError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ShoplineError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ShoplineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ShoplineError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ShoplineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Find the access token: the configured env var first, then the
/// well-known fallbacks. Blank values are ignored.
pub fn resolve_access_token(config: &AppConfig) -> Result<String> {
    resolve_access_token_with(config, |name| std::env::var(name).ok())
}

fn resolve_access_token_with(
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let configured = config.api.token_env.as_str();
    std::iter::once(configured)
        .chain(TOKEN_ENV_VARS.iter().copied().filter(|n| *n != configured))
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or_else(|| {
            ShoplineError::config(format!(
                "access token not found. Set the {configured} environment variable \
                 (or one of {}).",
                TOKEN_ENV_VARS.join(", ")
            ))
        })
}
