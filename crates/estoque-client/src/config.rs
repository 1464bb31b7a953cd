//! # Client Configuration
//!
//! Endpoint, cache and export settings for the client layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ESTOQUE_API_URL=https://api.example.com                            │
//! │     ESTOQUE_POSTAL_URL=https://viacep.com.br/ws                        │
//! │     ESTOQUE_EXPORT_DIR=/tmp/exports                                    │
//! │     ESTOQUE_CACHE_TTL_SECS=30                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/estoque/estoque.toml (Linux)                             │
//! │     ~/Library/Application Support/br.com.estoque/estoque.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "http://localhost:3000"
//! timeout_secs = 15
//! max_retries = 3
//!
//! [cache]
//! ttl_secs = 30
//! fetch_timeout_secs = 20
//! revalidate = "background"   # background | blocking
//!
//! [postal]
//! base_url = "https://viacep.com.br/ws"
//!
//! [export]
//! output_dir = "/home/maria/Downloads"
//!
//! [ui]
//! mobile_breakpoint_px = 768
//! ```

use std::path::PathBuf;
use std::time::Duration;

use estoque_core::MOBILE_BREAKPOINT_PX;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::query::{QueryOptions, Revalidate};

// =============================================================================
// API Settings
// =============================================================================

/// REST backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Origin of the REST API; paths under `/api/*` are joined onto it.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_api_timeout() -> u64 {
    15
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    300
}
fn default_max_backoff() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Query cache defaults applied to every read made through `Api`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time a successful result stays fresh (seconds).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Upper bound on a single fetch (seconds).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// What a read does with stale data.
    #[serde(default)]
    pub revalidate: Revalidate,
}

fn default_ttl() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    20
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            revalidate: Revalidate::default(),
        }
    }
}

impl CacheSettings {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            ttl: Duration::from_secs(self.ttl_secs),
            revalidate: self.revalidate,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

// =============================================================================
// Postal Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalSettings {
    /// Lookup service root; requests go to `<base_url>/<code>/json/`.
    #[serde(default = "default_postal_url")]
    pub base_url: String,

    #[serde(default = "default_postal_timeout")]
    pub timeout_secs: u64,
}

fn default_postal_url() -> String {
    "https://viacep.com.br/ws".to_string()
}
fn default_postal_timeout() -> u64 {
    10
}

impl Default for PostalSettings {
    fn default() -> Self {
        PostalSettings {
            base_url: default_postal_url(),
            timeout_secs: default_postal_timeout(),
        }
    }
}

// =============================================================================
// Export / UI Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Where downloads land. Falls back to the user's download directory,
    /// then the current directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl ExportSettings {
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| directories::UserDirs::new().and_then(|d| d.download_dir().map(PathBuf::from)))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Viewport width below which the sidebar is forced closed.
    #[serde(default = "default_breakpoint")]
    pub mobile_breakpoint_px: u32,
}

fn default_breakpoint() -> u32 {
    MOBILE_BREAKPOINT_PX
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            mobile_breakpoint_px: default_breakpoint(),
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub postal: PostalSettings,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub ui: UiSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (estoque.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> ClientResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Config(format!("{}: {e}", parent.display())))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        for (name, raw) in [("api.base_url", &self.api.base_url), ("postal.base_url", &self.postal.base_url)] {
            let parsed = url::Url::parse(raw)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ClientError::Config(format!(
                    "{name} must start with http:// or https://, got: {raw}"
                )));
            }
        }

        if self.api.timeout_secs == 0 || self.postal.timeout_secs == 0 {
            return Err(ClientError::Config("timeouts must be greater than 0".into()));
        }

        if self.cache.fetch_timeout_secs == 0 {
            return Err(ClientError::Config(
                "cache.fetch_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.ui.mobile_breakpoint_px == 0 {
            return Err(ClientError::Config(
                "ui.mobile_breakpoint_px must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ESTOQUE_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(url) = std::env::var("ESTOQUE_POSTAL_URL") {
            debug!(url = %url, "Overriding postal URL from environment");
            self.postal.base_url = url;
        }

        if let Ok(dir) = std::env::var("ESTOQUE_EXPORT_DIR") {
            self.export.output_dir = Some(PathBuf::from(dir));
        }

        if let Ok(ttl) = std::env::var("ESTOQUE_CACHE_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => self.cache.ttl_secs = secs,
                Err(_) => warn!(value = %ttl, "Ignoring non-numeric ESTOQUE_CACHE_TTL_SECS"),
            }
        }
    }

    /// `estoque.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("estoque.toml"))
    }

    /// `preferences.json` in the platform data directory.
    pub fn default_preferences_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().join("preferences.json"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("br.com", "estoque", "estoque")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.cache.revalidate, Revalidate::Background);
        assert_eq!(config.ui.mobile_breakpoint_px, 768);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            [api]
            base_url = "https://estoque.example.com"

            [cache]
            revalidate = "blocking"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://estoque.example.com");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.cache.revalidate, Revalidate::Blocking);
        assert_eq!(config.postal.base_url, "https://viacep.com.br/ws");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.api.base_url = "ftp://files".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        config.api.base_url = "https://ok.example.com".to_string();
        config.cache.fetch_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_query_options() {
        let mut settings = CacheSettings::default();
        settings.ttl_secs = 5;
        let opts = settings.query_options();
        assert_eq!(opts.ttl, Duration::from_secs(5));
        assert_eq!(opts.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("estoque-cfg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("estoque.toml");

        let mut config = ClientConfig::default();
        config.api.max_retries = 7;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[api]"));
        let loaded = ClientConfig::from_toml(&contents).unwrap();
        assert_eq!(loaded.api.max_retries, 7);

        let _ = std::fs::remove_dir_all(dir);
    }
}
