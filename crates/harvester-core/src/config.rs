//! Configuration management for the harvester.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Nothing the sweep depends on is
//! hardcoded: endpoints, scan values, thresholds, pacing and storage
//! locations all come from here.

use crate::error::{ConfigError, ConfigResult};
use crate::types::ScanKey;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main harvester configuration.
///
/// Loaded from `--config <path>` or `~/.config/harvester/config.toml`
/// (or platform equivalent). Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Remote listing API settings
    pub endpoint: EndpointConfig,
    /// Which keys to sweep and when to give up on a sweep
    pub scan: ScanConfig,
    /// Delays between requests
    pub pacing: PacingConfig,
    /// Ledger and dataset locations
    pub storage: StorageConfig,
}

impl HarvestConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. The default path may be absent, in
    /// which case defaults are used.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - An explicit path does not exist
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::NotFound {
                    path: p.display().to_string(),
                })
            }
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `HARVESTER_TARGET_URL`: Override the listing endpoint
    /// - `HARVESTER_BOOTSTRAP_URL`: Override the session priming page
    /// - `HARVESTER_DUPLICATE_THRESHOLD`: Override the duplicate-page threshold
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HARVESTER_TARGET_URL") {
            tracing::debug!("Override endpoint.target_url from env: {}", val);
            self.endpoint.target_url = val;
        }

        if let Ok(val) = std::env::var("HARVESTER_BOOTSTRAP_URL") {
            tracing::debug!("Override endpoint.bootstrap_url from env: {}", val);
            self.endpoint.bootstrap_url = val;
        }

        if let Ok(val) = std::env::var("HARVESTER_DUPLICATE_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                self.scan.duplicate_page_threshold = threshold;
                tracing::debug!("Override scan.duplicate_page_threshold from env: {}", threshold);
            }
        }
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoint.target_url.trim().is_empty() {
            return Err(invalid("endpoint.target_url", "must be set"));
        }
        if self.endpoint.user_agents.is_empty() {
            return Err(invalid("endpoint.user_agents", "at least one user agent is required"));
        }
        if self.scan.values.is_empty() {
            return Err(invalid("scan.values", "at least one value is required"));
        }
        if self.scan.id_field.is_empty() {
            return Err(invalid("scan.id_field", "must be set"));
        }
        if self.scan.duplicate_page_threshold == 0 {
            return Err(invalid("scan.duplicate_page_threshold", "must be at least 1"));
        }
        if self.pacing.min_delay_ms > self.pacing.max_delay_ms {
            return Err(invalid(
                "pacing.min_delay_ms",
                &format!(
                    "{} exceeds pacing.max_delay_ms ({})",
                    self.pacing.min_delay_ms, self.pacing.max_delay_ms
                ),
            ));
        }
        self.scan_keys().map(|_| ())
    }

    /// The configured scan keys, in configuration order.
    pub fn scan_keys(&self) -> ConfigResult<Vec<ScanKey>> {
        self.scan
            .values
            .iter()
            .map(|value| {
                ScanKey::new(self.scan.dimension.clone(), value.clone())
                    .map_err(|e| invalid("scan.values", &e.to_string()))
            })
            .collect()
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/harvester/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "harvester", "harvester").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Remote listing API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL the page requests are POSTed to
    pub target_url: String,
    /// Page fetched once at startup to prime session cookies
    pub bootstrap_url: String,
    /// Value of the `Origin` header, if any
    pub origin: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// HTTP statuses that mean "rate limited / banned"
    pub rate_limit_statuses: Vec<u16>,
    /// Pool of user agents rotated per request
    pub user_agents: Vec<String>,
    /// Response field holding the page's rows
    pub rows_field: String,
    /// Extra fields merged into every request body
    pub payload_template: Map<String, Value>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            bootstrap_url: String::new(),
            origin: None,
            timeout_secs: 30,
            rate_limit_statuses: vec![403, 429],
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Firefox/119.0".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0".to_string(),
            ],
            rows_field: "Rows".to_string(),
            payload_template: Map::new(),
        }
    }
}

impl EndpointConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Scan key selection and sweep limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Filter column every scan value applies to
    pub dimension: String,
    /// Filter values; one scan key each
    pub values: Vec<String>,
    /// Record field used for deduplication
    pub id_field: String,
    /// Consecutive all-duplicate pages before a sweep is stopped
    pub duplicate_page_threshold: u32,
    /// Stop the whole batch when the API signals a rate limit
    pub halt_on_rate_limit: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dimension: "Country".to_string(),
            values: Vec::new(),
            id_field: "CertificateCode".to_string(),
            duplicate_page_threshold: 10_000,
            halt_on_rate_limit: true,
        }
    }
}

/// Delays between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Lower bound of the randomized delay between pages
    pub min_delay_ms: u64,
    /// Upper bound of the randomized delay between pages
    pub max_delay_ms: u64,
    /// Pause after a transport fault before checkpointing
    pub transport_backoff_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 4_000,
            max_delay_ms: 9_000,
            transport_backoff_ms: 10_000,
        }
    }
}

/// Ledger and dataset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `dataset_*.json` snapshots
    pub output_dir: PathBuf,
    /// Progress ledger document
    pub ledger_path: PathBuf,
    /// Write the record snapshot every N pages (0 disables periodic flushes)
    pub flush_every_pages: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("datas"),
            ledger_path: PathBuf::from("completed_filters.json"),
            flush_every_pages: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runnable_config() -> HarvestConfig {
        let mut config = HarvestConfig::default();
        config.endpoint.target_url = "https://listing.example.com/api/search".to_string();
        config.scan.values = vec!["Colombia".to_string(), "Peru".to_string()];
        config
    }

    #[test]
    fn test_default_config() {
        let config = HarvestConfig::default();
        assert_eq!(config.scan.dimension, "Country");
        assert_eq!(config.scan.id_field, "CertificateCode");
        assert_eq!(config.scan.duplicate_page_threshold, 10_000);
        assert_eq!(config.endpoint.rate_limit_statuses, vec![403, 429]);
        assert_eq!(config.pacing.min_delay_ms, 4_000);
        assert_eq!(config.storage.flush_every_pages, 1);
    }

    #[test]
    fn test_default_config_is_not_runnable() {
        // No endpoint and no scan values
        assert!(HarvestConfig::default().validate().is_err());
        assert!(runnable_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_delay_range() {
        let mut config = runnable_config();
        config.pacing.min_delay_ms = 10;
        config.pacing.max_delay_ms = 5;
        let err = config.validate().expect_err("inverted range");
        assert!(err.to_string().contains("pacing.min_delay_ms"));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = runnable_config();
        config.scan.duplicate_page_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scan_keys() {
        let keys = runnable_config().scan_keys().expect("keys");
        let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["Country:Colombia", "Country:Peru"]);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[endpoint]
target_url = "https://listing.example.com/api/search"
payload_template = { PageSize = 50, Status = ["Valid"] }

[scan]
values = ["Colombia"]

[pacing]
min_delay_ms = 0
max_delay_ms = 0
"#;

        let config: HarvestConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scan.values, vec!["Colombia"]);
        assert_eq!(config.endpoint.payload_template["PageSize"], 50);
        assert_eq!(config.pacing.max_delay_ms, 0);
        // These should be defaults
        assert_eq!(config.scan.dimension, "Country");
        assert_eq!(config.pacing.transport_backoff_ms, 10_000);
        assert_eq!(config.storage.ledger_path, PathBuf::from("completed_filters.json"));
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = runnable_config();
        config.scan.duplicate_page_threshold = 25;
        config.save(&config_path).expect("save config");

        let loaded = HarvestConfig::load(Some(&config_path)).expect("load config");
        assert_eq!(loaded.scan.duplicate_page_threshold, 25);
        assert_eq!(loaded.endpoint.target_url, config.endpoint.target_url);
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let tmp = TempDir::new().expect("create temp dir");
        let missing = tmp.path().join("absent.toml");
        let err = HarvestConfig::load(Some(&missing)).expect_err("missing config");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("HARVESTER_DUPLICATE_THRESHOLD", "77");
        std::env::set_var("HARVESTER_TARGET_URL", "https://override.example.com/api");

        let mut config = runnable_config();
        config.apply_env_overrides();
        assert_eq!(config.scan.duplicate_page_threshold, 77);
        assert_eq!(config.endpoint.target_url, "https://override.example.com/api");

        std::env::remove_var("HARVESTER_DUPLICATE_THRESHOLD");
        std::env::remove_var("HARVESTER_TARGET_URL");
    }
}
