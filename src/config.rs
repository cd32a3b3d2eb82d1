//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional `harvest.toml`
//! (or the file named by `HARVEST_CONFIG`), then `HARVEST_*` environment
//! variables. The defaults alone reproduce a plain run against the
//! original collection.

use crate::harvester::{DEFAULT_GATEWAY_PREFIX, HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "harvest";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "HARVEST_CONFIG";

const ENV_PREFIX: &str = "HARVEST";

/// Harvester configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarvestConfig {
    /// Metadata URL prefix; the index is appended verbatim
    pub base_url: String,
    /// Replacement for the `ipfs://` scheme in image links
    pub gateway_prefix: String,
    /// Directory for `{index}{ext}` image files
    pub images_dir: PathBuf,
    /// Directory for `{index}.json` metadata files
    pub metadata_dir: PathBuf,
    /// File holding the last completed index
    pub cursor_file: PathBuf,
    /// Number of indices attempted per run, counted from the resume point
    pub max_indices: u64,
    pub image_width: u32,
    pub image_height: u32,
    /// Pause after a hard failure before moving on
    pub retry_delay_ms: u64,
    /// Per-request timeout; 0 disables it
    pub request_timeout_ms: u64,
    /// Emit a progress line every this many indices
    pub progress_interval: u64,
    pub user_agent: String,
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Also write daily-rolling log files here
    pub log_dir: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ipfs.io/ipfs/QmeSjSinHpPnmXmspMjwiXyN6zS4E9zccariGR3jxcaWtq/"
                .to_string(),
            gateway_prefix: DEFAULT_GATEWAY_PREFIX.to_string(),
            images_dir: PathBuf::from("images"),
            metadata_dir: PathBuf::from("metadata"),
            cursor_file: PathBuf::from("last_processed_image.txt"),
            max_indices: 2_000_000,
            image_width: 1000,
            image_height: 1000,
            retry_delay_ms: 5_000,
            request_timeout_ms: 0,
            progress_interval: 100,
            user_agent: concat!("harvest/", env!("CARGO_PKG_VERSION")).to_string(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl HarvestConfig {
    /// Load configuration from an explicit file, or `harvest.toml` if present,
    /// with `HARVEST_*` environment overrides on top
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Self = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load using the path in `HARVEST_CONFIG`, if set
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    /// Reject values the fetch loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarvestError::Config("base_url must not be empty".into()));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(HarvestError::Config(format!(
                "image dimensions must be non-zero, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.progress_interval == 0 {
            return Err(HarvestError::Config(
                "progress_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
