mod cursor;
mod fetch_loop;
mod http;
mod link;
mod resize;
mod storage;


pub use cursor::{CursorStore, highest_image_index};
pub use fetch_loop::{Harvester, RunSummary, Stage, StepOutcome};
pub use http::{Fetched, GatewayClient};
pub use link::{
    DEFAULT_GATEWAY_PREFIX, IPFS_SCHEME, extension_for_content_type, extract_image_link,
    resolve_gateway_url,
};
pub use resize::Resizer;
pub use storage::Storage;

/// Harvester result type
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Harvester error types
///
/// Every variant is a hard failure for the index being processed. Non-success
/// HTTP statuses are not errors; they surface as [`Fetched::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cursor error: {0}")]
    Cursor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl HarvestError {
    /// Whether the failure is likely to clear up on its own (timeouts, dropped connections)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}
