//! The resumable fetch loop.
//!
//! One index at a time: metadata GET, image HEAD, image GET, resize, cursor.
//! Every index ends in a [`StepOutcome`]; only [`StepOutcome::Failed`] holds
//! the cursor back and pauses the loop before it moves on.

use crate::config::HarvestConfig;
use crate::harvester::{
    CursorStore, Fetched, GatewayClient, HarvestError, Resizer, Result, Storage,
    extension_for_content_type, extract_image_link, resolve_gateway_url,
};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Request that a soft failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Image,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// How processing a single index ended
#[derive(Debug)]
pub enum StepOutcome {
    /// Image downloaded and resized; `original` is its size before resizing
    Saved { path: PathBuf, original: (u32, u32) },
    /// Image file already on disk, download skipped
    AlreadyPresent { path: PathBuf },
    /// Gateway answered with a non-success status
    Rejected { stage: Stage, status: StatusCode },
    /// Network, parse, image or filesystem error
    Failed(HarvestError),
}

impl StepOutcome {
    /// Whether the index counts as done and the cursor may move past it
    #[must_use]
    pub const fn advances_cursor(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Counters for one run of the loop
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub first_index: u64,
    /// Last index written to the cursor file during this run
    pub last_completed: Option<u64>,
    pub attempted: u64,
    pub saved: u64,
    pub already_present: u64,
    pub rejected: u64,
    pub failed: u64,
    /// Stopped by the shutdown signal rather than the index bound
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    fn new(first_index: u64) -> Self {
        Self {
            first_index,
            last_completed: None,
            attempted: 0,
            saved: 0,
            already_present: 0,
            rejected: 0,
            failed: 0,
            interrupted: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn record(&mut self, index: u64, outcome: &StepOutcome) {
        self.attempted += 1;
        match outcome {
            StepOutcome::Saved { .. } => self.saved += 1,
            StepOutcome::AlreadyPresent { .. } => self.already_present += 1,
            StepOutcome::Rejected { .. } => self.rejected += 1,
            StepOutcome::Failed(_) => self.failed += 1,
        }
        if outcome.advances_cursor() {
            self.last_completed = Some(index);
        }
    }

    fn elapsed_secs(&self) -> i64 {
        (self.finished_at.unwrap_or_else(Utc::now) - self.started_at).num_seconds()
    }
}

/// Sequential downloader for numbered metadata/image pairs
pub struct Harvester {
    config: HarvestConfig,
    client: GatewayClient,
    storage: Storage,
    cursor: CursorStore,
    resizer: Resizer,
}

impl Harvester {
    /// Create a harvester from a validated configuration
    pub fn new(config: HarvestConfig) -> Result<Self> {
        config.validate()?;

        let client = GatewayClient::new(
            config.base_url.clone(),
            &config.user_agent,
            config.request_timeout(),
        )?;
        let storage = Storage::new(config.images_dir.clone(), config.metadata_dir.clone());
        let cursor = CursorStore::new(config.cursor_file.clone());
        let resizer = Resizer::new(config.image_width, config.image_height);

        Ok(Self {
            config,
            client,
            storage,
            cursor,
            resizer,
        })
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run until the index bound is reached
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_until(std::future::pending()).await
    }

    /// Run until the index bound is reached or `shutdown` completes.
    ///
    /// Shutdown is honoured at any point: an index still waiting on the
    /// gateway is abandoned, which may leave its metadata written without an
    /// image. Errors returned from here are startup errors; per-index failures
    /// are counted, not raised.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        self.storage.prepare().await?;
        let start = self.cursor.resume_index(self.storage.images_dir()).await?;
        let end = start.saturating_add(self.config.max_indices);

        info!(
            start,
            end,
            base_url = %self.config.base_url,
            "Starting harvest"
        );

        let mut summary = RunSummary::new(start);
        tokio::pin!(shutdown);

        for index in start..end {
            // An interrupted index is dropped unrecorded; its cursor is never written
            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => {
                    summary.interrupted = true;
                    break;
                }
                outcome = self.step(index) => outcome,
            };
            summary.record(index, &outcome);

            if summary.attempted % self.config.progress_interval == 0 {
                info!(
                    index,
                    attempted = summary.attempted,
                    saved = summary.saved,
                    already_present = summary.already_present,
                    rejected = summary.rejected,
                    failed = summary.failed,
                    elapsed_secs = summary.elapsed_secs(),
                    "Progress"
                );
            }

            if !outcome.advances_cursor() {
                tokio::select! {
                    biased;
                    () = &mut shutdown => {
                        summary.interrupted = true;
                        break;
                    }
                    () = tokio::time::sleep(self.config.retry_delay()) => {}
                }
            }
        }

        if summary.interrupted {
            info!("Shutdown requested, stopping");
        }

        summary.finished_at = Some(Utc::now());
        info!(
            first_index = summary.first_index,
            last_completed = ?summary.last_completed,
            attempted = summary.attempted,
            saved = summary.saved,
            already_present = summary.already_present,
            rejected = summary.rejected,
            failed = summary.failed,
            elapsed_secs = summary.elapsed_secs(),
            "Harvest finished"
        );

        Ok(summary)
    }

    /// Process one index and persist the cursor unless it failed
    pub async fn step(&self, index: u64) -> StepOutcome {
        let outcome = self
            .process_index(index)
            .await
            .unwrap_or_else(StepOutcome::Failed);

        match &outcome {
            StepOutcome::Saved { path, original } => info!(
                index,
                path = %path.display(),
                original_width = original.0,
                original_height = original.1,
                "Saved image"
            ),
            StepOutcome::AlreadyPresent { path } => {
                debug!(index, path = %path.display(), "Image already present, skipping download");
            }
            StepOutcome::Rejected { stage, status } => {
                warn!(index, %stage, %status, "Gateway refused request");
            }
            StepOutcome::Failed(e) => error!(
                index,
                error = %e,
                transient = e.is_transient(),
                "Failed to process index"
            ),
        }

        if outcome.advances_cursor()
            && let Err(e) = self.cursor.write(index).await
        {
            error!(index, error = %e, "Failed to persist cursor");
            return StepOutcome::Failed(e);
        }

        outcome
    }

    async fn process_index(&self, index: u64) -> Result<StepOutcome> {
        let metadata = match self.client.fetch_metadata(index).await? {
            Fetched::Ok(doc) => doc,
            Fetched::Rejected(status) => {
                return Ok(StepOutcome::Rejected {
                    stage: Stage::Metadata,
                    status,
                });
            }
        };

        let metadata_path = self.storage.write_metadata(index, &metadata).await?;
        debug!(index, path = %metadata_path.display(), "Saved metadata");

        let image_url =
            resolve_gateway_url(extract_image_link(&metadata), &self.config.gateway_prefix);
        let content_type = self.client.content_type(&image_url).await?;
        let ext = extension_for_content_type(content_type.as_deref());
        let image_path = self.storage.image_path(index, &ext);

        if tokio::fs::try_exists(&image_path).await? {
            return Ok(StepOutcome::AlreadyPresent { path: image_path });
        }

        let bytes = match self.client.fetch_bytes(&image_url).await? {
            Fetched::Ok(bytes) => bytes,
            Fetched::Rejected(status) => {
                return Ok(StepOutcome::Rejected {
                    stage: Stage::Image,
                    status,
                });
            }
        };

        self.storage.write_image(&image_path, &bytes).await?;

        match self.resizer.resize_file_blocking(image_path.clone()).await {
            Ok(original) => Ok(StepOutcome::Saved {
                path: image_path,
                original,
            }),
            Err(e) => {
                // An undecodable file left in place would pass the existence check next run
                if let Err(remove_err) = tokio::fs::remove_file(&image_path).await {
                    warn!(
                        index,
                        path = %image_path.display(),
                        error = %remove_err,
                        "Failed to remove undecodable image"
                    );
                }
                Err(e)
            }
        }
    }
}
