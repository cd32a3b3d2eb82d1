//! Resumable downloader for numbered metadata/image pairs served from an
//! IPFS gateway.
//!
//! [`Harvester`] walks indices one at a time, saving each metadata document
//! and its image (resized to a fixed square), and records progress in a
//! cursor file so the next run picks up where this one stopped.

pub mod config;
pub mod harvester;
pub mod logging;

pub use config::HarvestConfig;
pub use harvester::{HarvestError, Harvester, Result, RunSummary, StepOutcome};
