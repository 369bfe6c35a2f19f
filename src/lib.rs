//! # lofi-gen
//!
//! Submit music generation jobs to a hosted provider, wait for them to finish,
//! and download the resulting audio.
//!
//! ## Pipeline
//!
//! Every job goes through the same single-pass pipeline:
//!
//! 1. [`ProviderClient::submit`] sends the creation request and returns a [`JobHandle`]
//! 2. [`StatusPoller`] queries the job until it is terminal or the wait budget is spent
//! 3. [`extractor::extract`] turns each status payload into a [`JobStatus`]
//! 4. [`ArtifactDownloader`] streams each artifact to disk atomically
//!
//! [`Orchestrator`] runs that pipeline for a list of requests, one after another,
//! records a [`JobOutcome`] per job and never lets one job's failure abort the batch.
//!
//! Provider differences (auth header, endpoint paths, JSON field names) are
//! confined to the adapters in [`provider`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use lofi_gen::{Config, GenerationRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let credential = config.provider.resolve_credential()?;
//!     let orchestrator = Orchestrator::from_config(&config, credential)?;
//!
//!     let jobs = vec![GenerationRequest {
//!         title: "Midnight Study".to_string(),
//!         prompt: "chill lofi hip hop beat, mellow piano, vinyl crackle".to_string(),
//!         tags: "lofi, study, chill".to_string(),
//!         instrumental: true,
//!     }];
//!
//!     let report = orchestrator.run_batch(&jobs).await?;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client for a provider endpoint
pub mod client;
/// Configuration types
pub mod config;
/// Artifact downloading
pub mod downloader;
/// Error types
pub mod error;
/// Result extraction
pub mod extractor;
/// Job list loading
pub mod jobs;
/// Batch orchestration
pub mod orchestrator;
/// Status polling
pub mod poller;
/// Provider adapters
pub mod provider;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::ProviderClient;
pub use config::{
    CollisionPolicy, Config, Credential, IncompletePolicy, PollConfig, ProviderConfig,
    ProviderKind,
};
pub use downloader::ArtifactDownloader;
pub use error::{DownloadError, Error, Result, SubmitError};
pub use orchestrator::Orchestrator;
pub use poller::{StatusPoller, StatusSource};
pub use types::{
    Artifact, BatchReport, BatchSummary, Event, GenerationRequest, JobHandle, JobOutcome,
    JobReport, JobStatus, PollOutcome,
};
