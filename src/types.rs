//! Core types for lofi-gen

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One music generation request
///
/// Immutable once submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Track title, also used to name downloaded files
    pub title: String,
    /// Free-text description of the music
    pub prompt: String,
    /// Comma-separated style tags
    #[serde(default)]
    pub tags: String,
    /// Ask for a track without vocals
    #[serde(default = "default_instrumental")]
    pub instrumental: bool,
}

fn default_instrumental() -> bool {
    true
}

/// Opaque provider-assigned job identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub String);

impl JobHandle {
    /// Create a new JobHandle
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One downloadable output of a job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Where the audio bytes live
    pub source_url: String,
    /// File name to save under (no directory components)
    pub suggested_name: String,
}

/// Normalized job status derived from one provider response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Still generating (or not enough artifacts yet)
    Pending,
    /// Finished; artifacts in the order the provider listed them
    Succeeded(Vec<Artifact>),
    /// Provider gave up on the job
    Failed(String),
}

impl JobStatus {
    /// Whether no further status changes are expected
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// Result of polling a job to completion
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Job finished with these artifacts
    Succeeded(Vec<Artifact>),
    /// Job failed on the provider side
    Failed(String),
    /// Wait budget exhausted without a terminal status
    TimedOut {
        /// Time spent waiting, initial delay included
        waited: Duration,
        /// Last transport error or extraction ambiguity seen, if any
        last_problem: Option<String>,
    },
}

/// Final outcome of one job in a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// At least one artifact was saved
    Completed {
        /// Saved files, in provider order
        paths: Vec<PathBuf>,
        /// Artifacts that could not be saved (`name: reason`)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failed_artifacts: Vec<String>,
    },
    /// Provider refused the creation request
    Rejected {
        /// Provider message
        reason: String,
    },
    /// Submission transport failure, provider-side failure, or no artifact could be saved
    Failed {
        /// What went wrong
        reason: String,
    },
    /// No terminal status within the wait budget
    TimedOut {
        /// Last transport error or extraction ambiguity seen while waiting
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl JobOutcome {
    /// Short lowercase label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::Rejected { .. } => "rejected",
            JobOutcome::Failed { .. } => "failed",
            JobOutcome::TimedOut { .. } => "timed-out",
        }
    }
}

/// Per-job record kept by the orchestrator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    /// Position in the batch (0-based)
    pub index: usize,
    /// Request title
    pub title: String,
    /// Provider handle, when submission succeeded
    pub handle: Option<JobHandle>,
    /// When processing of this job began
    pub started_at: DateTime<Utc>,
    /// When processing of this job ended
    pub finished_at: DateTime<Utc>,
    /// Final outcome
    pub outcome: JobOutcome,
}

/// Aggregate counts over a batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Jobs with at least one saved artifact
    pub completed: usize,
    /// Jobs the provider refused
    pub rejected: usize,
    /// Jobs that failed
    pub failed: usize,
    /// Jobs that ran out of wait budget
    pub timed_out: usize,
}

impl BatchSummary {
    /// Tally a list of outcomes
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a JobOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                JobOutcome::Completed { .. } => summary.completed += 1,
                JobOutcome::Rejected { .. } => summary.rejected += 1,
                JobOutcome::Failed { .. } => summary.failed += 1,
                JobOutcome::TimedOut { .. } => summary.timed_out += 1,
            }
        }
        summary
    }

    /// Total number of jobs tallied
    pub fn total(&self) -> usize {
        self.completed + self.rejected + self.failed + self.timed_out
    }

    /// Whether every job completed
    pub fn all_completed(&self) -> bool {
        self.completed == self.total()
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} completed, {} rejected, {} failed, {} timed out",
            self.completed, self.rejected, self.failed, self.timed_out
        )
    }
}

/// Everything a finished batch produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    /// One record per processed job, in batch order
    pub jobs: Vec<JobReport>,
    /// Aggregate counts
    pub summary: BatchSummary,
}

/// Events emitted while a batch runs
///
/// Consumers subscribe via [`Orchestrator::subscribe`](crate::Orchestrator::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job processing started
    JobStarted {
        /// Position in the batch
        index: usize,
        /// Number of jobs in the batch
        total: usize,
        /// Request title
        title: String,
    },

    /// Provider accepted the job
    Submitted {
        /// Position in the batch
        index: usize,
        /// Provider handle
        handle: JobHandle,
    },

    /// Waiting for the job to finish
    Polling {
        /// Position in the batch
        index: usize,
        /// Provider handle
        handle: JobHandle,
    },

    /// An artifact was written to disk
    ArtifactSaved {
        /// Position in the batch
        index: usize,
        /// Final path
        path: PathBuf,
    },

    /// An artifact could not be saved
    ArtifactFailed {
        /// Position in the batch
        index: usize,
        /// Artifact name
        name: String,
        /// Error message
        error: String,
    },

    /// Job reached its final outcome
    JobFinished {
        /// Position in the batch
        index: usize,
        /// Request title
        title: String,
        /// Final outcome
        outcome: JobOutcome,
    },

    /// Every job has been processed
    BatchFinished {
        /// Aggregate counts
        summary: BatchSummary,
    },
}
