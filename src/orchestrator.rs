//! Batch orchestration
//!
//! Runs jobs one at a time: submit, poll, extract, download every artifact.
//! Whatever happens to one job is recorded as its [`JobOutcome`] and the
//! batch moves on; nothing short of an unusable output directory aborts it.

use crate::client::ProviderClient;
use crate::config::{BatchConfig, Config, Credential};
use crate::downloader::ArtifactDownloader;
use crate::error::{Result, SubmitError};
use crate::poller::StatusPoller;
use crate::types::{
    Artifact, BatchReport, BatchSummary, Event, GenerationRequest, JobOutcome, JobReport,
    PollOutcome,
};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Capacity of the event channel; slow subscribers lag rather than block the batch
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Drives a batch of generation requests through the full pipeline
pub struct Orchestrator {
    client: ProviderClient,
    poller: StatusPoller,
    downloader: ArtifactDownloader,
    batch: BatchConfig,
    event_tx: broadcast::Sender<Event>,
}

impl Orchestrator {
    /// Assemble an orchestrator from its parts
    pub fn new(
        client: ProviderClient,
        poller: StatusPoller,
        downloader: ArtifactDownloader,
        batch: BatchConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            poller,
            downloader,
            batch,
            event_tx,
        }
    }

    /// Build every component from a validated configuration
    pub fn from_config(config: &Config, credential: Credential) -> Result<Self> {
        config.validate()?;
        let client = ProviderClient::new(&config.provider, credential, &config.download.extension)?;
        let poller = StatusPoller::new(config.poll.clone());
        let downloader = ArtifactDownloader::new(config.download.clone())?;
        Ok(Self::new(client, poller, downloader, config.batch.clone()))
    }

    /// Subscribe to batch events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Process every request in order and report per-job outcomes
    ///
    /// # Errors
    ///
    /// Only fails when the output directory cannot be created; individual job
    /// failures are reported in the returned [`BatchReport`].
    pub async fn run_batch(&self, requests: &[GenerationRequest]) -> Result<BatchReport> {
        self.downloader.prepare_output_dir().await?;

        let selected = match self.batch.limit {
            Some(limit) => &requests[..limit.min(requests.len())],
            None => requests,
        };
        let total = selected.len();
        info!(
            provider = %self.client.kind(),
            jobs = total,
            output_dir = %self.downloader.output_dir().display(),
            "starting batch"
        );

        let mut jobs = Vec::with_capacity(total);
        for (index, request) in selected.iter().enumerate() {
            jobs.push(self.run_job(index, total, request).await);

            if index + 1 < total && !self.batch.inter_job_pause.is_zero() {
                info!(
                    pause_secs = self.batch.inter_job_pause.as_secs_f64(),
                    "pausing before next generation"
                );
                tokio::time::sleep(self.batch.inter_job_pause).await;
            }
        }

        let summary = BatchSummary::from_outcomes(jobs.iter().map(|j| &j.outcome));
        info!(%summary, "batch finished");
        self.emit(Event::BatchFinished {
            summary: summary.clone(),
        });
        Ok(BatchReport { jobs, summary })
    }

    /// Run one job end to end
    pub async fn run_job(&self, index: usize, total: usize, request: &GenerationRequest) -> JobReport {
        let started_at = Utc::now();
        self.emit(Event::JobStarted {
            index,
            total,
            title: request.title.clone(),
        });

        let (handle, outcome) = match self.client.submit(request).await {
            Err(SubmitError::Rejected { message }) => (None, JobOutcome::Rejected { reason: message }),
            Err(e @ SubmitError::Transport { .. }) => {
                error!(title = %request.title, error = %e, "submission failed");
                (
                    None,
                    JobOutcome::Failed {
                        reason: format!("submission failed: {}", e),
                    },
                )
            }
            Ok(handle) => {
                self.emit(Event::Submitted {
                    index,
                    handle: handle.clone(),
                });
                self.emit(Event::Polling {
                    index,
                    handle: handle.clone(),
                });

                let polled = self
                    .poller
                    .wait_for_completion(&self.client, &handle, self.client.rules(), &request.title)
                    .await;

                let outcome = match polled {
                    PollOutcome::Succeeded(artifacts) => self.download_all(index, &artifacts).await,
                    PollOutcome::Failed(reason) => JobOutcome::Failed {
                        reason: format!("generation failed: {}", reason),
                    },
                    PollOutcome::TimedOut { last_problem, .. } => JobOutcome::TimedOut {
                        reason: last_problem,
                    },
                };
                (Some(handle), outcome)
            }
        };

        info!(
            job = index + 1,
            total,
            title = %request.title,
            outcome = outcome.label(),
            "job finished"
        );
        self.emit(Event::JobFinished {
            index,
            title: request.title.clone(),
            outcome: outcome.clone(),
        });

        JobReport {
            index,
            title: request.title.clone(),
            handle,
            started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    /// Download artifacts in provider order; one failure does not stop the rest
    async fn download_all(&self, index: usize, artifacts: &[Artifact]) -> JobOutcome {
        info!(count = artifacts.len(), "downloading artifacts");

        let mut paths = Vec::with_capacity(artifacts.len());
        let mut failed_artifacts = Vec::new();

        for artifact in artifacts {
            match self.downloader.download(artifact).await {
                Ok(path) => {
                    self.emit(Event::ArtifactSaved {
                        index,
                        path: path.clone(),
                    });
                    paths.push(path);
                }
                Err(e) => {
                    warn!(name = %artifact.suggested_name, error = %e, "artifact download failed");
                    self.emit(Event::ArtifactFailed {
                        index,
                        name: artifact.suggested_name.clone(),
                        error: e.to_string(),
                    });
                    failed_artifacts.push(format!("{}: {}", artifact.suggested_name, e));
                }
            }
        }

        if paths.is_empty() {
            JobOutcome::Failed {
                reason: format!(
                    "no artifact could be saved ({})",
                    failed_artifacts.join("; ")
                ),
            }
        } else {
            JobOutcome::Completed {
                paths,
                failed_artifacts,
            }
        }
    }
}
