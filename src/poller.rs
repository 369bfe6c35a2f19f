//! Status polling
//!
//! Waits for a submitted job to reach a terminal state. The poller sleeps
//! for an initial delay (freshly created jobs are not queryable right away),
//! then queries at a fixed interval until the extractor reports a terminal
//! status or the wait budget is spent.
//!
//! Failed status queries are not fatal: they count as "still pending" for
//! that cycle. Each query is additionally bounded by the remaining budget, so
//! a stalled connection cannot hold the job past its deadline.

use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::extractor::{ExtractionRules, extract, usable_count};
use crate::provider::{RawState, RawStatus};
use crate::types::{JobHandle, JobStatus, PollOutcome};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Anything that can report the raw status of a job
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Query the current status once
    async fn fetch_status(&self, handle: &JobHandle) -> Result<RawStatus>;
}

/// Drives the poll-until-terminal loop for one job at a time
#[derive(Clone, Debug)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    /// Create a poller with the given timings
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Timings in use
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `handle` until it succeeds, fails, or the wait budget runs out
    ///
    /// The budget (`max_wait`) covers the initial delay as well as every
    /// query and sleep. Once a terminal status is observed it is returned
    /// immediately; a job is never reported as pending again after that.
    pub async fn wait_for_completion<S>(
        &self,
        source: &S,
        handle: &JobHandle,
        rules: &ExtractionRules,
        title: &str,
    ) -> PollOutcome
    where
        S: StatusSource + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.config.max_wait;

        info!(
            job = %handle,
            max_wait_secs = self.config.max_wait.as_secs(),
            "waiting for generation to complete"
        );
        tokio::time::sleep_until((started + self.config.initial_delay).min(deadline)).await;

        let mut attempt: u32 = 0;
        let mut last_problem: Option<Error> = None;

        while Instant::now() < deadline {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            match tokio::time::timeout(remaining, source.fetch_status(handle)).await {
                Ok(Ok(raw)) => match extract(&raw, rules, title) {
                    JobStatus::Succeeded(artifacts) => {
                        info!(
                            job = %handle,
                            attempt,
                            artifacts = artifacts.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "generation completed"
                        );
                        return PollOutcome::Succeeded(artifacts);
                    }
                    JobStatus::Failed(reason) => {
                        warn!(job = %handle, attempt, reason = %reason, "generation failed");
                        return PollOutcome::Failed(reason);
                    }
                    JobStatus::Pending => {
                        if raw.state == RawState::Completed {
                            let ambiguity = Error::ExtractionAmbiguity {
                                usable: usable_count(&raw),
                                required: rules.min_artifacts,
                            };
                            info!(job = %handle, attempt, "{}; still waiting", ambiguity);
                            last_problem = Some(ambiguity);
                        } else {
                            debug!(job = %handle, attempt, "generation in progress");
                        }
                    }
                },
                Ok(Err(e)) => {
                    warn!(job = %handle, attempt, error = %e, "status check failed, will retry");
                    last_problem = Some(e);
                }
                Err(_) => {
                    warn!(job = %handle, attempt, "status check did not answer before the deadline");
                    break;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.config.interval.min(deadline - now)).await;
        }

        let waited = started.elapsed();
        let timeout = Error::Timeout { waited };
        match &last_problem {
            Some(problem) => warn!(job = %handle, attempts = attempt, last_problem = %problem, "{}", timeout),
            None => warn!(job = %handle, attempts = attempt, "{}", timeout),
        }
        PollOutcome::TimedOut {
            waited,
            last_problem: last_problem.map(|e| e.to_string()),
        }
    }
}
