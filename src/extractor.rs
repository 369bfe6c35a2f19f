//! Result extraction
//!
//! Decides, from one normalized status payload, whether a job is still
//! pending, has failed, or has produced enough artifacts to stop polling.

use crate::config::IncompletePolicy;
use crate::provider::{RawState, RawStatus};
use crate::types::{Artifact, JobStatus};
use crate::utils::artifact_file_name;

/// Rules applied when turning a status payload into a [`JobStatus`]
#[derive(Clone, Debug)]
pub struct ExtractionRules {
    /// Usable artifacts required for success
    pub min_artifacts: usize,
    /// Handling of a terminal flag with too few usable artifacts
    pub incomplete_policy: IncompletePolicy,
    /// Extension for suggested file names
    pub extension: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            min_artifacts: 1,
            incomplete_policy: IncompletePolicy::default(),
            extension: "mp3".to_string(),
        }
    }
}

/// Number of listed sub-resources that are ready and carry a source URL
pub fn usable_count(status: &RawStatus) -> usize {
    status
        .items
        .iter()
        .filter(|item| item.ready && item.audio_url.is_some())
        .count()
}

/// Translate a normalized status into a [`JobStatus`]
///
/// Sub-resources without a source URL, or not yet ready, are filtered out.
/// Artifacts keep the provider's order and are named
/// `{title}_{provider id or 1-based position}.{extension}`, where the
/// position counts listed sub-resources, usable or not.
///
/// When the terminal flag is set but fewer than `min_artifacts` usable
/// sub-resources exist, the result is `Pending` under
/// [`IncompletePolicy::WaitForMinimum`], and `Succeeded` with the partial list
/// under [`IncompletePolicy::AcceptPartial`] as long as at least one is usable.
pub fn extract(status: &RawStatus, rules: &ExtractionRules, title: &str) -> JobStatus {
    match &status.state {
        RawState::Unavailable | RawState::Running => JobStatus::Pending,
        RawState::Failed(reason) => JobStatus::Failed(reason.clone()),
        RawState::Completed => {
            let artifacts: Vec<Artifact> = status
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.ready)
                .filter_map(|(position, item)| {
                    let url = item.audio_url.as_deref()?;
                    let id = item
                        .id
                        .clone()
                        .unwrap_or_else(|| (position + 1).to_string());
                    Some(Artifact {
                        source_url: url.to_string(),
                        suggested_name: artifact_file_name(title, &id, &rules.extension),
                    })
                })
                .collect();

            if artifacts.len() >= rules.min_artifacts {
                return JobStatus::Succeeded(artifacts);
            }

            match rules.incomplete_policy {
                IncompletePolicy::AcceptPartial if !artifacts.is_empty() => {
                    tracing::warn!(
                        usable = artifacts.len(),
                        required = rules.min_artifacts,
                        "accepting partial results"
                    );
                    JobStatus::Succeeded(artifacts)
                }
                _ => {
                    tracing::debug!(
                        usable = artifacts.len(),
                        required = rules.min_artifacts,
                        "provider reports completion but artifacts are not ready yet"
                    );
                    JobStatus::Pending
                }
            }
        }
    }
}
