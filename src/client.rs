//! HTTP client for a generation provider
//!
//! [`ProviderClient`] owns the `reqwest` client, the endpoint configuration and
//! the provider adapter. It performs exactly one HTTP exchange per call and
//! never retries; waiting is the poller's job.

use crate::config::{Credential, ProviderConfig, ProviderKind};
use crate::error::{Error, Result, SubmitError};
use crate::extractor::ExtractionRules;
use crate::poller::StatusSource;
use crate::provider::{CreateReply, ProviderAdapter, RawStatus, adapter_for};
use crate::types::{GenerationRequest, JobHandle};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// User-Agent sent with every provider request
pub const USER_AGENT: &str = concat!("lofi-gen/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in transport errors
const MAX_ERROR_BODY: usize = 2048;

/// Client for one provider endpoint
pub struct ProviderClient {
    http: reqwest::Client,
    adapter: Box<dyn ProviderAdapter>,
    base_url: String,
    model: Option<String>,
    credential: Credential,
    rules: ExtractionRules,
}

impl ProviderClient {
    /// Build a client from provider configuration and a resolved credential
    ///
    /// Every request made by this client is bounded by `config.request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ProviderConfig, credential: Credential, extension: &str) -> Result<Self> {
        Self::with_adapter(config, adapter_for(config.kind), credential, extension)
    }

    /// Build a client around a specific adapter
    pub fn with_adapter(
        config: &ProviderConfig,
        adapter: Box<dyn ProviderAdapter>,
        credential: Credential,
        extension: &str,
    ) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;
        Ok(Self {
            http,
            adapter,
            base_url: config.base_url().to_string(),
            model: config.model().map(str::to_string),
            credential,
            rules: ExtractionRules {
                min_artifacts: config.min_artifacts(),
                incomplete_policy: config.incomplete_policy,
                extension: extension.to_string(),
            },
        })
    }

    /// Which provider this client talks to
    pub fn kind(&self) -> ProviderKind {
        self.adapter.kind()
    }

    /// Extraction rules applied to status responses
    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// Issue one creation call
    ///
    /// A 2xx answer is interpreted by the adapter and may still be a
    /// rejection. A 4xx answer whose body is JSON with a provider message is
    /// also a rejection. Every other non-2xx answer (5xx included, whatever
    /// its body) and any network failure is a transport failure.
    pub async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<JobHandle, SubmitError> {
        let url = self
            .adapter
            .create_url(&self.base_url)
            .map_err(|e| SubmitError::Transport {
                status: None,
                body: None,
                message: e.to_string(),
            })?;
        let body = self.adapter.create_body(request, self.model.as_deref());

        info!(
            provider = %self.kind(),
            title = %request.title,
            model = self.model.as_deref().unwrap_or("default"),
            "submitting generation request"
        );

        let builder = self.http.post(url).json(&body);
        let response = self
            .adapter
            .authorize(builder, &self.credential)
            .send()
            .await
            .map_err(|e| SubmitError::Transport {
                status: None,
                body: None,
                message: describe_reqwest_error(&e),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SubmitError::Transport {
            status: Some(status.as_u16()),
            body: None,
            message: format!("failed to read response body: {}", e),
        })?;
        let parsed: Option<serde_json::Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            if status.is_client_error()
                && let Some(message) = parsed
                    .as_ref()
                    .and_then(|json| self.adapter.rejection_message(json))
            {
                warn!(status = status.as_u16(), message = %message, "provider rejected request");
                return Err(SubmitError::Rejected { message });
            }
            return Err(SubmitError::Transport {
                status: Some(status.as_u16()),
                body: Some(truncate_body(&text)),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let Some(json) = parsed else {
            return Err(SubmitError::Transport {
                status: Some(status.as_u16()),
                body: Some(truncate_body(&text)),
                message: "response body is not valid JSON".to_string(),
            });
        };

        match self.adapter.parse_create(&json) {
            CreateReply::Accepted(handle) => {
                info!(job = %handle, "job created");
                Ok(handle)
            }
            CreateReply::Rejected(message) => {
                warn!(message = %message, "provider rejected request");
                Err(SubmitError::Rejected { message })
            }
        }
    }

    /// Query the provider once and normalize the answer
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] for network failures, non-2xx statuses and
    /// bodies that are not JSON.
    pub async fn query_status(&self, handle: &JobHandle) -> Result<RawStatus> {
        let url = self.adapter.status_url(&self.base_url, handle)?;
        let response = self
            .adapter
            .authorize(self.http.get(url), &self.credential)
            .send()
            .await
            .map_err(|e| Error::Transport {
                status: None,
                body: None,
                message: describe_reqwest_error(&e),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Transport {
            status: Some(status.as_u16()),
            body: None,
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Error::Transport {
                status: Some(status.as_u16()),
                body: Some(truncate_body(&text)),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| Error::Transport {
            status: Some(status.as_u16()),
            body: Some(truncate_body(&text)),
            message: format!("response body is not valid JSON: {}", e),
        })?;
        let raw = self.adapter.parse_status(&json);
        debug!(job = %handle, state = ?raw.state, items = raw.items.len(), "status received");
        Ok(raw)
    }
}

#[async_trait]
impl StatusSource for ProviderClient {
    async fn fetch_status(&self, handle: &JobHandle) -> Result<RawStatus> {
        self.query_status(handle).await
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Transport {
            status: None,
            body: None,
            message: format!("Failed to create HTTP client: {}", e),
        })
}

pub(crate) fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

fn truncate_body(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
