//! Traits and normalized types for provider adapters

use crate::config::{Credential, ProviderKind};
use crate::error::Result;
use crate::types::{GenerationRequest, JobHandle};
use serde_json::Value;
use url::Url;

/// Provider answer to a creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateReply {
    /// Job created
    Accepted(JobHandle),
    /// Well-formed refusal carrying the provider's message
    Rejected(String),
}

/// Provider-level job state, before artifact counting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawState {
    /// The status call itself was not successful (provider flag unset)
    Unavailable,
    /// Job exists and is still generating
    Running,
    /// Provider's terminal "done" flag is set
    Completed,
    /// Provider's terminal failure flag is set
    Failed(String),
}

/// One sub-resource listed in a status payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawItem {
    /// Provider identifier for the item, if any
    pub id: Option<String>,
    /// Audio URL, if one has been published yet
    pub audio_url: Option<String>,
    /// Provider-specific readiness beyond having a URL
    pub ready: bool,
}

/// Normalized view of one status payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatus {
    /// Terminal flag state
    pub state: RawState,
    /// Listed sub-resources, in provider order
    pub items: Vec<RawItem>,
}

impl RawStatus {
    /// Status carrying no items
    pub fn bare(state: RawState) -> Self {
        Self {
            state,
            items: Vec::new(),
        }
    }
}

/// Translation layer between one provider's HTTP API and the normalized types
///
/// Adapters are pure: they build URLs and bodies and interpret JSON, but never
/// perform I/O themselves. [`ProviderClient`](crate::client::ProviderClient)
/// owns the HTTP exchange.
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter speaks to
    fn kind(&self) -> ProviderKind;

    /// Creation endpoint
    fn create_url(&self, base_url: &str) -> Result<Url>;

    /// Status endpoint for one job
    fn status_url(&self, base_url: &str, handle: &JobHandle) -> Result<Url>;

    /// Attach the provider's authentication header
    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        credential: &Credential,
    ) -> reqwest::RequestBuilder;

    /// JSON body for a creation request
    fn create_body(&self, request: &GenerationRequest, model: Option<&str>) -> Value;

    /// Interpret a 2xx creation response
    fn parse_create(&self, body: &Value) -> CreateReply;

    /// Interpret a 2xx status response
    fn parse_status(&self, body: &Value) -> RawStatus;

    /// Message from a structured error body, if the body has one
    ///
    /// Used for non-2xx creation responses: a JSON body with a message is a
    /// rejection, anything else is a transport failure.
    fn rejection_message(&self, body: &Value) -> Option<String> {
        ["message", "error", "detail", "msg"].iter().find_map(|key| {
            match body.get(*key)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(inner) => inner
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                _ => None,
            }
        })
    }
}

pub(crate) fn parse_base(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| {
        crate::Error::config(
            "provider.base_url",
            format!("'{}' is not a valid URL: {}", base_url, e),
        )
    })
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn join_segments(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = parse_base(base_url)?;
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            crate::Error::config(
                "provider.base_url",
                format!("'{}' cannot be used as a base URL", base_url),
            )
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GoApi;
    use serde_json::json;

    #[test]
    fn test_join_segments_encodes_and_trims() {
        let url = join_segments("https://api.example.com/api/v1/", &["tasks", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/tasks/a%20b%2Fc");
    }

    #[test]
    fn test_join_segments_rejects_non_base_url() {
        assert!(join_segments("mailto:someone@example.com", &["x"]).is_err());
    }

    #[test]
    fn test_default_rejection_message_lookup() {
        let adapter = GoApi;
        assert_eq!(
            adapter.rejection_message(&json!({"message": "invalid api key"})),
            Some("invalid api key".to_string())
        );
        assert_eq!(
            adapter.rejection_message(&json!({"error": {"message": "quota exceeded"}})),
            Some("quota exceeded".to_string())
        );
        assert_eq!(adapter.rejection_message(&json!({"status": 500})), None);
    }
}
