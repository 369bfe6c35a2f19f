//! Configuration types for lofi-gen
//!
//! Every field has a default, so an empty JSON object is a valid configuration.
//! Durations are serialized as whole seconds. Credentials never live in the
//! configuration itself: [`ProviderConfig::api_key_env`] names the environment
//! variable the key is read from.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supported generation providers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GoAPI.ai Udio endpoint (`X-API-Key` auth)
    #[default]
    GoApi,
    /// UdioAPI.pro (bearer auth)
    UdioApi,
}

impl ProviderKind {
    /// Default API base URL for this provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::GoApi => "https://api.goapi.ai/api/udio/v1",
            ProviderKind::UdioApi => "https://udioapi.pro/api",
        }
    }

    /// Default environment variable holding the API key
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::GoApi => "GOAPI_API_KEY",
            ProviderKind::UdioApi => "UDIOAPI_API_KEY",
        }
    }

    /// Number of usable artifacts a job normally produces
    pub fn default_min_artifacts(&self) -> usize {
        match self {
            ProviderKind::GoApi => 1,
            // Udio generates two variations per request
            ProviderKind::UdioApi => 2,
        }
    }

    /// Default model identifier sent with creation requests
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::GoApi => None,
            ProviderKind::UdioApi => Some("chirp-v4-5"),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::GoApi => write!(f, "goapi"),
            ProviderKind::UdioApi => write!(f, "udioapi"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "goapi" => Ok(ProviderKind::GoApi),
            "udioapi" | "udio" => Ok(ProviderKind::UdioApi),
            other => Err(Error::config(
                "provider.kind",
                format!("unknown provider '{}' (expected goapi or udioapi)", other),
            )),
        }
    }
}

/// What to do when the provider says "done" but too few usable artifacts exist
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompletePolicy {
    /// Keep polling until the minimum is met or the wait budget runs out (default)
    #[default]
    WaitForMinimum,
    /// Accept whatever usable artifacts exist (at least one)
    AcceptPartial,
}

/// How to handle an existing file at an artifact's destination
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Refuse to write and report a download failure (default)
    #[default]
    Fail,
    /// Append " (1)", " (2)", ... before the extension
    Rename,
}

/// Provider endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider adapter to use
    #[serde(default)]
    pub kind: ProviderKind,

    /// API base URL (None = provider default)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model identifier (None = provider default)
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable holding the API key (None = provider default)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Usable artifacts required before a job counts as succeeded (None = provider default)
    #[serde(default)]
    pub min_artifacts: Option<usize>,

    /// Handling of "completed" responses with too few usable artifacts
    #[serde(default)]
    pub incomplete_policy: IncompletePolicy,

    /// Bound on every creation and status request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: None,
            model: None,
            api_key_env: None,
            min_artifacts: None,
            incomplete_policy: IncompletePolicy::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Configuration for `kind` with every other field at its default
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Point this configuration at another provider
    ///
    /// Settings that only make sense for one provider (base URL, model,
    /// credential variable, minimum artifact count) go back to the new
    /// provider's defaults. The request timeout and incomplete policy are kept.
    /// Switching to the current kind changes nothing.
    pub fn switch_kind(&mut self, kind: ProviderKind) {
        if kind == self.kind {
            return;
        }
        *self = Self {
            incomplete_policy: self.incomplete_policy,
            request_timeout: self.request_timeout,
            ..Self::for_kind(kind)
        };
    }

    /// Effective base URL, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }

    /// Effective model identifier
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().or_else(|| self.kind.default_model())
    }

    /// Effective environment variable name for the API key
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    /// Effective minimum artifact count
    pub fn min_artifacts(&self) -> usize {
        self.min_artifacts
            .unwrap_or_else(|| self.kind.default_min_artifacts())
    }

    /// Read the API key from the configured environment variable
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the variable when it is unset or empty.
    pub fn resolve_credential(&self) -> Result<Credential> {
        let var = self.api_key_env();
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Credential::new(value.trim())),
            _ => Err(Error::config(
                "provider.api_key_env",
                format!("environment variable {} is not set", var),
            )),
        }
    }
}

/// API credential loaded from the environment
///
/// Never printed: `Debug` and `Display` show a redacted placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret value, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Status polling timings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the first status query (default: 10 seconds)
    ///
    /// Providers need a moment before a freshly created job is queryable.
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Delay between status queries (default: 30 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Total wait budget per job, initial delay included (default: 300 seconds)
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            interval: default_poll_interval(),
            max_wait: default_max_wait(),
        }
    }
}

/// Artifact download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (default: "./generated")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Existing-file handling
    #[serde(default)]
    pub collision: CollisionPolicy,

    /// File extension for saved artifacts (default: "mp3")
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Bound on a single artifact transfer (default: 300 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Retry behavior for transient transfer failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            collision: CollisionPolicy::default(),
            extension: default_extension(),
            request_timeout: default_download_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_retry_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_retry_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_retry_initial_delay(),
            max_delay: default_retry_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Batch processing settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause between consecutive jobs (default: 10 seconds)
    #[serde(default = "default_inter_job_pause", with = "duration_serde")]
    pub inter_job_pause: Duration,

    /// Only process the first N jobs (None = all)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_job_pause: default_inter_job_pause(),
            limit: None,
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider endpoint and extraction rules
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Polling timings
    #[serde(default)]
    pub poll: PollConfig,

    /// Artifact download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Batch settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// The result is validated before being returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would make polling or extraction meaningless
    pub fn validate(&self) -> Result<()> {
        let base = self.provider.base_url();
        if base.is_empty() {
            return Err(Error::config("provider.base_url", "must not be empty"));
        }
        url::Url::parse(base).map_err(|e| {
            Error::config(
                "provider.base_url",
                format!("'{}' is not a valid URL: {}", base, e),
            )
        })?;
        if self.provider.min_artifacts() == 0 {
            return Err(Error::config(
                "provider.min_artifacts",
                "must be at least 1",
            ));
        }
        if self.provider.request_timeout.is_zero() {
            return Err(Error::config(
                "provider.request_timeout",
                "must be greater than zero",
            ));
        }
        if self.poll.interval.is_zero() {
            return Err(Error::config("poll.interval", "must be greater than zero"));
        }
        if self.poll.max_wait.is_zero() {
            return Err(Error::config("poll.max_wait", "must be greater than zero"));
        }
        if self.download.extension.contains(['/', '\\']) {
            return Err(Error::config(
                "download.extension",
                "must not contain path separators",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./generated")
}

fn default_extension() -> String {
    "mp3".to_string()
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_inter_job_pause() -> Duration {
    Duration::from_secs(10)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
