//! Provider adapters
//!
//! Each generation provider speaks its own JSON dialect: different success
//! flags, different nesting, different names for the artifact list. The core
//! pipeline never looks at those payloads. A [`ProviderAdapter`] translates
//! them into the normalized [`CreateReply`] and [`RawStatus`] types, and
//! everything downstream (extraction, polling, downloading) works on those.
//!
//! ## Implementations
//!
//! - [`GoApi`]: GoAPI.ai Udio endpoint, `X-API-Key` header auth
//! - [`UdioApi`]: UdioAPI.pro, bearer token auth
//!
//! ## Usage
//!
//! ```
//! use lofi_gen::config::ProviderKind;
//! use lofi_gen::provider::{adapter_for, RawState};
//! use serde_json::json;
//!
//! let adapter = adapter_for(ProviderKind::GoApi);
//! let status = adapter.parse_status(&json!({
//!     "success": true,
//!     "data": { "status": "processing" }
//! }));
//! assert_eq!(status.state, RawState::Running);
//! ```

mod goapi;
mod traits;
mod udioapi;

pub use goapi::GoApi;
pub use traits::{CreateReply, ProviderAdapter, RawItem, RawState, RawStatus};
pub use udioapi::UdioApi;

use crate::config::ProviderKind;

/// Build the adapter for a provider kind
pub fn adapter_for(kind: ProviderKind) -> Box<dyn ProviderAdapter> {
    match kind {
        ProviderKind::GoApi => Box::new(GoApi),
        ProviderKind::UdioApi => Box::new(UdioApi),
    }
}

/// Read a string field, treating empty strings as missing
pub(crate) fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read an identifier that may be encoded as a string or a number
pub(crate) fn id_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
