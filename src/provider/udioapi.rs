//! UdioAPI.pro adapter
//!
//! Creation: `POST {base}/v2/generate`, answer `{code, workId, message}`.
//! Status: `GET {base}/v2/feed?workId={id}`, answer
//! `{code, data: {type, response_data: [{id, audio_url, duration}]}}`.

use super::traits::{CreateReply, ProviderAdapter, RawItem, RawState, RawStatus, join_segments};
use super::{id_field, non_empty_str};
use crate::config::{Credential, ProviderKind};
use crate::error::Result;
use crate::types::{GenerationRequest, JobHandle};
use serde_json::{Value, json};
use url::Url;

/// Adapter for UdioAPI.pro
#[derive(Debug, Clone, Copy, Default)]
pub struct UdioApi;

fn code_ok(body: &Value) -> bool {
    match body.get("code") {
        Some(Value::Number(n)) => n.as_u64() == Some(200),
        Some(Value::String(s)) => s == "200",
        _ => false,
    }
}

impl ProviderAdapter for UdioApi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::UdioApi
    }

    fn create_url(&self, base_url: &str) -> Result<Url> {
        join_segments(base_url, &["v2", "generate"])
    }

    fn status_url(&self, base_url: &str, handle: &JobHandle) -> Result<Url> {
        let mut url = join_segments(base_url, &["v2", "feed"])?;
        url.query_pairs_mut().append_pair("workId", handle.as_str());
        Ok(url)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        credential: &Credential,
    ) -> reqwest::RequestBuilder {
        request.bearer_auth(credential.expose())
    }

    fn create_body(&self, request: &GenerationRequest, model: Option<&str>) -> Value {
        let mut body = json!({
            "prompt": request.prompt,
            "title": request.title,
            "tags": request.tags,
            "make_instrumental": request.instrumental,
        });
        if let Some(model) = model {
            body["model"] = Value::String(model.to_string());
        }
        body
    }

    fn parse_create(&self, body: &Value) -> CreateReply {
        if code_ok(body) {
            return match id_field(body, "workId") {
                Some(id) => CreateReply::Accepted(JobHandle::new(id)),
                None => CreateReply::Rejected("response did not include a work id".to_string()),
            };
        }
        CreateReply::Rejected(
            self.rejection_message(body)
                .unwrap_or_else(|| "Unknown error".to_string()),
        )
    }

    fn parse_status(&self, body: &Value) -> RawStatus {
        if !code_ok(body) {
            return RawStatus::bare(RawState::Unavailable);
        }
        let data = body.get("data").unwrap_or(&Value::Null);
        let kind = data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_uppercase();

        match kind.as_str() {
            "SUCCESS" => {
                let items = data
                    .get("response_data")
                    .and_then(Value::as_array)
                    .map(|tracks| {
                        tracks
                            .iter()
                            .map(|track| RawItem {
                                id: id_field(track, "id"),
                                audio_url: non_empty_str(track, "audio_url").map(str::to_string),
                                // Audio URL appears before rendering finishes; duration marks it done
                                ready: track.get("duration").is_some_and(|d| !d.is_null()),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                RawStatus {
                    state: RawState::Completed,
                    items,
                }
            }
            "FAILED" => RawStatus::bare(RawState::Failed(
                non_empty_str(data, "message")
                    .or_else(|| non_empty_str(data, "error"))
                    .unwrap_or("Generation failed")
                    .to_string(),
            )),
            _ => RawStatus::bare(RawState::Running),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_url_uses_query_parameter() {
        let url = UdioApi
            .status_url("https://udioapi.pro/api", &JobHandle::new("w 1"))
            .unwrap();
        assert_eq!(url.as_str(), "https://udioapi.pro/api/v2/feed?workId=w+1");
    }

    #[test]
    fn test_create_body_includes_model() {
        let req = GenerationRequest {
            title: "Rainy Window".to_string(),
            prompt: "melancholic lofi".to_string(),
            tags: "lofi, rain".to_string(),
            instrumental: false,
        };
        let body = UdioApi.create_body(&req, Some("chirp-v4-5"));
        assert_eq!(body["model"], "chirp-v4-5");
        assert_eq!(body["make_instrumental"], false);
        assert!(body.get("custom_mode").is_none());
    }

    #[test]
    fn test_parse_create() {
        assert_eq!(
            UdioApi.parse_create(&json!({"code": 200, "workId": "w-9"})),
            CreateReply::Accepted(JobHandle::new("w-9"))
        );
        assert_eq!(
            UdioApi.parse_create(&json!({"code": 401, "message": "invalid token"})),
            CreateReply::Rejected("invalid token".to_string())
        );
    }

    #[test]
    fn test_parse_status_marks_items_without_duration_unready() {
        let status = UdioApi.parse_status(&json!({
            "code": 200,
            "data": {
                "type": "SUCCESS",
                "response_data": [
                    {"id": "t1", "audio_url": "https://cdn/t1.mp3", "duration": 121.5},
                    {"id": "t2", "audio_url": "https://cdn/t2.mp3", "duration": null},
                    {"id": "t3"}
                ]
            }
        }));
        assert_eq!(status.state, RawState::Completed);
        assert_eq!(status.items.len(), 3);
        assert!(status.items[0].ready);
        assert!(!status.items[1].ready);
        assert_eq!(status.items[2].audio_url, None);
        assert_eq!(status.items[0].id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_parse_status_variants() {
        assert_eq!(
            UdioApi.parse_status(&json!({"code": 500})).state,
            RawState::Unavailable
        );
        assert_eq!(
            UdioApi
                .parse_status(&json!({"code": 200, "data": {"type": "IN_PROGRESS"}}))
                .state,
            RawState::Running
        );
        assert!(matches!(
            UdioApi
                .parse_status(&json!({"code": 200, "data": {"type": "FAILED"}}))
                .state,
            RawState::Failed(_)
        ));
    }
}
