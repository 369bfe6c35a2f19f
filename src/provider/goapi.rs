//! GoAPI.ai adapter
//!
//! Creation: `POST {base}/music-generation`, answer `{success, data: {task_id}, message}`.
//! Status: `GET {base}/tasks/{id}`, answer
//! `{success, data: {status, output: {audio_urls: [..]}, error}}`.

use super::traits::{CreateReply, ProviderAdapter, RawItem, RawState, RawStatus, join_segments};
use super::non_empty_str;
use crate::config::{Credential, ProviderKind};
use crate::error::Result;
use crate::types::{GenerationRequest, JobHandle};
use serde_json::{Value, json};
use url::Url;

/// Adapter for the GoAPI.ai Udio endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct GoApi;

impl ProviderAdapter for GoApi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoApi
    }

    fn create_url(&self, base_url: &str) -> Result<Url> {
        join_segments(base_url, &["music-generation"])
    }

    fn status_url(&self, base_url: &str, handle: &JobHandle) -> Result<Url> {
        join_segments(base_url, &["tasks", handle.as_str()])
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        credential: &Credential,
    ) -> reqwest::RequestBuilder {
        request.header("X-API-Key", credential.expose())
    }

    fn create_body(&self, request: &GenerationRequest, model: Option<&str>) -> Value {
        let mut body = json!({
            "custom_mode": true,
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
        if body.get("success").and_then(Value::as_bool) == Some(true) {
            return match body.get("data").and_then(|d| super::id_field(d, "task_id")) {
                Some(id) => CreateReply::Accepted(JobHandle::new(id)),
                None => CreateReply::Rejected("response did not include a task id".to_string()),
            };
        }
        CreateReply::Rejected(
            self.rejection_message(body)
                .unwrap_or_else(|| "Unknown error".to_string()),
        )
    }

    fn parse_status(&self, body: &Value) -> RawStatus {
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return RawStatus::bare(RawState::Unavailable);
        }
        let data = body.get("data").unwrap_or(&Value::Null);
        let status = data
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();

        match status.as_str() {
            "completed" => {
                let items = data
                    .get("output")
                    .and_then(|o| o.get("audio_urls"))
                    .and_then(Value::as_array)
                    .map(|urls| {
                        urls.iter()
                            .map(|u| RawItem {
                                id: None,
                                audio_url: u
                                    .as_str()
                                    .map(str::trim)
                                    .filter(|s| !s.is_empty())
                                    .map(str::to_string),
                                ready: true,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                RawStatus {
                    state: RawState::Completed,
                    items,
                }
            }
            "failed" => RawStatus::bare(RawState::Failed(
                non_empty_str(data, "error")
                    .unwrap_or("Unknown error")
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

    fn request() -> GenerationRequest {
        GenerationRequest {
            title: "Coffee Shop".to_string(),
            prompt: "warm jazzy lofi beat".to_string(),
            tags: "lofi, jazz".to_string(),
            instrumental: true,
        }
    }

    #[test]
    fn test_urls() {
        let adapter = GoApi;
        let base = "https://api.goapi.ai/api/udio/v1";
        assert_eq!(
            adapter.create_url(base).unwrap().as_str(),
            "https://api.goapi.ai/api/udio/v1/music-generation"
        );
        assert_eq!(
            adapter
                .status_url(base, &JobHandle::new("task-42"))
                .unwrap()
                .as_str(),
            "https://api.goapi.ai/api/udio/v1/tasks/task-42"
        );
    }

    #[test]
    fn test_create_body() {
        let body = GoApi.create_body(&request(), None);
        assert_eq!(body["custom_mode"], true);
        assert_eq!(body["title"], "Coffee Shop");
        assert_eq!(body["make_instrumental"], true);
        assert!(body.get("model").is_none());

        let body = GoApi.create_body(&request(), Some("udio-130"));
        assert_eq!(body["model"], "udio-130");
    }

    #[test]
    fn test_parse_create() {
        assert_eq!(
            GoApi.parse_create(&json!({"success": true, "data": {"task_id": "abc"}})),
            CreateReply::Accepted(JobHandle::new("abc"))
        );
        assert_eq!(
            GoApi.parse_create(&json!({"success": false, "message": "insufficient quota"})),
            CreateReply::Rejected("insufficient quota".to_string())
        );
        assert!(matches!(
            GoApi.parse_create(&json!({"success": true, "data": {}})),
            CreateReply::Rejected(_)
        ));
    }

    #[test]
    fn test_parse_status_completed_keeps_order_and_blank_urls() {
        let status = GoApi.parse_status(&json!({
            "success": true,
            "data": {
                "status": "completed",
                "output": { "audio_urls": ["https://cdn/a.mp3", "", "https://cdn/b.mp3"] }
            }
        }));
        assert_eq!(status.state, RawState::Completed);
        assert_eq!(status.items.len(), 3);
        assert_eq!(status.items[0].audio_url.as_deref(), Some("https://cdn/a.mp3"));
        assert_eq!(status.items[1].audio_url, None);
        assert_eq!(status.items[2].audio_url.as_deref(), Some("https://cdn/b.mp3"));
    }

    #[test]
    fn test_parse_status_variants() {
        assert_eq!(
            GoApi.parse_status(&json!({"success": false})).state,
            RawState::Unavailable
        );
        assert_eq!(
            GoApi
                .parse_status(&json!({"success": true, "data": {"status": "pending"}}))
                .state,
            RawState::Running
        );
        assert_eq!(
            GoApi
                .parse_status(&json!({"success": true, "data": {"status": "failed", "error": "content policy"}}))
                .state,
            RawState::Failed("content policy".to_string())
        );
    }
}
