//! Common test utilities for lofi-gen integration tests
//!
//! Everything talks to a local wiremock server; timings are shrunk to
//! milliseconds so a full batch finishes in well under a second.

#![allow(dead_code)]

use lofi_gen::config::{BatchConfig, DownloadConfig, RetryConfig};
use lofi_gen::{
    Config, Credential, GenerationRequest, Orchestrator, PollConfig, ProviderConfig, ProviderKind,
};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration pointing at `server` with fast polling and no real pauses
pub fn fast_config(kind: ProviderKind, server: &MockServer, output_dir: &Path) -> Config {
    Config {
        provider: ProviderConfig {
            base_url: Some(server.uri()),
            request_timeout: Duration::from_secs(5),
            ..ProviderConfig::for_kind(kind)
        },
        poll: PollConfig {
            initial_delay: Duration::from_millis(10),
            interval: Duration::from_millis(25),
            max_wait: Duration::from_secs(3),
        },
        download: DownloadConfig {
            output_dir: output_dir.to_path_buf(),
            request_timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..DownloadConfig::default()
        },
        batch: BatchConfig {
            inter_job_pause: Duration::from_millis(5),
            limit: None,
        },
    }
}

/// Orchestrator built from `config` with a dummy key
pub fn orchestrator(config: &Config) -> Orchestrator {
    Orchestrator::from_config(config, Credential::new("test-key"))
        .expect("test configuration should be valid")
}

/// A lofi generation request
pub fn request(title: &str) -> GenerationRequest {
    GenerationRequest {
        title: title.to_string(),
        prompt: format!("chill lofi hip hop beat for {}", title.to_lowercase()),
        tags: "lofi, chill".to_string(),
        instrumental: true,
    }
}

/// Serve `bytes` of audio at `route`
pub async fn mount_audio(server: &MockServer, route: &str, bytes: usize) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(vec![0xAAu8; bytes]),
        )
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// UdioAPI payloads
// ---------------------------------------------------------------------------

/// `/v2/generate` answer accepting the job
pub fn udio_created(work_id: &str) -> Value {
    json!({ "code": 200, "workId": work_id, "message": "success" })
}

/// `/v2/feed` answer for a job that is still rendering
pub fn udio_running() -> Value {
    json!({ "code": 200, "data": { "type": "IN_PROGRESS", "response_data": [] } })
}

/// `/v2/feed` answer listing finished tracks as `(id, audio url)`
pub fn udio_success(tracks: &[(&str, String)]) -> Value {
    let response_data: Vec<Value> = tracks
        .iter()
        .map(|(id, url)| json!({ "id": id, "audio_url": url, "duration": 142.5 }))
        .collect();
    json!({ "code": 200, "data": { "type": "SUCCESS", "response_data": response_data } })
}

/// Answer `/v2/feed?workId={work_id}` with `running` `pending_polls` times, then `done`
pub async fn mount_udio_feed(server: &MockServer, work_id: &str, pending_polls: u64, done: Value) {
    if pending_polls > 0 {
        Mock::given(method("GET"))
            .and(path("/v2/feed"))
            .and(query_param("workId", work_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(udio_running()))
            .up_to_n_times(pending_polls)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/v2/feed"))
        .and(query_param("workId", work_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(done))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// GoAPI payloads
// ---------------------------------------------------------------------------

/// `/music-generation` answer accepting the job
pub fn goapi_created(task_id: &str) -> Value {
    json!({ "success": true, "data": { "task_id": task_id } })
}

/// `/tasks/{id}` answer for a completed task
pub fn goapi_completed(audio_urls: &[String]) -> Value {
    json!({
        "success": true,
        "data": { "status": "completed", "output": { "audio_urls": audio_urls } }
    })
}

/// `/tasks/{id}` answer for a task the provider gave up on
pub fn goapi_failed(reason: &str) -> Value {
    json!({ "success": true, "data": { "status": "failed", "error": reason } })
}

/// `/tasks/{id}` answer for a task still in the queue
pub fn goapi_processing() -> Value {
    json!({ "success": true, "data": { "status": "processing" } })
}

/// Accept the job titled `title` as `task_id`, report it completed, and serve its one track
pub async fn mount_goapi_job(server: &MockServer, title: &str, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/music-generation"))
        .and(body_partial_json(json!({ "title": title })))
        .respond_with(ResponseTemplate::new(200).set_body_json(goapi_created(task_id)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{}", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(goapi_completed(&[format!(
            "{}/audio/{}.mp3",
            server.uri(),
            task_id
        )])))
        .mount(server)
        .await;
    mount_audio(server, &format!("/audio/{}.mp3", task_id), 1024).await;
}
