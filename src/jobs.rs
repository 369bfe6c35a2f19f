//! Job list loading
//!
//! A job file is JSON: either a bare array of requests or an object with a
//! `jobs` array.
//!
//! ```json
//! [
//!   { "title": "Midnight Study", "prompt": "chill lofi hip hop beat", "tags": "lofi, study" }
//! ]
//! ```

use crate::error::{Error, Result};
use crate::types::GenerationRequest;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum JobFile {
    List(Vec<GenerationRequest>),
    Wrapped { jobs: Vec<GenerationRequest> },
}

/// Parse a job list from JSON text
pub fn parse_jobs(content: &str) -> Result<Vec<GenerationRequest>> {
    let jobs = match serde_json::from_str::<JobFile>(content)? {
        JobFile::List(jobs) | JobFile::Wrapped { jobs } => jobs,
    };

    for (i, job) in jobs.iter().enumerate() {
        if job.title.trim().is_empty() {
            return Err(Error::config(
                format!("jobs[{}].title", i),
                "title must not be empty",
            ));
        }
        if job.prompt.trim().is_empty() {
            return Err(Error::config(
                format!("jobs[{}].prompt", i),
                format!("prompt for '{}' must not be empty", job.title),
            ));
        }
    }
    Ok(jobs)
}

/// Load a job list from a JSON file
pub async fn load_jobs(path: &Path) -> Result<Vec<GenerationRequest>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read job file '{}': {}", path.display(), e),
        ))
    })?;
    parse_jobs(&content)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list() {
        let jobs = parse_jobs(
            r#"[
                {"title": "Midnight Study", "prompt": "chill lofi", "tags": "lofi"},
                {"title": "Coffee Shop", "prompt": "jazzy lofi", "instrumental": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].instrumental);
        assert!(!jobs[1].instrumental);
    }

    #[test]
    fn test_parse_wrapped_list() {
        let jobs = parse_jobs(r#"{"jobs": [{"title": "Rainy Window", "prompt": "rain"}]}"#).unwrap();
        assert_eq!(jobs[0].title, "Rainy Window");
    }

    #[test]
    fn test_parse_rejects_blank_fields() {
        match parse_jobs(r#"[{"title": "ok", "prompt": "fine"}, {"title": " ", "prompt": "x"}]"#) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("jobs[1].title")),
            other => panic!("expected config error, got {other:?}"),
        }
        assert!(parse_jobs(r#"[{"title": "t", "prompt": ""}]"#).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            parse_jobs("{not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_load_jobs_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, r#"[{"title": "Tokyo Nights", "prompt": "koto"}]"#).unwrap();

        let jobs = load_jobs(&path).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(load_jobs(&dir.path().join("missing.json")).await.is_err());
    }
}
