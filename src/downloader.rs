//! Artifact downloading
//!
//! Streams each artifact into a hidden `.part` file next to its destination,
//! syncs it, then links it into place. A crash or a dropped connection
//! therefore never leaves a truncated or empty file under the final name.

use crate::client::{build_http_client, describe_reqwest_error};
use crate::config::{CollisionPolicy, DownloadConfig};
use crate::error::{DownloadError, Error, Result};
use crate::retry::with_retry;
use crate::types::Artifact;
use crate::utils::{partial_path, resolve_destination, validate_file_name};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Name resolutions tried when the destination keeps getting claimed concurrently
const MAX_PERSIST_ATTEMPTS: u32 = 3;

/// Downloads artifacts into the configured output directory
pub struct ArtifactDownloader {
    http: reqwest::Client,
    config: DownloadConfig,
}

impl ArtifactDownloader {
    /// Create a downloader
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;
        Ok(Self { http, config })
    }

    /// Directory artifacts are written to
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Create the output directory if it does not exist yet
    pub async fn prepare_output_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        self.config.output_dir.display(),
                        e
                    ),
                ))
            })
    }

    /// Download one artifact, retrying transient transfer failures
    ///
    /// Returns the final path. The destination honors the configured
    /// [`CollisionPolicy`]; an existing file is never silently replaced.
    pub async fn download(&self, artifact: &Artifact) -> std::result::Result<PathBuf, DownloadError> {
        with_retry(&self.config.retry, || self.download_once(artifact)).await
    }

    async fn download_once(&self, artifact: &Artifact) -> std::result::Result<PathBuf, DownloadError> {
        validate_file_name(&artifact.suggested_name)?;
        let wanted = self.config.output_dir.join(&artifact.suggested_name);
        // Fail fast before spending bandwidth
        resolve_destination(&wanted, self.config.collision)?;

        debug!(url = %artifact.source_url, name = %artifact.suggested_name, "downloading artifact");

        let response = self
            .http
            .get(&artifact.source_url)
            .send()
            .await
            .map_err(|e| transfer_error(&artifact.source_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Http {
                url: artifact.source_url.clone(),
                status: status.as_u16(),
            });
        }
        let expected_len = response.content_length();

        let partial = partial_path(&wanted);
        let written = match write_stream(response, &partial, &artifact.source_url).await {
            Ok(written) => written,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };

        if written == 0 || expected_len.is_some_and(|len| len != written) {
            discard(&partial).await;
            return Err(DownloadError::Transfer {
                url: artifact.source_url.clone(),
                message: format!(
                    "received {} bytes, expected {}",
                    written,
                    expected_len.map_or_else(|| "a non-empty body".to_string(), |l| l.to_string())
                ),
                transient: written != 0,
            });
        }

        let dest = persist(&partial, &wanted, self.config.collision).await?;

        if dest != wanted && self.config.collision == CollisionPolicy::Rename {
            info!(requested = %wanted.display(), path = %dest.display(), "destination existed, saved under new name");
        }
        info!(path = %dest.display(), bytes = written, "artifact saved");
        Ok(dest)
    }
}

async fn write_stream(
    response: reqwest::Response,
    partial: &Path,
    url: &str,
) -> std::result::Result<u64, DownloadError> {
    let io_err = |source| DownloadError::Io {
        path: partial.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transfer_error(url, &e))?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    Ok(written)
}

/// Move a finished partial file to its destination without ever replacing an existing file
///
/// The partial is hard-linked under the final name, which fails if the name is
/// taken, then unlinked. A file that appears after the pre-transfer check is
/// therefore reported as a collision (or skipped under `Rename`) instead of
/// being overwritten. The partial is removed on every path.
async fn persist(
    partial: &Path,
    wanted: &Path,
    policy: CollisionPolicy,
) -> std::result::Result<PathBuf, DownloadError> {
    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        let dest = match resolve_destination(wanted, policy) {
            Ok(dest) => dest,
            Err(e) => break Err(e),
        };
        match tokio::fs::hard_link(partial, &dest).await {
            Ok(()) => break Ok(dest),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if policy == CollisionPolicy::Rename && attempts < MAX_PERSIST_ATTEMPTS {
                    debug!(path = %dest.display(), "destination claimed during transfer, picking another name");
                    continue;
                }
                break Err(DownloadError::Collision { path: dest });
            }
            Err(source) => break Err(DownloadError::Io { path: dest, source }),
        }
    };
    discard(partial).await;
    result
}

async fn discard(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %partial.display(), error = %e, "failed to remove partial file");
    }
}

fn transfer_error(url: &str, e: &reqwest::Error) -> DownloadError {
    DownloadError::Transfer {
        url: url.to_string(),
        message: describe_reqwest_error(e),
        transient: e.is_timeout() || e.is_connect() || e.is_body() || e.is_request(),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(dir: &Path, collision: CollisionPolicy) -> ArtifactDownloader {
        ArtifactDownloader::new(DownloadConfig {
            output_dir: dir.to_path_buf(),
            collision,
            request_timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_attempts: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..Default::default()
        })
        .unwrap()
    }

    fn artifact(url: String, name: &str) -> Artifact {
        Artifact {
            source_url: url,
            suggested_name: name.to_string(),
        }
    }

    fn leftover_parts(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".part"))
            .collect()
    }

    /// Serves a response that promises `declared` bytes but sends `sent`, then hangs up
    async fn truncating_server(declared: usize, sent: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&vec![0xAB; sent]).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/track.mp3", addr)
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 audio bytes".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);
        let saved = dl
            .download(&artifact(format!("{}/a.mp3", server.uri()), "Midnight_Study_1.mp3"))
            .await
            .unwrap();

        assert_eq!(saved, temp.path().join("Midnight_Study_1.mp3"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"ID3 audio bytes");
        assert!(leftover_parts(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_transfer_leaves_no_file() {
        let url = truncating_server(1000, 100).await;
        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);

        let err = dl.download(&artifact(url, "track.mp3")).await.unwrap_err();

        assert!(matches!(err, DownloadError::Transfer { .. }), "{err:?}");
        assert!(!temp.path().join("track.mp3").exists());
        assert!(leftover_parts(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);
        let err = dl
            .download(&artifact(format!("{}/empty.mp3", server.uri()), "empty.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transfer { .. }));
        assert!(!temp.path().join("empty.mp3").exists());
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);
        let err = dl
            .download(&artifact(format!("{}/gone.mp3", server.uri()), "gone.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_transient_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second try".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);
        let saved = dl
            .download(&artifact(format!("{}/flaky.mp3", server.uri()), "flaky.mp3"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), b"second try");
    }

    #[tokio::test]
    async fn test_existing_file_fail_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.mp3"), b"old").unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);

        let err = dl
            .download(&artifact(format!("{}/a.mp3", server.uri()), "a.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Collision { .. }));
        assert_eq!(std::fs::read(temp.path().join("a.mp3")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_existing_file_rename_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.mp3"), b"old").unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Rename);

        let saved = dl
            .download(&artifact(format!("{}/a.mp3", server.uri()), "a.mp3"))
            .await
            .unwrap();
        assert_eq!(saved, temp.path().join("a (1).mp3"));
        assert_eq!(std::fs::read(temp.path().join("a.mp3")).unwrap(), b"old");
        assert_eq!(std::fs::read(saved).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_persist_never_replaces_file_created_during_transfer() {
        let temp = TempDir::new().unwrap();
        let wanted = temp.path().join("Rainy_Window_1.mp3");
        let partial = partial_path(&wanted);
        std::fs::write(&partial, b"new audio").unwrap();
        // Appeared after the pre-transfer check
        std::fs::write(&wanted, b"someone else's file").unwrap();

        let err = persist(&partial, &wanted, CollisionPolicy::Fail)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Collision { ref path } if path == &wanted));
        assert_eq!(std::fs::read(&wanted).unwrap(), b"someone else's file");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn test_persist_moves_partial_into_place() {
        let temp = TempDir::new().unwrap();
        let wanted = temp.path().join("Rainy_Window_1.mp3");
        let partial = partial_path(&wanted);
        std::fs::write(&partial, b"audio").unwrap();
        std::fs::write(&wanted, b"older take").unwrap();

        let dest = persist(&partial, &wanted, CollisionPolicy::Rename)
            .await
            .unwrap();
        assert_eq!(dest, temp.path().join("Rainy_Window_1 (1).mp3"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"audio");
        assert_eq!(std::fs::read(&wanted).unwrap(), b"older take");
        assert!(leftover_parts(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let dl = downloader(temp.path(), CollisionPolicy::Fail);
        let err = dl
            .download(&artifact("http://127.0.0.1:9/x".to_string(), "../escape.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidName { .. }));
    }

    #[tokio::test]
    async fn test_prepare_output_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let dl = downloader(&nested, CollisionPolicy::Fail);
        dl.prepare_output_dir().await.unwrap();
        dl.prepare_output_dir().await.unwrap();
        assert!(nested.is_dir());
    }
}
