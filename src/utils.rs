//! Utility functions for file naming and path resolution

use crate::config::CollisionPolicy;
use crate::error::DownloadError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[allow(clippy::expect_used)]
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));

/// Turn a free-text title into a safe file name stem
///
/// Whitespace runs become `_`, anything outside `[A-Za-z0-9._-]` is dropped,
/// and leading dots are stripped so the result is never hidden or a
/// relative path component.
///
/// # Examples
///
/// ```
/// use lofi_gen::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("Midnight Study"), "Midnight_Study");
/// assert_eq!(sanitize_title("../etc/passwd"), "etcpasswd");
/// assert_eq!(sanitize_title("   "), "untitled");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let underscored = WHITESPACE.replace_all(title.trim(), "_");
    let cleaned = UNSAFE_CHARS.replace_all(&underscored, "");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Deterministic file name for an artifact: `{title}_{id}.{extension}`
///
/// # Examples
///
/// ```
/// use lofi_gen::utils::artifact_file_name;
///
/// assert_eq!(artifact_file_name("Midnight Study", "1", "mp3"), "Midnight_Study_1.mp3");
/// ```
#[must_use]
pub fn artifact_file_name(title: &str, artifact_id: &str, extension: &str) -> String {
    let stem = format!("{}_{}", sanitize_title(title), sanitize_title(artifact_id));
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Check that a suggested name is a single, plain path component
pub fn validate_file_name(name: &str) -> Result<(), DownloadError> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(c)), None) if c == path.as_os_str() => Ok(()),
        _ => Err(DownloadError::InvalidName {
            name: name.to_string(),
        }),
    }
}

/// Get the destination path for a file, honoring the collision policy
///
/// # Arguments
///
/// * `path` - The desired file path
/// * `policy` - How to handle an existing file
///
/// # Returns
///
/// For `Fail`, the original path if it is free, otherwise a collision error.
/// For `Rename`, the first free path among `name.ext`, `name (1).ext`, `name (2).ext`, ...
///
/// # Examples
///
/// ```
/// use lofi_gen::utils::resolve_destination;
/// use lofi_gen::config::CollisionPolicy;
/// use std::path::Path;
///
/// let dir = std::env::temp_dir().join("lofi-gen-doc-missing");
/// let path = dir.join("track.mp3");
/// let resolved = resolve_destination(&path, CollisionPolicy::Rename).unwrap();
/// assert_eq!(resolved, path);
/// ```
pub fn resolve_destination(path: &Path, policy: CollisionPolicy) -> Result<PathBuf, DownloadError> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    match policy {
        CollisionPolicy::Fail => Err(DownloadError::Collision {
            path: path.to_path_buf(),
        }),
        CollisionPolicy::Rename => {
            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                DownloadError::InvalidName {
                    name: path.display().to_string(),
                }
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().unwrap_or_else(|| Path::new("."));

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(DownloadError::Collision {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Hidden sibling path used while an artifact is still being written
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}.{}.part", name, std::process::id()))
}
