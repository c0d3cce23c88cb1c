//! Artifact fetching for model descriptors, weight files and label tables

use crate::error::GestureError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single fetched artifact
pub const MAX_ARTIFACT_SIZE: usize = 2_000_000_000;

/// Source of raw artifact bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Bytes, GestureError>;
}

pub(crate) fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolve `path` relative to the artifact at `base`.
///
/// Absolute URLs and absolute paths are returned unchanged.
pub fn resolve_relative(base: &str, path: &str) -> Result<String, GestureError> {
    if is_remote(path) || Path::new(path).is_absolute() {
        return Ok(path.to_string());
    }

    if is_remote(base) {
        let base_url = reqwest::Url::parse(base)
            .map_err(|e| GestureError::ModelLoad(format!("Invalid artifact URL {}: {}", base, e)))?;
        let joined = base_url
            .join(path)
            .map_err(|e| GestureError::ModelLoad(format!("Cannot resolve {} against {}: {}", path, base, e)))?;
        return Ok(joined.to_string());
    }

    let resolved = match Path::new(base).parent() {
        Some(parent) => parent.join(path),
        None => Path::new(path).to_path_buf(),
    };
    Ok(resolved.to_string_lossy().into_owned())
}

fn check_size(location: &str, len: u64, max_size: usize) -> Result<(), GestureError> {
    if len > max_size as u64 {
        return Err(GestureError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Artifact {} too large: {} bytes (max {} bytes)", location, len, max_size),
        )));
    }
    Ok(())
}

/// Fetches artifacts over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::Client,
    max_size: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, GestureError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            max_size: MAX_ARTIFACT_SIZE,
        })
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes, GestureError> {
        debug!("Fetching {}", location);
        let response = self.client.get(location).send().await?;

        if !response.status().is_success() {
            return Err(GestureError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Fetch of {} failed: HTTP {}", location, response.status()),
            )));
        }

        if let Some(content_length) = response.content_length() {
            check_size(location, content_length, self.max_size)?;
        }

        // Chunked responses carry no length up front
        let bytes = response.bytes().await?;
        check_size(location, bytes.len() as u64, self.max_size)?;
        Ok(bytes)
    }
}

/// Reads artifacts from the local filesystem
#[derive(Debug, Clone, Copy)]
pub struct FileFetcher {
    max_size: usize,
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self {
            max_size: MAX_ARTIFACT_SIZE,
        }
    }
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

#[async_trait]
impl ArtifactFetcher for FileFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes, GestureError> {
        debug!("Reading {}", location);
        let metadata = tokio::fs::metadata(location).await?;
        check_size(location, metadata.len(), self.max_size)?;

        let data = tokio::fs::read(location).await?;
        check_size(location, data.len() as u64, self.max_size)?;
        Ok(Bytes::from(data))
    }
}

/// Dispatches to HTTP or the filesystem based on the location scheme
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, GestureError> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            file: FileFetcher::new(),
        })
    }
}

#[async_trait]
impl ArtifactFetcher for DefaultFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes, GestureError> {
        if is_remote(location) {
            self.http.fetch(location).await
        } else {
            self.file.fetch(location).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_url() {
        let resolved = resolve_relative("https://example.com/model/model.json", "group1-shard1of1.bin").unwrap();
        assert_eq!(resolved, "https://example.com/model/group1-shard1of1.bin");
    }

    #[test]
    fn test_resolve_relative_file() {
        let resolved = resolve_relative("model/model.json", "weights.onnx").unwrap();
        assert_eq!(Path::new(&resolved), Path::new("model/weights.onnx"));
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let resolved = resolve_relative("model/model.json", "https://cdn.example.com/w.onnx").unwrap();
        assert_eq!(resolved, "https://cdn.example.com/w.onnx");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://localhost/model.json"));
        assert!(is_remote("https://example.com/model.json"));
        assert!(!is_remote("model/model.json"));
        assert!(!is_remote("/abs/model.json"));
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");
        std::fs::write(&path, b"[\"a\"]").unwrap();

        let bytes = FileFetcher::new().fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(&bytes[..], b"[\"a\"]");
    }

    #[tokio::test]
    async fn test_file_fetcher_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");
        let result = FileFetcher::new().fetch(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(GestureError::Io(_))));
    }

    #[tokio::test]
    async fn test_file_fetcher_rejects_oversized_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weights.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let fetcher = FileFetcher::new().with_max_size(8);
        let result = fetcher.fetch(path.to_str().unwrap()).await;
        match result {
            Err(GestureError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::InvalidData);
                assert!(e.to_string().contains("16 bytes"));
            }
            other => panic!("Expected size error, got {:?}", other),
        }

        let bytes = FileFetcher::new().with_max_size(16).fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn test_check_size_limit() {
        assert!(check_size("a.bin", 8, 8).is_ok());
        assert!(matches!(check_size("a.bin", 9, 8), Err(GestureError::Io(_))));
    }

    #[tokio::test]
    async fn test_default_fetcher_uses_filesystem_for_paths() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.json");
        std::fs::write(&path, b"{}").unwrap();

        let fetcher = DefaultFetcher::new(None).unwrap();
        let bytes = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(&bytes[..], b"{}");
    }
}
