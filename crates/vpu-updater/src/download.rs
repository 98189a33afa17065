//! Vendor page and artifact retrieval.
//!
//! Page requests use the short timeout, artifact downloads the long one.
//! Downloads are streamed into a `.part` file next to the destination and
//! renamed into place only after the whole body has been written, so the
//! destination either holds a complete artifact or does not exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::error::FetchError;

/// Buffer size for reading files during hash computation.

/// Suffix of the in-progress download file.
const PARTIAL_SUFFIX: &str = ".part";

/// Configuration for the downloader.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Timeout for vendor page requests.
    pub page_timeout: Duration,
    /// Timeout for a whole artifact download.
    pub download_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for DownloaderConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            page_timeout: network.page_timeout(),
            download_timeout: network.download_timeout(),
            user_agent: network.user_agent.clone(),
        }
    }
}

/// A body written to its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: u64,
    /// Hex-encoded SHA-256 of the body
    pub sha256: String,
}

/// HTTP retrieval of the vendor page and release artifacts.
pub struct Downloader {
    client: reqwest::Client,
    config: DownloaderConfig,
}

impl Downloader {
    /// Create a downloader with the given timeouts.
    pub fn with_config(config: DownloaderConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.page_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|source| FetchError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Fetch a text document (the vendor page) into memory.
    ///
    /// Fails if the response is not a success, declares a non-text content
    /// type, or is not valid UTF-8.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "Fetching page");
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.config.page_timeout)
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_text_content_type(content_type) {
                return Err(FetchError::NotText {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let bytes = response.bytes().await.map_err(http_err)?;
        let text = String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::NotText {
            url: url.to_string(),
            content_type: "non-UTF-8 body".to_string(),
        })?;
        debug!("Fetched {} bytes of markup", text.len());
        Ok(text)
    }

    /// Stream `url` to `dest`, replacing any previous file.
    ///
    /// The body is hashed as it is written. On failure `dest` is left
    /// untouched and the partial file is removed.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<DownloadedFile, FetchError> {
        info!("Starting download: {} -> {:?}", url, dest);
        let partial = partial_path(dest);

        let result = self.stream_to(url, &partial).await;
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial download {:?}: {}", partial, cleanup);
                    }
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        info!("Download complete: {} bytes", written.bytes);
        Ok(written)
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<DownloadedFile, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let io_err = |source| FetchError::Io {
            path: partial.to_path_buf(),
            source,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = partial.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;

        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(http_err)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(DownloadedFile {
            bytes: written,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

/// Sibling path the body is streamed into before the final rename.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn is_text_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime.ends_with("+xml") || mime == "application/xml"
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A local port nothing listens on.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_text_content_types() {
        assert!(is_text_content_type("text/html"));
        assert!(is_text_content_type("text/html; charset=UTF-8"));
        assert!(is_text_content_type("Text/Plain"));
        assert!(is_text_content_type("application/xhtml+xml"));
        assert!(!is_text_content_type("application/octet-stream"));
        assert!(!is_text_content_type("image/png"));
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let dest = Path::new("/var/local/app_ubuntu64.deb");
        assert_eq!(
            partial_path(dest),
            PathBuf::from("/var/local/app_ubuntu64.deb.part")
        );
    }

    #[test]
    fn test_config_from_network() {
        let network = NetworkConfig {
            page_timeout_secs: 3,
            download_timeout_secs: 90,
            user_agent: "test-agent".to_string(),
        };
        let config = DownloaderConfig::from(&network);
        assert_eq!(config.page_timeout, Duration::from_secs(3));
        assert_eq!(config.download_timeout, Duration::from_secs(90));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app.deb");
        let downloader = Downloader::with_config(DownloaderConfig {
            page_timeout: Duration::from_secs(1),
            download_timeout: Duration::from_secs(1),
            user_agent: "test".to_string(),
        })
        .unwrap();

        // Port 9 (discard) on localhost is closed in test environments.
        let url = format!("http://127.0.0.1:{}/app.deb", closed_port());
        let result = downloader.download_to(&url, &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
