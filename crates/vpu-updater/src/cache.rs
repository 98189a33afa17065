//! Local cache resolution.
//!
//! Maps a remote URI to the path an artifact is stored at. The mapping only
//! depends on the URI and the configured directories, so a second run for
//! the same release lands on the same file and sees it already present.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::error::UpdateError;

/// Local path for a remote artifact and whether it is already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPath {
    pub path: PathBuf,
    pub exists: bool,
}

/// Resolves remote URIs to paths under the cache directory.
#[derive(Debug, Clone)]
pub struct CacheResolver {
    cache_dir: PathBuf,
    fallback_dir: PathBuf,
}

impl CacheResolver {
    pub fn new(cache_dir: impl Into<PathBuf>, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            fallback_dir: fallback_dir.into(),
        }
    }

    /// Directory artifacts are placed in for this run.
    ///
    /// The configured cache directory when it exists, the fallback otherwise.
    pub fn root(&self) -> &Path {
        if self.cache_dir.is_dir() {
            &self.cache_dir
        } else {
            &self.fallback_dir
        }
    }

    /// Derive the local path for `uri` and check whether it exists.
    pub fn resolve(&self, uri: &str) -> Result<CachedPath, UpdateError> {
        let name = filename_from_uri(uri).ok_or_else(|| UpdateError::InvalidUri(uri.to_string()))?;
        let path = self.root().join(name);
        let exists = path.is_file();
        debug!(uri, path = %path.display(), exists, "Resolved cache path");
        Ok(CachedPath { path, exists })
    }
}

/// Final non-empty path segment of `uri`, percent-decoded.
///
/// Returns `None` if the URI cannot be parsed, has no path, or the segment
/// would escape the cache directory once decoded.
pub fn filename_from_uri(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    if decoded == "." || decoded == ".." || decoded.contains(['/', '\\', '\0']) {
        return None;
    }
    Some(decoded.into_owned())
}
