//! Release discovery on the vendor download page.
//!
//! The page offers one `<option>` per supported platform. Its `value` is the
//! installer link and its `data-signature-uri` the detached signature. The
//! markup is parsed with an HTML5 parser, so stray or unclosed tags around
//! other entries do not shift which attributes belong to which label.

use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::download::Downloader;
use crate::error::FetchError;
use crate::platform::PlatformLabel;

/// Attribute carrying the installer URI.
const INSTALLER_ATTR: &str = "value";

/// Attribute carrying the detached signature URI.
const SIGNATURE_ATTR: &str = "data-signature-uri";

/// URIs published for one platform entry.
///
/// Both fields absent means the page has no entry for the platform; that is
/// a normal answer, not a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseEntry {
    pub installer_uri: Option<String>,
    pub signature_uri: Option<String>,
}

impl ReleaseEntry {
    pub fn is_found(&self) -> bool {
        self.installer_uri.is_some()
    }
}

/// Finds the installer and signature for a platform on the vendor page.
pub struct ReleaseLocator<'a> {
    downloader: &'a Downloader,
}

impl<'a> ReleaseLocator<'a> {
    pub fn new(downloader: &'a Downloader) -> Self {
        Self { downloader }
    }

    /// Fetch `page_url` and extract the entry for `label`.
    pub async fn locate(
        &self,
        page_url: &str,
        label: PlatformLabel,
    ) -> Result<ReleaseEntry, FetchError> {
        let html = self.downloader.fetch_text(page_url).await?;
        let entry = find_release_entry(&html, label.as_str(), page_url);
        match &entry.installer_uri {
            Some(uri) => info!(platform = %label, installer = %uri, "Located release"),
            None => info!(platform = %label, "No release entry for platform"),
        }
        Ok(entry)
    }
}

/// Extract the first `<option>` whose visible text contains `label`.
///
/// Matching ignores case and collapses runs of whitespace. Relative URIs are
/// resolved against `base_url`; blank attributes count as absent. When the
/// page lists a label more than once the first entry wins.
pub fn find_release_entry(html: &str, label: &str, base_url: &str) -> ReleaseEntry {
    let document = Html::parse_document(html);
    let wanted = normalize_text(label);
    if wanted.is_empty() {
        return ReleaseEntry::default();
    }

    let matched = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("option"))
        .find(|el| normalize_text(&el.text().collect::<String>()).contains(&wanted));

    let Some(option) = matched else {
        debug!(label, "No option matched");
        return ReleaseEntry::default();
    };

    let attr = |name: &str| {
        option
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| resolve_uri(base_url, v))
    };

    ReleaseEntry {
        installer_uri: attr(INSTALLER_ATTR),
        signature_uri: attr(SIGNATURE_ATTR),
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn resolve_uri(base_url: &str, value: &str) -> String {
    url::Url::parse(base_url)
        .and_then(|base| base.join(value))
        .map(String::from)
        .unwrap_or_else(|_| value.to_string())
}
