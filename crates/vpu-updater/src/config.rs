//! Configuration structures for the update pipeline.
//!
//! Defines the platform selection, vendor page, cache location, network
//! timeouts, trust tool invocation and optional mail delivery settings.
//! Values come from a TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::PlatformLabel;

/// Prefix of every environment override.
const ENV_PREFIX: &str = "VPU_";

/// Main updater configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Product name used in report subjects
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Platform entry to look for on the vendor page
    #[serde(default)]
    pub platform: PlatformLabel,

    /// Vendor download page
    #[serde(default = "default_page_url")]
    pub page_url: String,

    /// Preferred directory for downloaded artifacts
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Used when `cache_dir` does not exist (empty = home directory)
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,

    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Signature tool configuration
    #[serde(default)]
    pub trust: TrustConfig,

    /// Mail report configuration
    #[serde(default)]
    pub email: EmailConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            platform: PlatformLabel::default(),
            page_url: default_page_url(),
            cache_dir: default_cache_dir(),
            fallback_dir: None,
            network: NetworkConfig::default(),
            trust: TrustConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Apply `VPU_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from an arbitrary lookup, keyed without the prefix.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(platform) = lookup("PLATFORM") {
            self.platform = platform.parse()?;
        }
        if let Some(url) = lookup("PAGE_URL") {
            self.page_url = url;
        }
        if let Some(dir) = lookup("CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }

        let email = &mut self.email;
        if let Some(user) = lookup("EMAIL_USER") {
            email.user = Some(user);
            email.enabled = true;
        }
        if let Some(pass) = lookup("EMAIL_PASS") {
            email.password = Some(pass);
        }
        if let Some(domain) = lookup("EMAIL_DOMAIN") {
            email.domain = domain;
        }
        if let Some(from) = lookup("EMAIL_FROM") {
            email.from = Some(from);
        }
        if let Some(to) = lookup("EMAIL_TO") {
            email.to = Some(to);
        }
        if let Some(server) = lookup("EMAIL_SERVER") {
            email.server = Some(server);
        }
        if let Some(port) = lookup("EMAIL_PORT") {
            email.port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{}EMAIL_PORT is not a port: {}", ENV_PREFIX, port))
            })?;
        }
        Ok(())
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page = url::Url::parse(&self.page_url).map_err(|e| {
            ConfigError::Invalid(format!("page_url '{}' is not a URL: {}", self.page_url, e))
        })?;
        if !matches!(page.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "page_url must be http or https, got {}",
                page.scheme()
            )));
        }
        if self.network.page_timeout_secs == 0 || self.network.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "network timeouts must be at least 1 second".to_string(),
            ));
        }
        if self.trust.program.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("trust.program must not be empty".to_string()));
        }
        if self.email.enabled {
            if self.email.user.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Invalid(
                    "email is enabled but email.user is not set".to_string(),
                ));
            }
            if self.email.password.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Invalid(
                    "email is enabled but email.password is not set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Directory used when `cache_dir` is missing.
    pub fn fallback_dir(&self) -> PathBuf {
        match &self.fallback_dir {
            Some(dir) => dir.clone(),
            None => default_fallback_dir(),
        }
    }
}

/// Network configuration for page and artifact retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Timeout for the vendor page request in seconds
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for installer and signature downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: default_page_timeout(),
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// External signature tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Program invoked for key import and verification
    #[serde(default = "default_trust_program")]
    pub program: PathBuf,

    /// Key server the publisher key is fetched from
    #[serde(default = "default_keyserver")]
    pub keyserver: String,

    /// Publisher key ID
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Kill the tool after this many seconds (0 = wait forever)
    #[serde(default = "default_trust_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            program: default_trust_program(),
            keyserver: default_keyserver(),
            key_id: default_key_id(),
            timeout_secs: default_trust_timeout(),
        }
    }
}

impl TrustConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Mail report configuration.
///
/// Unset addresses are derived from `user` and `domain`: the sender is
/// `user@domain`, the recipient is the sender, the relay is `smtp.<domain>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_email_domain")]
    pub domain: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_email_port")]
    pub port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user: None,
            password: None,
            domain: default_email_domain(),
            from: None,
            to: None,
            server: None,
            port: default_email_port(),
        }
    }
}

impl EmailConfig {
    pub fn sender(&self) -> String {
        match &self.from {
            Some(from) => from.clone(),
            None => format!("{}@{}", self.user.as_deref().unwrap_or("username"), self.domain),
        }
    }

    pub fn recipient(&self) -> String {
        self.to.clone().unwrap_or_else(|| self.sender())
    }

    pub fn relay(&self) -> String {
        self.server
            .clone()
            .unwrap_or_else(|| format!("smtp.{}", self.domain))
    }
}

// Default value functions for serde
fn default_product_name() -> String {
    "ExpressVPN".to_string()
}

fn default_page_url() -> String {
    "https://www.expressvpn.com/latest?utm_source=linux_app#linux".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/local")
}

fn default_page_timeout() -> u64 {
    10
}

fn default_download_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("vpu-updater/{}", env!("CARGO_PKG_VERSION"))
}

fn default_trust_program() -> PathBuf {
    PathBuf::from("gpg")
}

fn default_keyserver() -> String {
    "hkp://keyserver.ubuntu.com".to_string()
}

fn default_key_id() -> String {
    "0xAFF2A1415F6A3A38".to_string()
}

fn default_trust_timeout() -> u64 {
    120
}

fn default_email_domain() -> String {
    "gmail.com".to_string()
}

fn default_email_port() -> u16 {
    587
}

/// Home directory of the invoking user, else the working directory.
fn default_fallback_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => PathBuf::from("."),
    }
}
