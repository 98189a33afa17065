//! Supported platform labels.
//!
//! The vendor page lists one entry per supported operating system and
//! architecture. A deployment picks exactly one of these labels; its text
//! is what the release locator searches for in the page markup.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Platform label selecting the relevant entry on the vendor page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformLabel {
    #[serde(rename = "Ubuntu 64-bit")]
    Ubuntu64,
    #[serde(rename = "Ubuntu 32-bit")]
    Ubuntu32,
    #[serde(rename = "Fedora 64-bit")]
    Fedora64,
    #[serde(rename = "Fedora 32-bit")]
    Fedora32,
    #[serde(rename = "Arch 64-bit")]
    Arch64,
    #[serde(rename = "Raspbian 32-bit")]
    Raspbian32,
}

impl PlatformLabel {
    /// Every supported label, in the order the vendor lists them.
    pub const ALL: [PlatformLabel; 6] = [
        Self::Ubuntu64,
        Self::Ubuntu32,
        Self::Fedora64,
        Self::Fedora32,
        Self::Arch64,
        Self::Raspbian32,
    ];

    /// The human-readable label as it appears on the vendor page.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ubuntu64 => "Ubuntu 64-bit",
            Self::Ubuntu32 => "Ubuntu 32-bit",
            Self::Fedora64 => "Fedora 64-bit",
            Self::Fedora32 => "Fedora 32-bit",
            Self::Arch64 => "Arch 64-bit",
            Self::Raspbian32 => "Raspbian 32-bit",
        }
    }

    /// Command a user runs to install a fetched package on this platform.
    pub fn install_hint(&self, package: &Path) -> String {
        let package = package.display();
        match self {
            Self::Ubuntu64 | Self::Ubuntu32 | Self::Raspbian32 => {
                format!("sudo dpkg -i {}", package)
            }
            Self::Fedora64 | Self::Fedora32 => format!("sudo dnf install {}", package),
            Self::Arch64 => format!("sudo pacman -U {}", package),
        }
    }
}

impl Default for PlatformLabel {
    fn default() -> Self {
        Self::Ubuntu64
    }
}

impl std::fmt::Display for PlatformLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformLabel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unsupported platform '{}' (expected one of: {})",
                    wanted,
                    Self::ALL.map(|l| l.as_str()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_platform() {
        assert_eq!(PlatformLabel::default(), PlatformLabel::Ubuntu64);
        assert_eq!(PlatformLabel::default().as_str(), "Ubuntu 64-bit");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "fedora 64-BIT".parse::<PlatformLabel>().unwrap(),
            PlatformLabel::Fedora64
        );
        assert_eq!(
            "  Raspbian 32-bit ".parse::<PlatformLabel>().unwrap(),
            PlatformLabel::Raspbian32
        );
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let err = "Windows 11".parse::<PlatformLabel>().unwrap_err();
        assert!(err.to_string().contains("Windows 11"));
        assert!(err.to_string().contains("Arch 64-bit"));
    }

    #[test]
    fn test_install_hint_per_package_manager() {
        let path = Path::new("/var/local/app.pkg");
        assert_eq!(
            PlatformLabel::Ubuntu32.install_hint(path),
            "sudo dpkg -i /var/local/app.pkg"
        );
        assert_eq!(
            PlatformLabel::Fedora64.install_hint(path),
            "sudo dnf install /var/local/app.pkg"
        );
        assert_eq!(
            PlatformLabel::Arch64.install_hint(path),
            "sudo pacman -U /var/local/app.pkg"
        );
    }

    #[test]
    fn test_serde_uses_label_text() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            platform: PlatformLabel,
        }

        let text = toml::to_string(&Wrapper {
            platform: PlatformLabel::Arch64,
        })
        .unwrap();
        assert_eq!(text.trim(), "platform = \"Arch 64-bit\"");

        let parsed: Wrapper = toml::from_str("platform = \"Fedora 32-bit\"").unwrap();
        assert_eq!(parsed.platform, PlatformLabel::Fedora32);
    }
}
