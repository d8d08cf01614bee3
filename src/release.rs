//! Release asset location.
//!
//! Computes the asset filename for a platform and the URL it is published
//! under. Pure string templating, no network access.

use std::fmt;
use std::str::FromStr;

use crate::platform::PlatformKey;

pub const DEFAULT_BASE_URL: &str = "https://github.com";
pub const DEFAULT_REPO: &str = "dever-labs/dever";
pub const TOOL_NAME: &str = "devx";

/// Version placeholder meaning "no pinned release".
pub const UNSET_VERSION: &str = "0.0.0";

/// Which release to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseVersion {
    Latest,
    /// Version without the leading `v`
    Tagged(String),
}

impl ReleaseVersion {
    /// Tag name as published on the release host, e.g. `v1.2.0`
    pub fn tag(&self) -> Option<String> {
        match self {
            ReleaseVersion::Latest => None,
            ReleaseVersion::Tagged(version) => Some(format!("v{}", version)),
        }
    }
}

impl FromStr for ReleaseVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let version = s.strip_prefix('v').unwrap_or(s);
        if version.is_empty() || version == UNSET_VERSION || s.eq_ignore_ascii_case("latest") {
            return Ok(ReleaseVersion::Latest);
        }
        Ok(ReleaseVersion::Tagged(version.to_string()))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseVersion::Latest => f.write_str("latest"),
            ReleaseVersion::Tagged(version) => write!(f, "v{}", version),
        }
    }
}

/// Where releases are published and what the tool is called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    pub base_url: String,
    pub repo: String,
    pub tool_name: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            repo: DEFAULT_REPO.to_string(),
            tool_name: TOOL_NAME.to_string(),
        }
    }
}

impl ReleaseSource {
    /// Same repository and tool, served from another host (mirrors, tests).
    pub fn with_base_url(base_url: Option<String>) -> Self {
        let mut source = Self::default();
        if let Some(url) = base_url {
            source.base_url = url;
        }
        source
    }

    fn repo_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.repo)
    }

    /// Page listing all releases, offered when automatic install fails
    pub fn releases_page(&self) -> String {
        format!("{}/releases", self.repo_url())
    }
}

/// Asset to fetch for one platform and version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub asset_filename: String,
    pub download_url: String,
}

impl ReleaseTarget {
    pub fn locate(
        platform: &PlatformKey,
        version: &ReleaseVersion,
        source: &ReleaseSource,
    ) -> Self {
        let asset_filename = asset_filename(&source.tool_name, platform);

        let download_url = match version.tag() {
            None => format!(
                "{}/releases/latest/download/{}",
                source.repo_url(),
                asset_filename
            ),
            Some(tag) => format!(
                "{}/releases/download/{}/{}",
                source.repo_url(),
                tag,
                asset_filename
            ),
        };

        Self {
            asset_filename,
            download_url,
        }
    }
}

/// `<tool>-<os>-<arch>`, with `.exe` on Windows
pub fn asset_filename(tool_name: &str, platform: &PlatformKey) -> String {
    format!(
        "{}-{}-{}{}",
        tool_name,
        platform.os,
        platform.arch,
        platform.os.exe_suffix()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    #[test]
    fn test_parse_version_sentinel_is_latest() {
        assert_eq!(
            "0.0.0".parse::<ReleaseVersion>().unwrap(),
            ReleaseVersion::Latest
        );
        assert_eq!("".parse::<ReleaseVersion>().unwrap(), ReleaseVersion::Latest);
        assert_eq!(
            "latest".parse::<ReleaseVersion>().unwrap(),
            ReleaseVersion::Latest
        );
    }

    #[test]
    fn test_parse_version_prefixed_sentinel_is_latest() {
        assert_eq!(
            "v0.0.0".parse::<ReleaseVersion>().unwrap(),
            ReleaseVersion::Latest
        );

        let source = ReleaseSource::default();
        let platform = PlatformKey::new(Os::Linux, Arch::Amd64);
        let target = ReleaseTarget::locate(&platform, &"v0.0.0".parse().unwrap(), &source);
        assert_eq!(
            target.download_url,
            "https://github.com/dever-labs/dever/releases/latest/download/devx-linux-amd64"
        );
    }

    #[test]
    fn test_parse_version_strips_v_prefix() {
        assert_eq!(
            "v1.2.0".parse::<ReleaseVersion>().unwrap(),
            ReleaseVersion::Tagged("1.2.0".to_string())
        );
        assert_eq!(
            "1.2.0".parse::<ReleaseVersion>().unwrap(),
            ReleaseVersion::Tagged("1.2.0".to_string())
        );
    }

    #[test]
    fn test_exe_suffix_only_for_windows() {
        for platform in PlatformKey::all() {
            let name = asset_filename(TOOL_NAME, &platform);
            if platform.os == Os::Windows {
                assert!(name.ends_with(".exe"), "{}", name);
            } else {
                assert!(!name.ends_with(".exe"), "{}", name);
            }
        }
    }

    #[test]
    fn test_locate_tagged_darwin_arm64() {
        let target = ReleaseTarget::locate(
            &PlatformKey::new(Os::Darwin, Arch::Arm64),
            &"1.2.0".parse().unwrap(),
            &ReleaseSource::default(),
        );

        assert_eq!(target.asset_filename, "devx-darwin-arm64");
        assert_eq!(
            target.download_url,
            "https://github.com/dever-labs/dever/releases/download/v1.2.0/devx-darwin-arm64"
        );
    }

    #[test]
    fn test_locate_latest_windows() {
        let target = ReleaseTarget::locate(
            &PlatformKey::new(Os::Windows, Arch::Amd64),
            &ReleaseVersion::Latest,
            &ReleaseSource::default(),
        );

        assert_eq!(target.asset_filename, "devx-windows-amd64.exe");
        assert_eq!(
            target.download_url,
            "https://github.com/dever-labs/dever/releases/latest/download/devx-windows-amd64.exe"
        );
    }

    #[test]
    fn test_locate_url_forms() {
        let source = ReleaseSource::default();
        let platform = PlatformKey::new(Os::Linux, Arch::Amd64);

        let latest = ReleaseTarget::locate(&platform, &"0.0.0".parse().unwrap(), &source);
        assert!(latest.download_url.contains("/releases/latest/download/"));

        for version in ["0.1.0", "2.0.0-rc.1", "10.4.7"] {
            let target = ReleaseTarget::locate(&platform, &version.parse().unwrap(), &source);
            assert!(
                target
                    .download_url
                    .contains(&format!("/releases/download/v{}/", version)),
                "{}",
                target.download_url
            );
        }
    }

    #[test]
    fn test_custom_base_url_tolerates_trailing_slash() {
        let source = ReleaseSource::with_base_url(Some("http://127.0.0.1:1234/".to_string()));
        let target = ReleaseTarget::locate(
            &PlatformKey::new(Os::Linux, Arch::Arm64),
            &ReleaseVersion::Latest,
            &source,
        );
        assert_eq!(
            target.download_url,
            "http://127.0.0.1:1234/dever-labs/dever/releases/latest/download/devx-linux-arm64"
        );
        assert_eq!(
            source.releases_page(),
            "http://127.0.0.1:1234/dever-labs/dever/releases"
        );
    }

    #[test]
    fn test_version_display() {
        assert_eq!(ReleaseVersion::Latest.to_string(), "latest");
        assert_eq!(
            ReleaseVersion::Tagged("1.2.0".to_string()).to_string(),
            "v1.2.0"
        );
    }
}
