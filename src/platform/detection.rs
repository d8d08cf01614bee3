use std::fmt;

use crate::error::UnsupportedPlatformError;

/// Operating systems with published release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    /// Name used in release asset filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        }
    }

    /// Executable suffix, empty where executables carry no extension
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Os::Windows => ".exe",
            Os::Linux | Os::Darwin => "",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures with published release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw host OS identifiers. Package-manager names first, then the names
/// `std::env::consts::OS` reports for the same platforms.
const OS_TABLE: &[(&str, Os)] = &[
    ("linux", Os::Linux),
    ("darwin", Os::Darwin),
    ("win32", Os::Windows),
    ("macos", Os::Darwin),
    ("windows", Os::Windows),
];

/// Raw host architecture identifiers, same ordering as [`OS_TABLE`].
const ARCH_TABLE: &[(&str, Arch)] = &[
    ("x64", Arch::Amd64),
    ("arm64", Arch::Arm64),
    ("x86_64", Arch::Amd64),
    ("aarch64", Arch::Arm64),
];

/// Canonical (os, arch) pair used to name release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformKey {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Every platform that has a release asset.
    pub fn all() -> Vec<PlatformKey> {
        let mut keys = Vec::new();
        for os in [Os::Linux, Os::Darwin, Os::Windows] {
            for arch in [Arch::Amd64, Arch::Arm64] {
                keys.push(PlatformKey::new(os, arch));
            }
        }
        keys
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system and architecture exactly as the host reports them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHost {
    pub os: String,
    pub arch: String,
}

impl RawHost {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The host this process runs on
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn resolve(&self) -> Result<PlatformKey, UnsupportedPlatformError> {
        resolve(&self.os, &self.arch)
    }
}

/// Map raw host identifiers onto a [`PlatformKey`].
///
/// Unknown values are rejected; there is no fallback platform. The OS is
/// checked before the architecture.
#[tracing::instrument]
pub fn resolve(raw_os: &str, raw_arch: &str) -> Result<PlatformKey, UnsupportedPlatformError> {
    let os = lookup(OS_TABLE, raw_os)
        .ok_or_else(|| UnsupportedPlatformError::OperatingSystem(raw_os.to_string()))?;
    let arch = lookup(ARCH_TABLE, raw_arch)
        .ok_or_else(|| UnsupportedPlatformError::Architecture(raw_arch.to_string()))?;

    Ok(PlatformKey { os, arch })
}

fn lookup<T: Copy>(table: &[(&str, T)], raw: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_package_manager_names() {
        let cases = [
            ("linux", "x64", Os::Linux, Arch::Amd64),
            ("linux", "arm64", Os::Linux, Arch::Arm64),
            ("darwin", "x64", Os::Darwin, Arch::Amd64),
            ("darwin", "arm64", Os::Darwin, Arch::Arm64),
            ("win32", "x64", Os::Windows, Arch::Amd64),
            ("win32", "arm64", Os::Windows, Arch::Arm64),
        ];

        for (raw_os, raw_arch, os, arch) in cases {
            let key = resolve(raw_os, raw_arch).unwrap();
            assert_eq!(key, PlatformKey::new(os, arch), "{} {}", raw_os, raw_arch);
        }
    }

    #[test]
    fn test_resolve_rust_host_names() {
        assert_eq!(
            resolve("macos", "aarch64").unwrap(),
            PlatformKey::new(Os::Darwin, Arch::Arm64)
        );
        assert_eq!(
            resolve("windows", "x86_64").unwrap(),
            PlatformKey::new(Os::Windows, Arch::Amd64)
        );
    }

    #[test]
    fn test_resolve_unknown_os() {
        let err = resolve("freebsd", "x64").unwrap_err();
        assert_eq!(
            err,
            UnsupportedPlatformError::OperatingSystem("freebsd".to_string())
        );
    }

    #[test]
    fn test_resolve_unknown_arch() {
        let err = resolve("linux", "ia32").unwrap_err();
        assert_eq!(err, UnsupportedPlatformError::Architecture("ia32".to_string()));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert!(resolve("Linux", "x64").is_err());
        assert!(resolve("linux", "X64").is_err());
    }

    #[test]
    fn test_resolve_checks_os_first() {
        let err = resolve("aix", "ppc64").unwrap_err();
        assert!(matches!(err, UnsupportedPlatformError::OperatingSystem(_)));
    }

    #[test]
    fn test_current_host_resolves_on_supported_targets() {
        let host = RawHost::current();
        let result = host.resolve();

        #[cfg(all(
            any(target_os = "linux", target_os = "macos", target_os = "windows"),
            any(target_arch = "x86_64", target_arch = "aarch64")
        ))]
        assert!(result.is_ok());

        let _ = result;
    }

    #[test]
    fn test_exe_suffix_only_on_windows() {
        assert_eq!(Os::Windows.exe_suffix(), ".exe");
        assert_eq!(Os::Linux.exe_suffix(), "");
        assert_eq!(Os::Darwin.exe_suffix(), "");
    }

    #[test]
    fn test_platform_key_display_and_all() {
        assert_eq!(
            PlatformKey::new(Os::Darwin, Arch::Arm64).to_string(),
            "darwin-arm64"
        );
        assert_eq!(PlatformKey::all().len(), 6);
    }
}
