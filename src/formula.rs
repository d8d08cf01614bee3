//! Homebrew formula rendering.
//!
//! The formula pins one release and lists a download URL and SHA-256 for
//! every macOS and Linux asset. Checksums are computed from local copies of
//! the release assets.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use minijinja::Environment;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::platform::{Arch, Os, PlatformKey};
use crate::release::{ReleaseSource, ReleaseTarget, ReleaseVersion};
use crate::runtime::Runtime;

pub const DESCRIPTION: &str = "Cross-platform dev environment orchestrator";
pub const HOMEPAGE: &str = "https://github.com/dever-labs/dever";
pub const LICENSE: &str = "MIT";

const TEMPLATE_NAME: &str = "formula.rb";
const TEMPLATE: &str = include_str!("../templates/formula.rb.j2");

/// Formula blocks in render order, with the OS each one covers
const PLATFORM_BLOCKS: [(&str, Os); 2] = [("on_macos", Os::Darwin), ("on_linux", Os::Linux)];

/// One asset entry of the formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaAsset {
    pub url: String,
    pub sha256: String,
}

/// An `on_<os>` block choosing between the arm64 and amd64 assets
#[derive(Debug, Clone, Serialize)]
pub struct FormulaPlatform {
    #[serde(skip)]
    pub os: Os,
    pub block: &'static str,
    pub arm64: FormulaAsset,
    pub amd64: FormulaAsset,
}

/// Everything the formula template needs
#[derive(Debug, Clone, Serialize)]
pub struct Formula {
    pub class_name: String,
    pub tool_name: String,
    pub description: &'static str,
    pub homepage: &'static str,
    pub license: &'static str,
    pub version: String,
    pub platforms: Vec<FormulaPlatform>,
}

impl Formula {
    /// Build the formula for `version` from assets found in `dist_dir`.
    #[tracing::instrument(skip(runtime, source))]
    pub fn from_dist<R: Runtime>(
        runtime: &R,
        source: &ReleaseSource,
        version: &ReleaseVersion,
        dist_dir: &Path,
    ) -> Result<Self> {
        let pinned = match version {
            ReleaseVersion::Tagged(v) => v.clone(),
            ReleaseVersion::Latest => bail!("A formula must pin a release version"),
        };

        if !runtime.is_dir(dist_dir) {
            bail!("Asset directory {:?} does not exist", dist_dir);
        }

        let checksum = |os: Os, arch: Arch| -> Result<FormulaAsset> {
            let target = ReleaseTarget::locate(&PlatformKey::new(os, arch), version, source);
            let sha256 = sha256_file(runtime, &dist_dir.join(&target.asset_filename))
                .with_context(|| format!("Failed to checksum {}", target.asset_filename))?;
            debug!("{} sha256 {}", target.asset_filename, sha256);

            Ok(FormulaAsset {
                url: target.download_url,
                sha256,
            })
        };

        let platforms = PLATFORM_BLOCKS
            .iter()
            .map(|&(block, os)| -> Result<FormulaPlatform> {
                Ok(FormulaPlatform {
                    os,
                    block,
                    arm64: checksum(os, Arch::Arm64)?,
                    amd64: checksum(os, Arch::Amd64)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Collected {} formula assets for v{}", platforms.len() * 2, pinned);

        Ok(Self {
            class_name: class_name(&source.tool_name),
            tool_name: source.tool_name.clone(),
            description: DESCRIPTION,
            homepage: HOMEPAGE,
            license: LICENSE,
            version: pinned,
            platforms,
        })
    }

    pub fn asset(&self, os: Os, arch: Arch) -> Option<&FormulaAsset> {
        let platform = self.platforms.iter().find(|p| p.os == os)?;
        match arch {
            Arch::Arm64 => Some(&platform.arm64),
            Arch::Amd64 => Some(&platform.amd64),
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.add_template(TEMPLATE_NAME, TEMPLATE)
            .context("Failed to parse formula template")?;

        env.get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(self))
            .context("Failed to render formula")
    }
}

/// Ruby class name Homebrew derives from the formula file name.
pub fn class_name(tool_name: &str) -> String {
    tool_name
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Hex-encoded SHA-256 of a file, streamed in chunks.
#[tracing::instrument(skip(runtime))]
pub fn sha256_file<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
