//! Installs the prebuilt binary for the current host.
//!
//! [`Installer::install`] runs the pipeline strictly and reports the stage
//! that failed. [`Installer::run_postinstall`] is the outer boundary used by
//! the CLI: it never fails, and turns any error into a warning plus a manual
//! install hint so the surrounding package-manager transaction is not aborted.

use anyhow::Context;
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    http::HttpClient,
    platform::{PlatformKey, RawHost},
    release::{ReleaseSource, ReleaseTarget, ReleaseVersion},
    runtime::Runtime,
    shim::{EXECUTABLE_MODE, ShimStrategy},
};

pub mod config;

use config::{Config, resolve_install_root};

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Resolving,
    Locating,
    Fetching,
    Placing,
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Resolving => "resolving platform",
            InstallStage::Locating => "locating release asset",
            InstallStage::Fetching => "fetching release asset",
            InstallStage::Placing => "placing binary",
            InstallStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A pipeline stage failed
#[derive(Debug)]
pub struct InstallFailure {
    pub stage: InstallStage,
    pub error: anyhow::Error,
}

impl InstallFailure {
    fn at(stage: InstallStage) -> impl FnOnce(anyhow::Error) -> InstallFailure {
        move |error| InstallFailure { stage, error }
    }
}

impl fmt::Display for InstallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.stage, self.error)
    }
}

impl std::error::Error for InstallFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.error)
    }
}

/// Binary on disk plus the shim that exposes it under the fixed command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub platform: PlatformKey,
    pub target: ReleaseTarget,
    pub binary: PathBuf,
    pub shim: Option<PathBuf>,
    pub bytes: u64,
}

#[derive(Debug)]
pub enum InstallOutcome {
    Installed(InstalledArtifact),
    /// Degraded but non-fatal: the user was told where to install from by hand
    Failed {
        stage: InstallStage,
        message: String,
        fallback_url: String,
    },
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed(_))
    }
}

/// Everything the `install` subcommand can configure
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub host: RawHost,
    pub version: ReleaseVersion,
    pub install_root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

pub struct Installer<R: Runtime> {
    pub runtime: R,
    pub http_client: HttpClient,
    pub source: ReleaseSource,
    pub install_root: Option<PathBuf>,
}

impl<R: Runtime> Installer<R> {
    pub fn new(
        runtime: R,
        http_client: HttpClient,
        source: ReleaseSource,
        install_root: Option<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            http_client,
            source,
            install_root,
        }
    }

    pub fn from_config(config: Config<R>) -> Self {
        Self::new(
            config.runtime,
            config.http_client,
            config.source,
            config.install_root,
        )
    }

    /// Resolve, locate, fetch and place the binary for `host`.
    #[tracing::instrument(skip(self))]
    pub async fn install(
        &self,
        host: &RawHost,
        version: &ReleaseVersion,
    ) -> Result<InstalledArtifact, InstallFailure> {
        debug!("Stage: {}", InstallStage::Resolving);
        let platform = host
            .resolve()
            .map_err(anyhow::Error::from)
            .map_err(InstallFailure::at(InstallStage::Resolving))?;
        info!("Resolved host {}/{} to {}", host.os, host.arch, platform);

        debug!("Stage: {}", InstallStage::Locating);
        let target = ReleaseTarget::locate(&platform, version, &self.source);
        debug!("Asset {} at {}", target.asset_filename, target.download_url);

        debug!("Stage: {}", InstallStage::Fetching);
        let install_root = resolve_install_root(&self.runtime, self.install_root.clone())
            .map_err(InstallFailure::at(InstallStage::Fetching))?;
        self.runtime
            .create_dir_all(&install_root)
            .map_err(InstallFailure::at(InstallStage::Fetching))?;

        let binary = install_root.join(format!(
            "{}{}",
            self.source.tool_name,
            platform.os.exe_suffix()
        ));

        println!(
            "[{}] Downloading {} ({})...",
            self.source.tool_name, target.asset_filename, version
        );
        let bytes = self
            .fetch(&target.download_url, &binary)
            .await
            .map_err(InstallFailure::at(InstallStage::Fetching))?;

        debug!("Stage: {}", InstallStage::Placing);
        self.runtime
            .set_permissions(&binary, EXECUTABLE_MODE)
            .with_context(|| format!("Failed to mark {:?} executable", binary))
            .map_err(InstallFailure::at(InstallStage::Placing))?;

        let shim = ShimStrategy::for_os(platform.os)
            .apply(
                &self.runtime,
                &binary,
                &install_root,
                &self.source.tool_name,
            )
            .map_err(InstallFailure::at(InstallStage::Placing))?;

        debug!("Stage: {}", InstallStage::Done);
        Ok(InstalledArtifact {
            platform,
            target,
            binary,
            shim,
            bytes,
        })
    }

    /// Stream `url` into `dest`. The file is created or truncated only once
    /// the server answers with a success.
    async fn fetch(&self, url: &str, dest: &Path) -> anyhow::Result<u64> {
        let bytes = self
            .http_client
            .download_file(url, || {
                self.runtime
                    .create_file(dest)
                    .with_context(|| format!("Failed to create destination file at {:?}", dest))
            })
            .await?;

        info!("Wrote {} bytes to {}", bytes, dest.display());
        Ok(bytes)
    }

    /// Run [`Installer::install`] and absorb any failure.
    ///
    /// Never returns an error; the failure is reported once on stderr and
    /// the user is pointed at the releases page.
    #[tracing::instrument(skip(self))]
    pub async fn run_postinstall(&self, host: &RawHost, version: &ReleaseVersion) -> InstallOutcome {
        match self.install(host, version).await {
            Ok(artifact) => {
                println!(
                    "[{}] Installed to {}",
                    self.source.tool_name,
                    artifact.binary.display()
                );
                InstallOutcome::Installed(artifact)
            }
            Err(failure) => degrade(&self.source, failure.stage, &failure.error),
        }
    }
}

/// Report the failure, point the user at the releases page, and carry on.
fn degrade(source: &ReleaseSource, stage: InstallStage, error: &anyhow::Error) -> InstallOutcome {
    let message = format!("{:#}", error);
    let fallback_url = source.releases_page();

    debug!("Postinstall failed while {}: {}", stage, message);
    eprintln!("[{}] Postinstall failed: {}", source.tool_name, message);
    eprintln!("[{}] Install manually: {}", source.tool_name, fallback_url);

    InstallOutcome::Failed {
        stage,
        message,
        fallback_url,
    }
}

/// Entry point for the `install` subcommand.
///
/// Building the HTTP client is part of fetching; if it fails the outcome is
/// degraded the same way as any other fetch failure.
#[tracing::instrument(skip(runtime))]
pub async fn postinstall<R: Runtime>(runtime: R, options: InstallOptions) -> InstallOutcome {
    let source = ReleaseSource::with_base_url(options.base_url.clone());

    match Config::new(runtime, options.install_root, options.base_url, options.timeout) {
        Ok(config) => {
            Installer::from_config(config)
                .run_postinstall(&options.host, &options.version)
                .await
        }
        Err(e) => degrade(&source, InstallStage::Fetching, &e),
    }
}
