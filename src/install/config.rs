use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::{Client, redirect::Policy};
use std::path::PathBuf;
use std::time::Duration;

use crate::{http::HttpClient, release::ReleaseSource, runtime::Runtime};

/// Identifying user agent sent with every request, carrying the same version
/// as `devx-install version`.
pub const USER_AGENT: &str = concat!("devx-installer/", env!("DEVX_INSTALL_VERSION"));

/// Idle read timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Install root used when none is given, relative to the home directory.
pub const DEFAULT_ROOT_DIR: &str = ".devx";

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub http_client: HttpClient,
    pub source: ReleaseSource,
    pub install_root: Option<PathBuf>,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        install_root: Option<PathBuf>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let client = build_client(timeout)?;
        let source = ReleaseSource::with_base_url(base_url);

        debug!(
            "Using release host {} with {}s timeout",
            source.base_url,
            timeout.as_secs()
        );

        Ok(Self {
            runtime,
            http_client: HttpClient::new(client),
            source,
            install_root,
        })
    }
}

/// Build the reqwest client used for release downloads.
///
/// Redirects are not followed automatically; `HttpClient` walks them so the
/// final URL is known when a download fails.
///
/// `timeout` bounds how long a single read may stall, not the whole
/// transfer: a slow body that keeps arriving is never cut off.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .read_timeout(timeout)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .build()
        .context("Failed to build HTTP client")
}

/// Resolve the directory the binary and shim are placed in
#[tracing::instrument(skip(runtime, install_root))]
pub fn resolve_install_root<R: Runtime>(
    runtime: &R,
    install_root: Option<PathBuf>,
) -> Result<PathBuf> {
    let root = match install_root {
        Some(path) => path,
        None => default_install_root(runtime)?,
    };

    info!("Using install root: {}", root.display());
    Ok(root)
}

/// Get the default installation root directory
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(DEFAULT_ROOT_DIR).join("bin"))
}
