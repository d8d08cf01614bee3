use anyhow::{Context, Result};
use clap::Parser;
use devx_install::{
    formula::Formula,
    install::{InstallOptions, postinstall},
    platform::RawHost,
    release::{ReleaseSource, ReleaseVersion, UNSET_VERSION},
    runtime::{RealRuntime, Runtime},
};
use std::path::PathBuf;
use std::time::Duration;

/// devx-install - fetch the prebuilt devx binary for this host
///
/// Downloads the devx release asset matching the host operating system and
/// architecture from GitHub Releases and places it, executable, in the
/// install root. Failures never abort the surrounding package install;
/// a manual download link is printed instead.
///
/// Examples:
///   devx-install install                     # Latest release into ~/.devx/bin
///   devx-install install --release 1.2.0     # Pinned release
///   devx-install formula --release 1.2.0 --dist ./dist --output devx.rb
#[derive(Parser, Debug)]
#[command(author, version = devx_install::VERSION, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Release host base URL (defaults to https://github.com)
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and install the binary for this host
    Install(InstallArgs),

    /// Render the Homebrew formula for a pinned release
    Formula(FormulaArgs),

    /// Print the installer version
    Version,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Directory the binary is placed in (defaults to ~/.devx/bin)
    #[arg(
        long = "root",
        short = 'r',
        env = "DEVX_INSTALL_ROOT",
        value_name = "PATH"
    )]
    pub install_root: Option<PathBuf>,

    /// Release to install; 0.0.0 or "latest" selects the latest release
    #[arg(long = "release", env = "DEVX_VERSION", value_name = "VERSION", default_value = UNSET_VERSION)]
    pub release: String,

    /// Seconds a connection may stall before the download is abandoned
    #[arg(long = "timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Override the host operating system (e.g. linux, darwin, win32)
    #[arg(long = "os", value_name = "OS", requires = "arch")]
    pub os: Option<String>,

    /// Override the host architecture (e.g. x64, arm64)
    #[arg(long = "arch", value_name = "ARCH", requires = "os")]
    pub arch: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FormulaArgs {
    /// Pinned release version, e.g. 1.2.0
    #[arg(long = "release", value_name = "VERSION")]
    pub release: String,

    /// Directory holding the release assets to checksum
    #[arg(long = "dist", value_name = "DIR")]
    pub dist: PathBuf,

    /// Write the formula here instead of stdout
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            let host = match (args.os, args.arch) {
                (Some(os), Some(arch)) => RawHost::new(os, arch),
                _ => RawHost::current(),
            };
            let options = InstallOptions {
                host,
                version: parse_release(&args.release),
                install_root: args.install_root,
                base_url: cli.base_url,
                timeout: args.timeout.map(Duration::from_secs),
            };

            // Outcome is reported by postinstall; exit status stays zero either way
            let _ = postinstall(runtime, options).await;
        }
        Commands::Formula(args) => {
            let source = ReleaseSource::with_base_url(cli.base_url);
            let version = parse_release(&args.release);
            let rendered = Formula::from_dist(&runtime, &source, &version, &args.dist)?.render()?;

            match args.output {
                Some(path) => {
                    runtime
                        .write(&path, rendered.as_bytes())
                        .with_context(|| format!("Failed to write formula to {:?}", path))?;
                    println!("Wrote formula to {}", path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Version => {
            println!("{}", devx_install::version_line("devx-install", devx_install::VERSION));
        }
    }
    Ok(())
}

fn parse_release(raw: &str) -> ReleaseVersion {
    let Ok(version) = raw.parse::<ReleaseVersion>();
    version
}
