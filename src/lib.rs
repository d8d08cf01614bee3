pub mod error;
pub mod formula;
pub mod http;
pub mod install;
pub mod platform;
pub mod release;
pub mod runtime;
pub mod shim;

/// Version of this installer, derived from git tags at build time.
pub const VERSION: &str = env!("DEVX_INSTALL_VERSION");

/// The `version` subcommand output: `<tool> v<version>`.
pub fn version_line(tool_name: &str, version: &str) -> String {
    format!("{} v{}", tool_name, version.strip_prefix('v').unwrap_or(version))
}
