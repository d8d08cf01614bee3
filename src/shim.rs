//! Fixed, extension-free command name for the installed binary.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::platform::Os;
use crate::runtime::Runtime;

/// Permission bits applied to installed executables.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// How `<root>/<tool>` is made to resolve to the fetched binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimStrategy {
    /// Executables carry no extension; the command path holds a copy of the binary.
    CopyInPlace,
    /// Executables carry `.exe`; the command path is a `.cmd` script forwarding to it.
    ForwardingScript,
}

impl ShimStrategy {
    pub fn for_os(os: Os) -> Self {
        match os {
            Os::Windows => ShimStrategy::ForwardingScript,
            Os::Linux | Os::Darwin => ShimStrategy::CopyInPlace,
        }
    }

    /// Path the fixed command name resolves through.
    pub fn command_path(&self, install_root: &Path, tool_name: &str) -> PathBuf {
        match self {
            ShimStrategy::CopyInPlace => install_root.join(tool_name),
            ShimStrategy::ForwardingScript => install_root.join(format!("{}.cmd", tool_name)),
        }
    }

    /// Create the shim for `binary`, which must already be executable.
    ///
    /// Returns the shim path, or `None` when the binary itself sits at the
    /// command path.
    #[tracing::instrument(skip(self, runtime))]
    pub fn apply<R: Runtime>(
        &self,
        runtime: &R,
        binary: &Path,
        install_root: &Path,
        tool_name: &str,
    ) -> Result<Option<PathBuf>> {
        let command_path = self.command_path(install_root, tool_name);

        match self {
            ShimStrategy::CopyInPlace => {
                if command_path == binary {
                    debug!("{:?} is already the command entry, no shim needed", binary);
                    return Ok(None);
                }

                runtime
                    .copy(binary, &command_path)
                    .with_context(|| format!("Failed to copy {:?} to {:?}", binary, command_path))?;
                runtime.set_permissions(&command_path, EXECUTABLE_MODE)?;
            }
            ShimStrategy::ForwardingScript => {
                let binary_name = binary
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| anyhow::anyhow!("Invalid binary path {:?}", binary))?;

                runtime
                    .write(&command_path, forwarding_script(binary_name).as_bytes())
                    .with_context(|| format!("Failed to write shim {:?}", command_path))?;
            }
        }

        debug!("Created shim {:?} -> {:?}", command_path, binary);
        Ok(Some(command_path))
    }
}

/// Batch script that runs `binary_name` from the script's own directory with all arguments.
pub fn forwarding_script(binary_name: &str) -> String {
    format!("@echo off\r\n\"%~dp0{}\" %*\r\n", binary_name)
}
