//! Finding the media tool executable.
//!
//! Resolution order:
//! 1. Explicit path (config file or command line)
//! 2. `HLSMUX_FFMPEG` environment variable
//! 3. First `ffmpeg` found on `PATH`

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ToolError, ToolResult};

/// Environment variable overriding the tool location.
pub const TOOL_ENV_VAR: &str = "HLSMUX_FFMPEG";

/// Executable name searched on `PATH`.
#[cfg(windows)]
pub const DEFAULT_TOOL_NAME: &str = "ffmpeg.exe";
#[cfg(not(windows))]
pub const DEFAULT_TOOL_NAME: &str = "ffmpeg";

/// Resolve the tool using the process environment.
pub fn resolve_tool(configured: Option<&Path>) -> ToolResult<PathBuf> {
    resolve_with(
        configured,
        env::var_os(TOOL_ENV_VAR),
        env::var_os("PATH"),
    )
}

/// Resolve the tool from explicit inputs.
pub fn resolve_with(
    configured: Option<&Path>,
    env_override: Option<OsString>,
    path_var: Option<OsString>,
) -> ToolResult<PathBuf> {
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        tracing::debug!("Using configured media tool: {}", path.display());
        return Ok(path.to_path_buf());
    }

    if let Some(value) = env_override.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        tracing::debug!("Using media tool from {}: {}", TOOL_ENV_VAR, path.display());
        return Ok(path);
    }

    if let Some(paths) = path_var {
        for dir in env::split_paths(&paths) {
            let candidate = dir.join(DEFAULT_TOOL_NAME);
            if candidate.is_file() {
                tracing::debug!("Found media tool on PATH: {}", candidate.display());
                return Ok(candidate);
            }
        }
    }

    Err(ToolError::NotFound(format!(
        "{} (set tool.ffmpeg_path or {}, or add it to PATH)",
        DEFAULT_TOOL_NAME, TOOL_ENV_VAR
    )))
}
