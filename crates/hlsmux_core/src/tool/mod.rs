//! External media tool integration.
//!
//! Everything that touches the ffmpeg binary lives here: locating it,
//! building command lines and running them.

mod invocation;
mod locate;
mod runner;

pub use invocation::ToolInvocation;
pub use locate::{resolve_tool, resolve_with, DEFAULT_TOOL_NAME, TOOL_ENV_VAR};
pub use runner::{probe_version, FfmpegRunner, ToolOutput, ToolRunner};

use std::io;
use std::path::Path;

use thiserror::Error;

/// Errors from running the media tool itself.
///
/// A tool that runs and exits non-zero is not a `ToolError`; that is
/// reported through [`ToolOutput::exit_code`].
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Media tool not found: {0}")]
    NotFound(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    #[error("{program} exited with code {exit_code}")]
    Failed { program: String, exit_code: i32 },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    /// Classify a spawn failure; a missing executable becomes `NotFound`.
    pub fn spawn(program: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(program.display().to_string())
        } else {
            Self::Spawn {
                program: program.display().to_string(),
                source,
            }
        }
    }

    pub fn io(program: &Path, source: io::Error) -> Self {
        Self::Io {
            program: program.display().to_string(),
            source,
        }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
