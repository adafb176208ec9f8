//! Error types for the conversion pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::tool::ToolError;
use crate::workspace::CleanupError;

/// Coarse failure category, stable for callers and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    Setup,
    Download,
    Manifest,
    Audio,
    Mux,
    Cleanup,
    Tool,
    Io,
    Other,
}

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Input validation failed before the pipeline started.
    #[error("Run '{job_name}' failed validation: {message}")]
    ValidationFailed { job_name: String, message: String },

    /// Failed to set up the run (workspace, log file).
    #[error("Run '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },

    /// The media tool could not be located.
    #[error("Run '{job_name}' cannot start: {source}")]
    ToolNotFound {
        job_name: String,
        #[source]
        source: ToolError,
    },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a validation failed error.
    pub fn validation_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn tool_not_found(job_name: impl Into<String>, source: ToolError) -> Self {
        Self::ToolNotFound {
            job_name: job_name.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::StepFailed { source, .. } => source.kind(),
            Self::ValidationFailed { .. } => FailureKind::InvalidInput,
            Self::SetupFailed { .. } => FailureKind::Setup,
            Self::ToolNotFound { .. } => FailureKind::Tool,
        }
    }

    /// Name of the failed step, if a step failed.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_name, .. } => Some(step_name),
            _ => None,
        }
    }

    /// The underlying step error, if a step failed.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// Segment download exited non-zero or produced nothing.
    #[error("Segment download failed with exit code {exit_code}: {message}")]
    DownloadFailed { exit_code: i32, message: String },

    /// The segment sequence has a hole.
    #[error("Segment {missing:03} is missing but segment {next_present:03} exists")]
    ManifestGap { missing: u32, next_present: u32 },

    /// No segments to concatenate.
    #[error("No segments found in {}", .dir.display())]
    ManifestEmpty { dir: PathBuf },

    /// Audio transcode exited non-zero.
    #[error("Audio extraction failed with exit code {exit_code}: {message}")]
    AudioExtractFailed { exit_code: i32, message: String },

    /// Final mux exited non-zero.
    #[error("Mux failed with exit code {exit_code}: {message}")]
    MuxFailed { exit_code: i32, message: String },

    /// A workspace file could not be removed.
    #[error("Cleanup failed for {}: {source}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The media tool could not be found or started.
    #[error("Media tool unavailable: {0}")]
    ToolNotFound(String),

    /// The media tool ran past the configured timeout.
    #[error("{tool} timed out after {timeout_secs}s")]
    ToolTimedOut { tool: String, timeout_secs: u64 },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn download_failed(exit_code: i32, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            exit_code,
            message: message.into(),
        }
    }

    pub fn audio_failed(exit_code: i32, message: impl Into<String>) -> Self {
        Self::AudioExtractFailed {
            exit_code,
            message: message.into(),
        }
    }

    pub fn mux_failed(exit_code: i32, message: impl Into<String>) -> Self {
        Self::MuxFailed {
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::DownloadFailed { .. } => FailureKind::Download,
            Self::ManifestGap { .. } | Self::ManifestEmpty { .. } => FailureKind::Manifest,
            Self::AudioExtractFailed { .. } => FailureKind::Audio,
            Self::MuxFailed { .. } => FailureKind::Mux,
            Self::CleanupFailed { .. } => FailureKind::Cleanup,
            Self::ToolNotFound(_) | Self::ToolTimedOut { .. } => FailureKind::Tool,
            Self::IoError { .. } => FailureKind::Io,
            Self::InvalidOutput(_) | Self::Other(_) => FailureKind::Other,
        }
    }
}

impl From<ToolError> for StepError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::TimedOut {
                program,
                timeout_secs,
            } => Self::ToolTimedOut {
                tool: program,
                timeout_secs,
            },
            ToolError::Io { program, source } => Self::IoError {
                operation: format!("running {}", program),
                source,
            },
            other => Self::ToolNotFound(other.to_string()),
        }
    }
}

impl From<CleanupError> for StepError {
    fn from(err: CleanupError) -> Self {
        Self::CleanupFailed {
            path: err.path,
            source: err.source,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::download_failed(1, "Server returned 403 Forbidden");
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("403 Forbidden"));
        assert_eq!(err.kind(), FailureKind::Download);
    }

    #[test]
    fn gap_error_names_indices() {
        let err = StepError::ManifestGap {
            missing: 4,
            next_present: 5,
        };
        assert_eq!(
            err.to_string(),
            "Segment 004 is missing but segment 005 exists"
        );
        assert_eq!(err.kind(), FailureKind::Manifest);
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::mux_failed(1, "Invalid data found");
        let pipeline_err = PipelineError::step_failed("output-run", "Mux", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("output-run"));
        assert!(msg.contains("Mux"));
        assert_eq!(pipeline_err.kind(), FailureKind::Mux);
        assert_eq!(pipeline_err.step_name(), Some("Mux"));
    }

    #[test]
    fn tool_errors_convert() {
        let timed_out: StepError = ToolError::TimedOut {
            program: "ffmpeg".to_string(),
            timeout_secs: 30,
        }
        .into();
        assert_eq!(timed_out.kind(), FailureKind::Tool);

        let missing: StepError = ToolError::NotFound("ffmpeg".to_string()).into();
        assert!(matches!(missing, StepError::ToolNotFound(_)));
    }

    #[test]
    fn cleanup_error_converts() {
        let err: StepError = CleanupError {
            path: PathBuf::from("temp/audio.aac"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::Cleanup);
        assert!(err.to_string().contains("audio.aac"));
    }

    #[test]
    fn validation_kind() {
        let err = PipelineError::validation_failed("run", "bad url");
        assert_eq!(err.kind(), FailureKind::InvalidInput);
        assert!(err.step_error().is_none());

        let err = PipelineError::tool_not_found("run", ToolError::NotFound("ffmpeg".into()));
        assert_eq!(err.kind(), FailureKind::Tool);
    }
}
