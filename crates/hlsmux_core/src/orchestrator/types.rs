//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::logging::RunLogger;
use crate::source::SourceUrl;
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};
use crate::workspace::{SegmentGap, Workspace};

use super::errors::StepResult;
use super::pipeline::PipelineRunResult;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Contains run configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `RunState`.
pub struct Context {
    /// Playlist to convert.
    pub source: SourceUrl,
    /// Final MP4 path.
    pub output_path: PathBuf,
    /// Effective settings for this run.
    pub settings: Settings,
    /// Run name/identifier.
    pub job_name: String,
    /// Temporary workspace.
    pub workspace: Workspace,
    /// Runs the media tool.
    pub tool: Arc<dyn ToolRunner>,
    /// Resolved media tool executable.
    pub program: PathBuf,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: SourceUrl,
        output_path: PathBuf,
        settings: Settings,
        job_name: impl Into<String>,
        workspace: Workspace,
        tool: Arc<dyn ToolRunner>,
        program: PathBuf,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            source,
            output_path,
            settings,
            job_name: job_name.into(),
            workspace,
            tool,
            program,
            logger,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to the logger and the callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        self.logger.progress(percent);
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Start an invocation of the media tool with the common leading flags.
    ///
    /// `-nostdin`, then `-y` when overwriting, then `-loglevel`. Step
    /// specific arguments are appended by the caller.
    pub fn invocation(&self, label: &str) -> ToolInvocation {
        let tool = &self.settings.tool;
        let mut invocation = ToolInvocation::new(label, &self.program).arg("-nostdin");
        if tool.overwrite {
            invocation = invocation.arg("-y");
        }
        if !tool.log_level.is_empty() {
            invocation = invocation.args(["-loglevel", tool.log_level.as_str()]);
        }
        invocation
    }

    /// Run a tool invocation, logging the redacted command and its output.
    ///
    /// A non-zero exit is returned as output, not as an error.
    pub fn run_tool(&self, invocation: &ToolInvocation) -> StepResult<ToolOutput> {
        self.logger.command(&invocation.display());
        if self.settings.logging.show_command_pretty {
            self.logger
                .command_pretty(&invocation.display_program(), &invocation.display_args());
        }

        self.logger.clear_tail();
        let output = self.tool.run(invocation)?;

        for line in &output.stdout {
            self.logger.output_line(line, false);
        }
        for line in &output.stderr {
            self.logger.output_line(line, true);
        }

        if !output.success() {
            self.logger
                .show_tail(&format!("{} output", invocation.label));
        }
        Ok(output)
    }

    /// Stderr lines kept for an error message.
    pub fn error_tail(&self, output: &ToolOutput) -> String {
        output.stderr_tail((self.settings.logging.error_tail as usize).max(1))
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// Each step's output is stored in its own section and written once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare: Option<PrepareOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<MuxOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutput>,
}

impl RunState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Segments listed in the manifest, empty before the Manifest step.
    pub fn segments(&self) -> &[PathBuf] {
        self.manifest
            .as_ref()
            .map(|m| m.segments.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the workspace directory was created by this run.
    pub fn created_workspace(&self) -> bool {
        self.prepare.as_ref().is_some_and(|p| p.created)
    }
}

/// Output from the Prepare step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareOutput {
    /// Workspace directory.
    pub dir: PathBuf,
    /// The directory did not exist before this run.
    pub created: bool,
    /// Leftover artifacts removed before starting.
    pub stale_removed: usize,
}

/// Output from the Download step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOutput {
    /// Tool exit code.
    pub exit_code: i32,
    /// Command that was run (redacted).
    pub command: String,
}

/// Output from the Manifest step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOutput {
    /// Path to the concat manifest.
    pub path: PathBuf,
    /// Segments listed, in order.
    pub segments: Vec<PathBuf>,
    /// The scan stopped at the configured upper bound.
    pub limit_reached: bool,
    /// Hole that truncated the list, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<SegmentGap>,
}

impl ManifestOutput {
    pub fn entries(&self) -> usize {
        self.segments.len()
    }
}

/// Output from the Audio step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioOutput {
    /// Path to the transcoded audio.
    pub path: PathBuf,
    pub exit_code: i32,
    pub command: String,
}

/// Output from the Mux step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxOutput {
    /// Path to final MP4.
    pub output_path: PathBuf,
    pub exit_code: i32,
    pub command: String,
}

/// Output from the Cleanup step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupOutput {
    /// Files removed.
    pub removed: Vec<PathBuf>,
    /// The workspace directory itself was removed.
    pub removed_dir: bool,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (nothing to do, not an error).
    Skipped(String),
}

/// Summary of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    /// Run name, also the log file stem.
    pub run_name: String,
    /// Final MP4 path.
    pub output_path: PathBuf,
    /// Per-run log file.
    pub log_path: PathBuf,
    /// Steps that ran.
    pub pipeline: PipelineRunResult,
    /// What each step produced.
    pub state: RunState,
}

impl ConvertReport {
    /// Number of segments muxed.
    pub fn segment_count(&self) -> usize {
        self.state.segments().len()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
