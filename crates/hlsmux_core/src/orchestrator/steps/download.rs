//! Download step - stream-copies the playlist into numbered segments.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, DownloadOutput, RunState, StepOutcome};
use crate::tool::ToolInvocation;
use crate::workspace::parse_segment_index;

use super::require_workspace;

/// Fetches the playlist and writes `segment_%03d.ts` files.
///
/// Streams are copied, not re-encoded. The `aac_adtstoasc` bitstream
/// filter converts ADTS-framed AAC to the form MP4 expects.
pub struct DownloadStep;

impl DownloadStep {
    pub fn new() -> Self {
        Self
    }

    fn build_invocation(ctx: &Context) -> ToolInvocation {
        ctx.invocation("download")
            .arg("-i")
            .source(&ctx.source)
            .args(["-c", "copy", "-bsf:a", "aac_adtstoasc"])
            .path_arg(&ctx.workspace.segment_pattern())
    }
}

impl Default for DownloadStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DownloadStep {
    fn name(&self) -> &str {
        "Download"
    }

    fn description(&self) -> &str {
        "Download segments"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        require_workspace(ctx)
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        ctx.logger
            .info(&format!("Downloading segments from {}", ctx.source));

        let invocation = Self::build_invocation(ctx);
        let output = ctx.run_tool(&invocation)?;

        if !output.success() {
            return Err(StepError::download_failed(
                output.exit_code,
                ctx.error_tail(&output),
            ));
        }

        state.download = Some(DownloadOutput {
            exit_code: output.exit_code,
            command: invocation.display(),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.download.is_none() {
            return Err(StepError::invalid_output("Download output not recorded"));
        }

        // Holes in the numbering are the Manifest step's to classify
        let artifacts = ctx
            .workspace
            .artifacts()
            .map_err(|e| StepError::io_error("listing workspace", e))?;
        let any_segment = artifacts.iter().any(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(parse_segment_index)
                .is_some()
        });
        if !any_segment {
            return Err(StepError::invalid_output(format!(
                "Download produced no segments in {}",
                ctx.workspace.dir().display()
            )));
        }
        Ok(())
    }
}
