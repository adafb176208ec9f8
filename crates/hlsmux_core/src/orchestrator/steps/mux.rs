//! Mux step - joins segments and audio into the final MP4.

use std::fs;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, MuxOutput, RunState, StepOutcome};
use crate::tool::ToolInvocation;

/// Concatenates the manifest's segments and adds the audio track.
pub struct MuxStep;

impl MuxStep {
    pub fn new() -> Self {
        Self
    }

    fn build_invocation(ctx: &Context) -> ToolInvocation {
        ctx.invocation("mux")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&ctx.workspace.manifest_path())
            .arg("-i")
            .path_arg(&ctx.workspace.audio_path())
            .args(["-c", "copy"])
            .path_arg(&ctx.output_path)
    }
}

impl Default for MuxStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MuxStep {
    fn name(&self) -> &str {
        "Mux"
    }

    fn description(&self) -> &str {
        "Mux MP4"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        for path in [ctx.workspace.manifest_path(), ctx.workspace.audio_path()] {
            if !path.is_file() {
                return Err(StepError::invalid_input(format!(
                    "Missing mux input: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        if let Some(missing) = state.segments().iter().find(|p| !p.is_file()) {
            return Err(StepError::invalid_input(format!(
                "Segment listed in manifest no longer exists: {}",
                missing.display()
            )));
        }

        if let Some(parent) = ctx.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StepError::io_error("creating output directory", e))?;
            }
        }

        ctx.logger.info(&format!(
            "Muxing {} segment(s) into {}",
            state.segments().len(),
            ctx.output_path.display()
        ));

        let invocation = Self::build_invocation(ctx);
        let output = ctx.run_tool(&invocation)?;

        if !output.success() {
            return Err(StepError::mux_failed(
                output.exit_code,
                ctx.error_tail(&output),
            ));
        }

        state.mux = Some(MuxOutput {
            output_path: ctx.output_path.clone(),
            exit_code: output.exit_code,
            command: invocation.display(),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let mux = state
            .mux
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Mux output not recorded"))?;

        if !mux.output_path.is_file() {
            return Err(StepError::invalid_output(format!(
                "Output file was not created: {}",
                mux.output_path.display()
            )));
        }
        Ok(())
    }
}
