//! Audio step - transcodes the playlist's audio to a standalone AAC file.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AudioOutput, Context, RunState, StepOutcome};
use crate::tool::ToolInvocation;

use super::require_workspace;

/// Fetches the playlist a second time, keeping only audio.
pub struct AudioStep;

impl AudioStep {
    pub fn new() -> Self {
        Self
    }

    fn build_invocation(ctx: &Context) -> ToolInvocation {
        let audio = &ctx.settings.audio;
        ctx.invocation("audio")
            .arg("-i")
            .source(&ctx.source)
            .args([
                "-c:a",
                audio.codec.as_str(),
                "-b:a",
                audio.bitrate.as_str(),
                "-vn",
            ])
            .path_arg(&ctx.workspace.audio_path())
    }
}

impl Default for AudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AudioStep {
    fn name(&self) -> &str {
        "Audio"
    }

    fn description(&self) -> &str {
        "Extract audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        require_workspace(ctx)
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let audio = &ctx.settings.audio;
        ctx.logger.info(&format!(
            "Transcoding audio ({} @ {})",
            audio.codec, audio.bitrate
        ));

        let invocation = Self::build_invocation(ctx);
        let output = ctx.run_tool(&invocation)?;

        if !output.success() {
            return Err(StepError::audio_failed(
                output.exit_code,
                ctx.error_tail(&output),
            ));
        }

        state.audio = Some(AudioOutput {
            path: ctx.workspace.audio_path(),
            exit_code: output.exit_code,
            command: invocation.display(),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let audio = state
            .audio
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Audio output not recorded"))?;

        if !audio.path.is_file() {
            return Err(StepError::invalid_output(format!(
                "Audio file was not written: {}",
                audio.path.display()
            )));
        }
        Ok(())
    }
}
