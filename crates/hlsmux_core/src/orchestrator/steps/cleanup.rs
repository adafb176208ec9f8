//! Cleanup step - removes the run's temporary files.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{CleanupOutput, Context, RunState, StepOutcome};

/// Deletes segments, manifest and audio by name.
///
/// Only files whose names the workspace itself produces are touched. The
/// directory is removed as well when this run created it and nothing else
/// is left in it.
pub struct CleanupStep;

impl CleanupStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanupStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CleanupStep {
    fn name(&self) -> &str {
        "Cleanup"
    }

    fn description(&self) -> &str {
        "Clean up workspace"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let report = ctx.workspace.cleanup(state.created_workspace())?;

        ctx.logger.info(&format!(
            "Removed {} temporary file(s)",
            report.removed.len()
        ));
        if report.removed_dir {
            ctx.logger.debug(&format!(
                "Removed workspace {}",
                ctx.workspace.dir().display()
            ));
        }

        state.cleanup = Some(CleanupOutput {
            removed: report.removed,
            removed_dir: report.removed_dir,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, _state: &RunState) -> StepResult<()> {
        let left = ctx
            .workspace
            .artifacts()
            .map_err(|e| StepError::io_error("listing workspace", e))?;
        if let Some(first) = left.first() {
            return Err(StepError::invalid_output(format!(
                "{} temporary file(s) left behind, first: {}",
                left.len(),
                first.display()
            )));
        }
        Ok(())
    }
}
