//! Prepare step - creates the workspace and clears leftovers.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, PrepareOutput, RunState, StepOutcome};

/// Creates the workspace directory.
///
/// Segments, manifest or audio left by an interrupted run are removed so
/// they cannot end up in this run's manifest.
pub struct PrepareStep;

impl PrepareStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PrepareStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PrepareStep {
    fn name(&self) -> &str {
        "Prepare"
    }

    fn description(&self) -> &str {
        "Prepare workspace"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let dir = ctx.workspace.dir();
        if dir.exists() && !dir.is_dir() {
            return Err(StepError::invalid_input(format!(
                "Workspace path exists and is not a directory: {}",
                dir.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let dir = ctx.workspace.dir();

        let created = ctx
            .workspace
            .prepare()
            .map_err(|e| StepError::io_error("creating workspace", e))?;
        if created {
            ctx.logger
                .info(&format!("Created workspace {}", dir.display()));
        } else {
            ctx.logger
                .debug(&format!("Using existing workspace {}", dir.display()));
        }

        let stale = ctx.workspace.remove_stale()?;
        if !stale.is_empty() {
            ctx.logger.warn(&format!(
                "Removed {} leftover file(s) from an earlier run in {}",
                stale.len(),
                dir.display()
            ));
        }

        state.prepare = Some(PrepareOutput {
            dir: dir.to_path_buf(),
            created,
            stale_removed: stale.len(),
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        if state.prepare.is_none() {
            return Err(StepError::invalid_output("Prepare output not recorded"));
        }
        if !ctx.workspace.dir().is_dir() {
            return Err(StepError::invalid_output(format!(
                "Workspace was not created: {}",
                ctx.workspace.dir().display()
            )));
        }
        Ok(())
    }
}
