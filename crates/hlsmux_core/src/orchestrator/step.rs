//! The contract every stage of a run fulfils.

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome};

/// One stage of a conversion run.
///
/// [`Pipeline`](super::Pipeline) drives a step as check, work, check:
/// `validate_input` sees only the context, `execute` records what it
/// produced in `RunState`, and `validate_output` confirms that record
/// matches the filesystem. `validate_output` is skipped when `execute`
/// reports [`StepOutcome::Skipped`].
pub trait PipelineStep: Send + Sync {
    /// Short name used in errors and the run report.
    fn name(&self) -> &str;

    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Phase banner written to the run log.
    fn description(&self) -> &str {
        self.name()
    }
}
