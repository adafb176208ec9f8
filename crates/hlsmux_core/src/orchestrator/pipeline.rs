//! Sequential step runner.

use serde::Serialize;

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::PipelineStep;
use super::types::{Context, RunState, StepOutcome};

/// Ordered list of steps run against one context.
///
/// A step only starts after every earlier one succeeded; the first
/// error ends the run.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// Progress is reported as the share of steps started, then 100 once
    /// the last step is done.
    pub fn run(&self, ctx: &Context, state: &mut RunState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();
        let count = self.steps.len().max(1) as u32;

        for (index, step) in (0u32..).zip(&self.steps) {
            let name = step.name();
            ctx.logger.phase(step.description());
            ctx.report_progress(name, index * 100 / count, &format!("Starting {}", name));

            match run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{} completed", name));
                    result.steps_completed.push(name.to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{} skipped: {}", name, reason));
                    result.steps_skipped.push(name.to_string());
                }
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", name, e));
                    return Err(PipelineError::step_failed(&ctx.job_name, name, e));
                }
            }
        }

        ctx.report_progress("Complete", 100, "Pipeline finished");
        ctx.logger.success("All steps completed");
        Ok(result)
    }
}

fn run_step(
    step: &dyn PipelineStep,
    ctx: &Context,
    state: &mut RunState,
) -> StepResult<StepOutcome> {
    ctx.logger.debug(&format!("{}: checking inputs", step.name()));
    step.validate_input(ctx)?;

    let outcome = step.execute(ctx, state)?;
    if outcome == StepOutcome::Success {
        ctx.logger.debug(&format!("{}: checking outputs", step.name()));
        step.validate_output(ctx, state)?;
    }
    Ok(outcome)
}

/// Which steps ran and how.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// No step was skipped.
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }
}
