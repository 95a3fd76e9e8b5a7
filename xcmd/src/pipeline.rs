//! Orchestration for one command invocation.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::command::Command;
use crate::core::args::bind_args;
use crate::core::context::PipelineContext;
use crate::core::errors::StepFailure;
use crate::io::console;
use crate::steps::{Runtime, StepResult, run_step};

/// Result of a whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Output of the last step (empty for an interactive last step).
    Completed(String),
    /// A confirmation was declined; later steps did not run.
    Cancelled,
}

/// Run every step of `command` in order with a fresh context.
///
/// `capture_output` is set for nested calls: the last exec step then streams
/// and captures instead of taking over the terminal. Any step failure aborts
/// the pipeline, wrapped in a [`StepFailure`] naming the step. Re-entering a
/// command that is already running fails with a `CommandCycleError`.
#[instrument(skip_all, fields(command = name, steps = command.steps.len(), capture_output = capture_output))]
pub fn run_pipeline(
    rt: &Runtime<'_>,
    name: &str,
    command: &Command,
    user_args: &[String],
    capture_output: bool,
) -> Result<PipelineOutcome> {
    let _frame = rt.enter(name)?;
    if rt.options.dry_run {
        console::dry_run("Dry run mode - no commands will be executed");
    }
    rt.debug(&format!("Starting pipeline with {} steps", command.steps.len()));
    rt.debug(&format!("User args: {user_args:?}"));

    let args = bind_args(&command.args, user_args)?;
    rt.debug(&format!("Parsed args: {args:?}"));
    let mut ctx = PipelineContext::new(args).with_dry_run(rt.options.dry_run);

    let total = command.steps.len();
    for (index, step) in command.steps.iter().enumerate() {
        let label = step.label(index);
        let kind = step.kind();
        if rt.options.debug {
            println!();
        }
        rt.debug(&format!("=== Step {}: {kind} (id={label}) ===", index + 1));
        debug!(step = index + 1, %kind, id = %label, "running step");

        let is_last = index + 1 == total;
        let result = run_step(rt, step, &ctx, is_last, capture_output).map_err(|err| {
            err.context(StepFailure {
                number: index + 1,
                kind,
                label: label.clone(),
            })
        })?;

        let output = match result {
            StepResult::Output(output) => output,
            StepResult::Cancelled => {
                debug!(step = index + 1, "pipeline cancelled");
                return Ok(PipelineOutcome::Cancelled);
            }
        };
        rt.debug(&format!("Step output length: {} bytes", output.len()));
        ctx.record(step.id.as_deref(), output);
    }

    if rt.options.dry_run {
        console::dry_run("Dry run complete");
    }
    Ok(PipelineOutcome::Completed(ctx.last_output))
}
