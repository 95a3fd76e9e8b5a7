//! `subcommand` steps: run another command and return its output.

use anyhow::{Context, Result};

use crate::command::SubcommandStep;
use crate::core::context::PipelineContext;
use crate::io::console;
use crate::pipeline::{PipelineOutcome, run_pipeline};
use crate::steps::{Runtime, StepResult};

pub const DRY_RUN_OUTPUT: &str = "[dry run - no command execution]";

pub fn run(rt: &Runtime<'_>, step: &SubcommandStep, ctx: &PipelineContext) -> Result<StepResult> {
    let command = rt.commands.resolve(&step.name)?;

    let args = step
        .args
        .iter()
        .map(|arg| {
            rt.render(arg, ctx)
                .with_context(|| format!("interpolate arg {arg:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    rt.debug(&format!("Calling command: {} with args: {args:?}", step.name));

    if rt.options.dry_run {
        console::dry_run(format!("Would call command: {} {args:?}", step.name));
        return Ok(StepResult::Output(DRY_RUN_OUTPUT.to_string()));
    }

    if !step.silent {
        console::print_running_command(&step.name, &args);
    }

    // Nested runs always capture so the output can flow back into this pipeline.
    let outcome = run_pipeline(rt, &step.name, command, &args, true)
        .with_context(|| format!("command {} failed", step.name))?;
    Ok(match outcome {
        PipelineOutcome::Completed(output) => StepResult::Output(output),
        PipelineOutcome::Cancelled => StepResult::Cancelled,
    })
}
