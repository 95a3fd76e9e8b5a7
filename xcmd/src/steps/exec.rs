//! `exec` steps: pick the OS variant, optionally confirm, then run it.

use anyhow::{Context, Result};
use tracing::debug;

use crate::command::ExecStep;
use crate::core::confirm::{RiskLevel, accepts};
use crate::core::context::PipelineContext;
use crate::core::interpolate::interpolate;
use crate::core::template::Platform;
use crate::io::console;
use crate::io::shell::ShellMode;
use crate::steps::{Runtime, StepResult};

pub const DRY_RUN_OUTPUT: &str = "[dry run - no output]";

/// The OS-specific variant if one is set, else the default command.
pub fn select_command(step: &ExecStep, platform: Platform) -> &str {
    let variant = match platform {
        Platform::Windows => step.windows.as_str(),
        Platform::Darwin => step.darwin.as_str(),
        Platform::Linux => step.linux.as_str(),
        Platform::Other => "",
    };
    if variant.is_empty() {
        &step.command
    } else {
        variant
    }
}

/// How the shell should run an exec step.
///
/// The last step of a top-level run gets the terminal. When a parent pipeline
/// needs its output it streams instead. Earlier steps stream unless silent.
pub fn exec_mode(silent: bool, is_last: bool, capture: bool) -> ShellMode {
    match (is_last && !silent, capture, silent) {
        (true, true, _) => ShellMode::Streaming,
        (true, false, _) => ShellMode::Interactive,
        (false, _, true) => ShellMode::Silent,
        (false, _, false) => ShellMode::Streaming,
    }
}

pub fn run(
    rt: &Runtime<'_>,
    step: &ExecStep,
    ctx: &PipelineContext,
    is_last: bool,
    capture: bool,
) -> Result<StepResult> {
    let platform = rt.values.sample().platform();
    let command = interpolate(select_command(step, platform), ctx).context("interpolate command")?;
    // Annotations are best-effort; an unresolvable reference just hides the line.
    let annotate = |text: &str| interpolate(text, ctx).unwrap_or_default();

    rt.debug(&format!("Command: {command}"));
    rt.debug(&format!(
        "Confirm: {}, Silent: {}, IsLastStep: {is_last}, CaptureOutput: {capture}",
        step.confirm, step.silent
    ));

    if rt.options.dry_run {
        console::dry_run(format!("Would execute: {command}"));
        let summary = annotate(&step.summary);
        if !summary.is_empty() {
            console::dry_run(format!("Summary: {summary}"));
        }
        let risk = annotate(&step.risk);
        if !risk.is_empty() {
            console::dry_run(format!("Risk: {risk}"));
        }
        return Ok(StepResult::Output(DRY_RUN_OUTPUT.to_string()));
    }

    if step.confirm {
        let summary = annotate(&step.summary);
        let risk = annotate(&step.risk);
        let safer = annotate(&step.safer);
        console::print_confirm_info(&summary, &risk, &safer);
        console::print_command_for_confirm(&command);

        let default = RiskLevel::parse(&risk).default_answer();
        let answer = rt
            .prompter
            .ask(&format!("Run this command? {}: ", default.hint()))?;
        if !accepts(&answer, default) {
            debug!(risk = %risk, "exec step declined");
            return Ok(StepResult::Cancelled);
        }
        println!();
    }

    let mode = exec_mode(step.silent, is_last, capture);
    if !step.silent && !step.confirm {
        console::print_exec_command(&command);
    }
    debug!(mode = mode.as_str(), "running exec step");
    rt.shell.run(&command, mode).map(StepResult::Output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> ExecStep {
        ExecStep {
            command: "cat file".to_string(),
            windows: "type file".to_string(),
            darwin: String::new(),
            ..ExecStep::default()
        }
    }

    #[test]
    fn select_command_prefers_platform_variant() {
        assert_eq!(select_command(&step(), Platform::Windows), "type file");
        assert_eq!(select_command(&step(), Platform::Darwin), "cat file");
        assert_eq!(select_command(&step(), Platform::Linux), "cat file");
        assert_eq!(select_command(&step(), Platform::Other), "cat file");
    }

    #[test]
    fn exec_mode_table() {
        // (silent, is_last, capture)
        assert_eq!(exec_mode(false, true, false), ShellMode::Interactive);
        assert_eq!(exec_mode(false, true, true), ShellMode::Streaming);
        assert_eq!(exec_mode(true, true, false), ShellMode::Silent);
        assert_eq!(exec_mode(true, true, true), ShellMode::Silent);
        assert_eq!(exec_mode(false, false, false), ShellMode::Streaming);
        assert_eq!(exec_mode(false, false, true), ShellMode::Streaming);
        assert_eq!(exec_mode(true, false, false), ShellMode::Silent);
    }
}
