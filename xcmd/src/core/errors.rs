//! Typed failures raised by the pipeline engine.
//!
//! These travel inside `anyhow::Error`; callers recover them with
//! `downcast_ref`. Transport-level failures live next to their adapters
//! (`io::shell::ShellExecutionError`, `io::llm::LlmRequestError`).

use thiserror::Error;

use crate::command::StepKind;

/// The user supplied fewer positional tokens than the command declares.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required argument: {name}")]
pub struct MissingArgumentError {
    pub name: String,
}

/// A `{{steps.<id>.<field>}}` or `{{output.<field>}}` reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot access {placeholder}: {reason}")]
pub struct InterpolationError {
    /// The placeholder exactly as written, e.g. `{{output.path}}`.
    pub placeholder: String,
    pub reason: String,
}

/// A step declares no variant, or more than one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command {command:?} step {step}: {reason}")]
pub struct InvalidStepError {
    pub command: String,
    /// 1-based step number.
    pub step: usize,
    pub reason: String,
}

/// A subcommand step (or the CLI) names a command that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command not found: {name}")]
pub struct CommandNotFoundError {
    pub name: String,
}

/// A subcommand step re-entered a command that is still running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command cycle: {}", chain.join(" -> "))]
pub struct CommandCycleError {
    /// Active commands, outermost first, ending with the re-entered name.
    pub chain: Vec<String>,
}

/// Context attached by the orchestrator to any failing step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {number} ({kind}, id={label}) failed")]
pub struct StepFailure {
    /// 1-based step number.
    pub number: usize,
    pub kind: StepKind,
    pub label: String,
}
