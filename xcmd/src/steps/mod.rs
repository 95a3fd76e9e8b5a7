//! Step executors and the collaborators they share.

pub mod agentic;
pub mod exec;
pub mod llm;
pub mod subcommand;
pub mod tools;

use std::cell::RefCell;

use anyhow::Result;

use crate::command::{CommandSet, Step, StepAction};
use crate::core::context::PipelineContext;
use crate::core::errors::{CommandCycleError, InterpolationError};
use crate::core::interpolate::interpolate;
use crate::io::config::Settings;
use crate::io::confirm::Prompter;
use crate::io::console;
use crate::io::environment::ValueProvider;
use crate::io::llm::{LlmClient, MessagesRequest, MessagesResponse};
use crate::io::shell::Shell;
use crate::io::usage::UsageRecorder;

/// Switches and limits that apply to every step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Validate interpolation and describe each step without side effects.
    pub dry_run: bool,
    /// Print `[DEBUG]` trace lines.
    pub debug: bool,
    pub model: String,
    pub max_tokens: u32,
    pub agentic_max_tokens: u32,
    pub default_max_iterations: u32,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings, dry_run: bool, debug: bool) -> Self {
        Self {
            dry_run,
            debug,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            agentic_max_tokens: settings.agentic_max_tokens,
            default_max_iterations: settings.default_max_iterations,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), false, false)
    }
}

/// Everything a step may touch, borrowed for one top-level run.
pub struct Runtime<'a> {
    pub commands: &'a CommandSet,
    pub llm: &'a dyn LlmClient,
    pub shell: &'a dyn Shell,
    pub prompter: &'a dyn Prompter,
    pub values: &'a dyn ValueProvider,
    pub usage: &'a dyn UsageRecorder,
    pub options: RunOptions,
    /// Names of the commands currently running, outermost first.
    pub call_stack: RefCell<Vec<String>>,
}

impl Runtime<'_> {
    /// Mark `name` as running until the returned frame drops.
    pub fn enter(&self, name: &str) -> Result<CallFrame<'_>, CommandCycleError> {
        let mut stack = self.call_stack.borrow_mut();
        if stack.iter().any(|active| active == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(CommandCycleError { chain });
        }
        stack.push(name.to_string());
        Ok(CallFrame {
            stack: &self.call_stack,
        })
    }

    /// Static placeholders with freshly sampled values, then dynamic references.
    pub fn render(&self, text: &str, ctx: &PipelineContext) -> Result<String, InterpolationError> {
        let with_env = self.values.sample().apply(text);
        interpolate(&with_env, ctx)
    }

    /// Send a request and record its usage.
    pub fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let response = self.llm.send(request)?;
        self.usage.record(&response.usage);
        Ok(response)
    }

    pub fn debug(&self, message: &str) {
        if self.options.debug {
            console::debug_block(message, "");
        }
    }

    pub fn debug_block(&self, label: &str, body: &str) {
        if self.options.debug {
            console::debug_block(label, body);
        }
    }
}

/// Pops its command off [`Runtime::call_stack`] on drop.
pub struct CallFrame<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Output(String),
    /// The user declined a confirmation; nothing after this step runs.
    Cancelled,
}

/// Dispatch one step to its executor.
///
/// `is_last` and `capture` only matter to exec steps, which pick an execution
/// mode from them.
pub fn run_step(
    rt: &Runtime<'_>,
    step: &Step,
    ctx: &PipelineContext,
    is_last: bool,
    capture: bool,
) -> Result<StepResult> {
    match &step.action {
        StepAction::Exec(exec) => exec::run(rt, exec, ctx, is_last, capture),
        StepAction::Llm(llm) => llm::run(rt, llm, ctx).map(StepResult::Output),
        StepAction::Agentic(agentic) => {
            agentic::run(rt, agentic, ctx).map(|outcome| StepResult::Output(outcome.output))
        }
        StepAction::Subcommand(subcommand) => subcommand::run(rt, subcommand, ctx),
    }
}
