//! Scripted collaborators and builders for pipeline tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::command::{
    AgenticStep, ArgSpec, Command, CommandSet, ExecStep, LlmStep, Step, StepAction,
    SubcommandStep,
};
use crate::core::template::TemplateValues;
use crate::io::confirm::Prompter;
use crate::io::environment::ValueProvider;
use crate::io::llm::{
    ContentBlock, LlmClient, MessagesRequest, MessagesResponse, STOP_END_TURN, TokenUsage,
};
use crate::io::shell::{Shell, ShellExecutionError, ShellMode};
use crate::io::usage::UsageRecorder;
use crate::pipeline::{PipelineOutcome, run_pipeline};
use crate::steps::{RunOptions, Runtime};

/// Returns queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: RefCell<VecDeque<MessagesResponse>>,
    requests: RefCell<Vec<MessagesRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<MessagesResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::default(),
        }
    }

    pub fn requests(&self) -> Vec<MessagesRequest> {
        self.requests.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl LlmClient for ScriptedLlm {
    fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left"))
    }
}

/// Scripted shell outcome.
pub enum ShellScript {
    Output(String),
    Exit { code: i32, output: String },
}

/// Records `(command, mode)` pairs; returns queued outcomes, then empty output.
#[derive(Default)]
pub struct ScriptedShell {
    outcomes: RefCell<VecDeque<ShellScript>>,
    calls: RefCell<Vec<(String, ShellMode)>>,
}

impl ScriptedShell {
    pub fn new(outcomes: Vec<ShellScript>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::default(),
        }
    }

    pub fn outputs(outputs: &[&str]) -> Self {
        Self::new(
            outputs
                .iter()
                .map(|o| ShellScript::Output(o.to_string()))
                .collect(),
        )
    }

    pub fn calls(&self) -> Vec<(String, ShellMode)> {
        self.calls.borrow().clone()
    }
}

impl Shell for ScriptedShell {
    fn run(&self, command: &str, mode: ShellMode) -> Result<String> {
        self.calls.borrow_mut().push((command.to_string(), mode));
        match self.outcomes.borrow_mut().pop_front() {
            None => Ok(String::new()),
            Some(ShellScript::Output(output)) => Ok(output),
            Some(ShellScript::Exit { code, output }) => Err(ShellExecutionError::Exit {
                code: Some(code),
                mode,
                output,
            }
            .into()),
        }
    }
}

/// Answers prompts from a queue; an exhausted queue answers "".
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
            questions: RefCell::default(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str) -> Result<String> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or_default())
    }
}

/// Always returns the same snapshot.
pub struct FixedEnvironment(pub TemplateValues);

impl Default for FixedEnvironment {
    fn default() -> Self {
        Self(TemplateValues {
            time: "09:30:00".to_string(),
            date: "2026-01-02".to_string(),
            datetime: "2026-01-02 09:30:00".to_string(),
            directory: "/work/project".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            shell: "/bin/bash".to_string(),
            user: "tester".to_string(),
        })
    }
}

impl ValueProvider for FixedEnvironment {
    fn sample(&self) -> TemplateValues {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingUsage {
    records: RefCell<Vec<TokenUsage>>,
}

impl RecordingUsage {
    pub fn records(&self) -> Vec<TokenUsage> {
        self.records.borrow().clone()
    }
}

impl UsageRecorder for RecordingUsage {
    fn record(&self, usage: &TokenUsage) {
        self.records.borrow_mut().push(*usage);
    }
}

pub fn usage(input_tokens: u64, output_tokens: u64) -> TokenUsage {
    TokenUsage {
        input_tokens,
        output_tokens,
        ..TokenUsage::default()
    }
}

/// Response with the given blocks and stop reason.
pub fn response(content: Vec<ContentBlock>, stop_reason: &str) -> MessagesResponse {
    MessagesResponse {
        content,
        stop_reason: Some(stop_reason.to_string()),
        usage: usage(10, 5),
    }
}

/// Plain text answer ending the turn.
pub fn text_response(text: &str) -> MessagesResponse {
    response(vec![text_block(text)], STOP_END_TURN)
}

pub fn text_block(text: &str) -> ContentBlock {
    ContentBlock::Text {
        text: text.to_string(),
    }
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

pub fn exec(command: &str) -> StepAction {
    StepAction::Exec(ExecStep {
        command: command.to_string(),
        ..ExecStep::default()
    })
}

pub fn llm(prompt: &str) -> StepAction {
    StepAction::Llm(LlmStep {
        prompt: prompt.to_string(),
        ..LlmStep::default()
    })
}

pub fn agentic(prompt: &str, max_iterations: u32, auto_execute: bool) -> StepAction {
    StepAction::Agentic(AgenticStep {
        prompt: prompt.to_string(),
        max_iterations,
        auto_execute,
        ..AgenticStep::default()
    })
}

pub fn subcommand(name: &str, args: &[&str]) -> StepAction {
    StepAction::Subcommand(SubcommandStep {
        name: name.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        silent: false,
    })
}

pub fn command(args: Vec<ArgSpec>, steps: Vec<Step>) -> Command {
    Command {
        description: String::new(),
        args,
        steps,
        source: "test".to_string(),
    }
}

/// Owns one of each fake and builds a [`Runtime`] over them.
#[derive(Default)]
pub struct Harness {
    pub commands: CommandSet,
    pub llm: ScriptedLlm,
    pub shell: ScriptedShell,
    pub prompter: ScriptedPrompter,
    pub values: FixedEnvironment,
    pub usage: RecordingUsage,
    pub options: RunOptions,
}

impl Harness {
    pub fn with_command(mut self, name: &str, command: Command) -> Self {
        self.commands.insert(name, command);
        self
    }

    pub fn runtime(&self) -> Runtime<'_> {
        Runtime {
            commands: &self.commands,
            llm: &self.llm,
            shell: &self.shell,
            prompter: &self.prompter,
            values: &self.values,
            usage: &self.usage,
            options: self.options.clone(),
            call_stack: RefCell::default(),
        }
    }

    /// Run a registered command as a top-level invocation.
    pub fn run(&self, name: &str, args: &[&str]) -> Result<PipelineOutcome> {
        let command = self.commands.resolve(name)?;
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        run_pipeline(&self.runtime(), name, command, &args, false)
    }
}
