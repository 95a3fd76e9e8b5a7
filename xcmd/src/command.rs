//! Command definitions loaded from `commands.yaml` / `xcommands.yaml`.
//!
//! A [`Command`] is immutable once loaded. Steps arrive as [`RawStep`] (one
//! optional key per variant, mirroring the YAML) and are validated into the
//! [`StepAction`] sum type before any pipeline runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::core::errors::{CommandNotFoundError, InvalidStepError};

/// Run a shell command, optionally with per-OS variants and confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecStep {
    /// Fallback command used when no OS-specific variant matches.
    pub command: String,
    pub windows: String,
    pub darwin: String,
    pub linux: String,
    /// Ask before running.
    pub confirm: bool,
    /// Capture output without echoing anything to the terminal.
    pub silent: bool,
    /// Shown above the confirmation prompt.
    pub summary: String,
    /// `low`, `medium` or `high`; medium/high flip the prompt default to "no".
    pub risk: String,
    /// Safer alternative, shown for medium/high risk only.
    pub safer: String,
}

/// One single-turn model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmStep {
    pub system: String,
    pub prompt: String,
    pub silent: bool,
}

/// A bounded multi-turn tool-use loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgenticStep {
    pub system: String,
    pub prompt: String,
    /// Turn limit; `0` means "use the configured default".
    pub max_iterations: u32,
    /// Run shell tool calls without asking.
    pub auto_execute: bool,
}

/// Invoke another command from the same command set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubcommandStep {
    pub name: String,
    pub args: Vec<String>,
    pub silent: bool,
}

/// Discriminant of [`StepAction`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Exec,
    Llm,
    Agentic,
    Subcommand,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Exec => "exec",
            StepKind::Llm => "llm",
            StepKind::Agentic => "agentic",
            StepKind::Subcommand => "subcommand",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one populated step variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Exec(ExecStep),
    Llm(LlmStep),
    Agentic(AgenticStep),
    Subcommand(SubcommandStep),
}

impl StepAction {
    pub fn kind(&self) -> StepKind {
        match self {
            StepAction::Exec(_) => StepKind::Exec,
            StepAction::Llm(_) => StepKind::Llm,
            StepAction::Agentic(_) => StepKind::Agentic,
            StepAction::Subcommand(_) => StepKind::Subcommand,
        }
    }
}

/// A validated pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Optional identifier; only explicit ids are addressable via `{{steps.<id>...}}`.
    pub id: Option<String>,
    pub action: StepAction,
}

impl Step {
    pub fn new(action: StepAction) -> Self {
        Self { id: None, action }
    }

    pub fn with_id(id: &str, action: StepAction) -> Self {
        Self {
            id: Some(id.to_string()),
            action,
        }
    }

    pub fn kind(&self) -> StepKind {
        self.action.kind()
    }

    /// Display label: the explicit id, or `step-<n>` for the 0-based `index`.
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("step-{}", index + 1),
        }
    }
}

/// Step as written in YAML: every variant is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStep {
    pub id: Option<String>,
    pub exec: Option<ExecStep>,
    pub llm: Option<LlmStep>,
    pub agentic: Option<AgenticStep>,
    pub subcommand: Option<SubcommandStep>,
}

impl RawStep {
    /// Validate that exactly one variant is populated.
    ///
    /// `index` is 0-based; errors report it 1-based.
    pub fn into_step(self, command: &str, index: usize) -> Result<Step, InvalidStepError> {
        let mut populated = Vec::new();
        if self.exec.is_some() {
            populated.push(StepKind::Exec);
        }
        if self.llm.is_some() {
            populated.push(StepKind::Llm);
        }
        if self.agentic.is_some() {
            populated.push(StepKind::Agentic);
        }
        if self.subcommand.is_some() {
            populated.push(StepKind::Subcommand);
        }

        let invalid = |reason: String| InvalidStepError {
            command: command.to_string(),
            step: index + 1,
            reason,
        };

        if populated.len() > 1 {
            let names: Vec<&str> = populated.iter().map(|k| k.as_str()).collect();
            return Err(invalid(format!(
                "multiple step types declared ({})",
                names.join(", ")
            )));
        }

        let action = if let Some(exec) = self.exec {
            StepAction::Exec(exec)
        } else if let Some(llm) = self.llm {
            StepAction::Llm(llm)
        } else if let Some(agentic) = self.agentic {
            StepAction::Agentic(agentic)
        } else if let Some(subcommand) = self.subcommand {
            StepAction::Subcommand(subcommand)
        } else {
            return Err(invalid(
                "no valid type (exec, llm, agentic, or subcommand)".to_string(),
            ));
        };

        Ok(Step {
            id: self.id.filter(|id| !id.is_empty()),
            action,
        })
    }
}

/// Positional argument declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
    /// Consume every remaining token, joined by spaces.
    pub rest: bool,
}

impl ArgSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn rest(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rest: true,
            ..Self::default()
        }
    }
}

/// Command as written in YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCommand {
    pub description: String,
    pub args: Vec<ArgSpec>,
    pub steps: Vec<RawStep>,
}

/// A named, validated unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub description: String,
    pub args: Vec<ArgSpec>,
    pub steps: Vec<Step>,
    /// Which config layer defined this command (`built-in`, `global`, or a directory name).
    pub source: String,
}

impl Command {
    pub fn from_raw(name: &str, raw: RawCommand, source: &str) -> Result<Self, InvalidStepError> {
        let steps = raw
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| step.into_step(name, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            description: raw.description,
            args: raw.args,
            steps,
            source: source.to_string(),
        })
    }
}

/// All commands visible to one process run, after merging every config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    /// Command used when the first CLI token names no command.
    pub default: String,
    pub commands: BTreeMap<String, Command>,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            default: DEFAULT_COMMAND.to_string(),
            commands: BTreeMap::new(),
        }
    }
}

pub const DEFAULT_COMMAND: &str = "shell";

impl CommandSet {
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Look up a command, failing with [`CommandNotFoundError`].
    pub fn resolve(&self, name: &str) -> Result<&Command, CommandNotFoundError> {
        self.commands.get(name).ok_or_else(|| CommandNotFoundError {
            name: name.to_string(),
        })
    }

    pub fn insert(&mut self, name: &str, command: Command) {
        self.commands.insert(name.to_string(), command);
    }
}
