//! Per-invocation pipeline state.

use std::collections::BTreeMap;

/// Every step's dry-run stand-in output starts with this.
pub const DRY_RUN_PREFIX: &str = "[dry run - ";

/// Whether `output` is the stand-in a step returns instead of running.
pub fn is_dry_run_output(output: &str) -> bool {
    output.starts_with(DRY_RUN_PREFIX) && output.ends_with(']')
}

/// State threaded between the steps of one pipeline invocation.
///
/// Created fresh for every top-level run and for every nested subcommand call;
/// only the orchestrator mutates it, and only between steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    /// Argument name -> bound value.
    pub args: BTreeMap<String, String>,
    /// Explicit step id -> that step's output.
    pub step_outputs: BTreeMap<String, String>,
    /// Output of the immediately preceding step (empty before the first step).
    pub last_output: String,
    /// Field references into stand-in outputs render a marker instead of failing.
    pub dry_run: bool,
}

impl PipelineContext {
    pub fn new(args: BTreeMap<String, String>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Record a finished step. Duplicate ids overwrite (last write wins).
    pub fn record(&mut self, id: Option<&str>, output: String) {
        if let Some(id) = id {
            self.step_outputs.insert(id.to_string(), output.clone());
        }
        self.last_output = output;
    }
}
