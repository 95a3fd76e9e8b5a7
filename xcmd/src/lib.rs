//! Natural-language command assistant driven by YAML step pipelines.
//!
//! A command is an ordered list of steps (`exec`, `llm`, `agentic`,
//! `subcommand`) whose inputs can reference earlier outputs through
//! `{{...}}` placeholders. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (argument binding, interpolation,
//!   confirmation policy). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (shell, model transport, terminal,
//!   config files). Each sits behind a trait so tests can script it.
//!
//! [`steps`] executes one step against those collaborators and [`pipeline`]
//! runs a whole command.

pub mod command;
pub mod core;
pub mod exit_codes;
pub mod help;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
