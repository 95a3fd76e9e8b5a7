//! Side-effecting adapters: shell, model transport, terminal, and files.

pub mod anthropic;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod console;
pub mod editor;
pub mod environment;
pub mod llm;
pub mod prompt;
pub mod shell;
pub mod usage;
