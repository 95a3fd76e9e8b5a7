//! Reading answers to confirmation prompts.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Asks the user a question and returns the raw answer line.
pub trait Prompter {
    fn ask(&self, question: &str) -> Result<String>;
}

/// Prompts on stdout and reads one line from stdin. EOF reads as an empty answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, question: &str) -> Result<String> {
        let mut out = io::stdout().lock();
        write!(out, "{question}").context("write prompt")?;
        out.flush().context("flush prompt")?;
        drop(out);

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read answer")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
