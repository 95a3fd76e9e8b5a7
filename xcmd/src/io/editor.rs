//! Open a file in the user's editor (`x commands`).

use std::env;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::template::Platform;
use crate::io::environment::os_name;

/// Terminal editors tried in order when neither `$EDITOR` nor `$VISUAL` is set.
pub const FALLBACK_EDITORS: [&str; 3] = ["nano", "vim", "vi"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no editor found (set $EDITOR or install one of: {})", FALLBACK_EDITORS.join(", "))]
pub struct NoEditorError;

/// Program and leading arguments; the file path is appended when launching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Block until the editor exits (terminal editors). GUI launchers return at once.
    pub wait: bool,
}

impl EditorCommand {
    /// Split a `$EDITOR`-style value such as `code --wait` on whitespace.
    fn from_setting(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            wait: true,
        })
    }

    fn detached(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            wait: false,
        }
    }
}

/// Pick an editor.
///
/// `$EDITOR` then `$VISUAL` win everywhere. Otherwise macOS opens the default
/// text editor, Windows uses Notepad, and other systems take the first
/// [`FALLBACK_EDITORS`] entry that `on_path` reports as installed.
pub fn resolve_editor(
    platform: Platform,
    editor: Option<&str>,
    visual: Option<&str>,
    on_path: impl Fn(&str) -> bool,
) -> Result<EditorCommand, NoEditorError> {
    if let Some(command) = [editor, visual]
        .into_iter()
        .flatten()
        .find_map(EditorCommand::from_setting)
    {
        return Ok(command);
    }
    match platform {
        Platform::Darwin => Ok(EditorCommand::detached("open", &["-t"])),
        Platform::Windows => Ok(EditorCommand::detached("notepad", &[])),
        Platform::Linux | Platform::Other => FALLBACK_EDITORS
            .into_iter()
            .find(|name| on_path(name))
            .and_then(EditorCommand::from_setting)
            .ok_or(NoEditorError),
    }
}

/// Open `path` with the editor chosen from this process's environment.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn open_in_editor(path: &Path) -> Result<()> {
    let editor = env::var("EDITOR").ok();
    let visual = env::var("VISUAL").ok();
    let command = resolve_editor(
        Platform::from_os(os_name()),
        editor.as_deref(),
        visual.as_deref(),
        |name| which::which(name).is_ok(),
    )?;
    debug!(program = %command.program, wait = command.wait, "launching editor");

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args).arg(path);
    if command.wait {
        let status = cmd
            .status()
            .with_context(|| format!("run editor {}", command.program))?;
        if !status.success() {
            bail!("editor {} exited with {status}", command.program);
        }
    } else {
        cmd.spawn()
            .with_context(|| format!("launch editor {}", command.program))?;
    }
    Ok(())
}
