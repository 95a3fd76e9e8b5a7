//! Command loading: built-ins, global `commands.yaml`, then every local
//! `xcommands.yaml` from the filesystem root down to the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_yaml::Value;
use tracing::{debug, instrument, warn};

use crate::command::{Command, CommandSet, RawCommand};
use crate::io::config::{AppPaths, LOCAL_COMMANDS_FILE, write_atomic};

const BUILTIN_COMMANDS: &str = include_str!("../../assets/builtins.yaml");
const GLOBAL_TEMPLATE: &str = include_str!("../../assets/commands.template.yaml");

pub const BUILTIN_SOURCE: &str = "built-in";
pub const GLOBAL_SOURCE: &str = "global";
const DEFAULT_KEY: &str = "default";

/// Top-level names handled by the binary itself.
pub const RESERVED_COMMANDS: [&str; 5] = ["configure", "commands", "usage", "upgrade", "version"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_COMMANDS.contains(&name)
}

/// Parse one YAML layer and merge it into `set`; later layers win by name.
pub fn merge_source(set: &mut CommandSet, yaml: &str, source: &str) -> Result<()> {
    let doc: Value =
        serde_yaml::from_str(yaml).with_context(|| format!("parse {source} commands"))?;
    let mapping = match doc {
        Value::Null => return Ok(()),
        Value::Mapping(mapping) => mapping,
        _ => bail!("{source} commands: top level must be a mapping of command names"),
    };

    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            warn!(source, key = ?key, "ignoring non-string command name");
            continue;
        };
        if name == DEFAULT_KEY {
            match value.as_str() {
                Some(default) => set.default = default.to_string(),
                None => warn!(source, "ignoring non-string `default`"),
            }
            continue;
        }
        if is_reserved(name) {
            warn!(source, command = name, "reserved command name cannot be redefined; skipping");
            continue;
        }
        let raw: RawCommand = serde_yaml::from_value(value)
            .with_context(|| format!("parse command {name:?} from {source}"))?;
        let command = Command::from_raw(name, raw, source)?;
        debug!(source, command = name, steps = command.steps.len(), "loaded command");
        set.insert(name, command);
    }
    Ok(())
}

/// Commands compiled into the binary.
pub fn builtin_commands() -> Result<CommandSet> {
    let mut set = CommandSet::default();
    merge_source(&mut set, BUILTIN_COMMANDS, BUILTIN_SOURCE)?;
    Ok(set)
}

/// Every `xcommands.yaml` from the root down to `cwd`, in that order.
pub fn local_command_files(cwd: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<&Path> = cwd.ancestors().collect();
    dirs.reverse();
    dirs.into_iter()
        .map(|dir| dir.join(LOCAL_COMMANDS_FILE))
        .filter(|path| path.is_file())
        .collect()
}

/// Provenance label for a local file: its directory name.
fn local_source(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// Create the global commands file from the commented template if missing.
pub fn ensure_global_commands(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    debug!(path = %path.display(), "creating global commands file");
    write_atomic(path, GLOBAL_TEMPLATE)
}

/// Merge every layer visible from `cwd`.
#[instrument(skip_all, fields(cwd = %cwd.display()))]
pub fn load_command_set(paths: &AppPaths, cwd: &Path) -> Result<CommandSet> {
    let mut set = builtin_commands()?;

    ensure_global_commands(&paths.commands_path)?;
    let global = fs::read_to_string(&paths.commands_path)
        .with_context(|| format!("read {}", paths.commands_path.display()))?;
    merge_source(&mut set, &global, GLOBAL_SOURCE)
        .with_context(|| format!("load {}", paths.commands_path.display()))?;

    for path in local_command_files(cwd) {
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        merge_source(&mut set, &contents, &local_source(&path))
            .with_context(|| format!("load {}", path.display()))?;
    }

    debug!(commands = set.commands.len(), default = %set.default, "command set loaded");
    Ok(set)
}
