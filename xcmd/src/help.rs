//! Command listing and per-command help text.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::command::{Command, CommandSet};
use crate::io::commands::{BUILTIN_SOURCE, GLOBAL_SOURCE};

/// Sort key for sources: built-in, then global, then local directories by name.
fn source_rank(source: &str) -> (u8, &str) {
    match source {
        BUILTIN_SOURCE => (0, ""),
        GLOBAL_SOURCE => (1, ""),
        other => (2, other),
    }
}

/// All commands grouped by source, names aligned, default marked.
pub fn render_command_list(set: &CommandSet) -> String {
    let mut groups: BTreeMap<(u8, &str), Vec<(&str, &Command)>> = BTreeMap::new();
    for (name, command) in &set.commands {
        groups
            .entry(source_rank(&command.source))
            .or_default()
            .push((name.as_str(), command));
    }
    let width = set.commands.keys().map(String::len).max().unwrap_or(0);

    let mut out = String::from("Usage: x <command> [args...]\n       x <query...>   (runs the default command)\n");
    for entries in groups.values() {
        let Some((_, first)) = entries.first() else {
            continue;
        };
        let _ = write!(out, "\n{}:\n", first.source);
        for (name, command) in entries {
            let marker = if *name == set.default { " (default)" } else { "" };
            let line = format!("  {name:<width$}  {}{marker}", command.description);
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out.push_str("\nBuilt-in: configure, commands, usage, version, upgrade\n");
    out
}

/// Usage line and argument table for one command.
pub fn render_command_help(name: &str, command: &Command) -> String {
    let mut out = String::new();
    if !command.description.is_empty() {
        let _ = writeln!(out, "{}\n", command.description);
    }

    let mut usage = format!("Usage: x {name}");
    for arg in &command.args {
        if arg.rest {
            let _ = write!(usage, " <{}...>", arg.name);
        } else {
            let _ = write!(usage, " <{}>", arg.name);
        }
    }
    let _ = writeln!(out, "{usage}");

    if !command.args.is_empty() {
        let width = command.args.iter().map(|a| a.name.len()).max().unwrap_or(0);
        out.push_str("\nArguments:\n");
        for arg in &command.args {
            let mut text = arg.description.clone();
            if arg.rest {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str("(captures remaining words)");
            }
            let line = format!("  {:<width$}  {text}", arg.name);
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }

    let _ = write!(out, "\nSource: {}\n", command.source);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ArgSpec;

    fn command(description: &str, source: &str) -> Command {
        Command {
            description: description.to_string(),
            source: source.to_string(),
            ..Command::default()
        }
    }

    #[test]
    fn list_orders_sources_and_marks_default() {
        let mut set = CommandSet::default();
        set.insert("zeta", command("Local thing", "proj"));
        set.insert("alpha", command("Another local", "app"));
        set.insert("mine", command("Global thing", GLOBAL_SOURCE));
        set.insert("shell", command("Generate a command", BUILTIN_SOURCE));

        let listing = render_command_list(&set);
        let built_in = listing.find("built-in:").expect("built-in group");
        let global = listing.find("global:").expect("global group");
        let app = listing.find("app:").expect("app group");
        let proj = listing.find("proj:").expect("proj group");
        assert!(built_in < global && global < app && app < proj);
        assert!(listing.contains("  shell  Generate a command (default)"));
        assert!(listing.contains("  mine   Global thing\n"));
    }

    #[test]
    fn help_shows_usage_with_rest_marker() {
        let cmd = Command {
            description: "Deploy a service".to_string(),
            args: vec![
                ArgSpec {
                    description: "Target env".to_string(),
                    ..ArgSpec::new("env")
                },
                ArgSpec::rest("notes"),
            ],
            source: GLOBAL_SOURCE.to_string(),
            ..Command::default()
        };
        let help = render_command_help("deploy", &cmd);
        assert!(help.starts_with("Deploy a service\n\n"));
        assert!(help.contains("Usage: x deploy <env> <notes...>\n"));
        assert!(help.contains("  env    Target env\n"));
        assert!(help.contains("  notes  (captures remaining words)\n"));
        assert!(help.ends_with("Source: global\n"));
    }
}
