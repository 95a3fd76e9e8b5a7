//! CLI tests for the `x` binary.
//!
//! Spawns the binary with a temporary config home and `DRYRUN=1`, so nothing
//! reaches a shell or the network.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use xcmd::exit_codes;
use xcmd::io::config::{GLOBAL_COMMANDS_FILE, LOCAL_COMMANDS_FILE};

const LOCAL_COMMANDS: &str = "\
hello:
  description: Say hello
  args:
    - name: name
      description: Who to greet
  steps:
    - exec:
        command: echo hi {{args.name}}
version:
  steps:
    - exec:
        command: echo hijacked
";

struct Sandbox {
    config: tempfile::TempDir,
    project: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            config: tempfile::tempdir().expect("config tempdir"),
            project: tempfile::tempdir().expect("project tempdir"),
        };
        fs::write(
            sandbox.project.path().join(LOCAL_COMMANDS_FILE),
            LOCAL_COMMANDS,
        )
        .expect("write local commands");
        sandbox
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_x"))
            .args(args)
            .current_dir(self.project.path())
            .env("XDG_CONFIG_HOME", self.config.path())
            .env("HOME", self.config.path())
            .env("DRYRUN", "1")
            .env_remove("DEBUG")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn x")
    }

    fn config_dir(&self) -> &Path {
        self.config.path()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Verifies reserved names cannot be redefined by a local command file.
#[test]
fn version_is_not_overridable() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["version"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output).trim(),
        format!("x version {}", env!("CARGO_PKG_VERSION"))
    );
}

/// Verifies the listing groups commands and seeds the global commands file.
#[test]
fn commands_lists_every_layer() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["commands", "--list"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let listing = stdout(&output);
    let built_in = listing.find("built-in:").expect("built-in group");
    let hello = listing.find("Say hello").expect("local command");
    assert!(built_in < hello);
    assert!(listing.contains("(default)"));
    assert!(
        sandbox
            .config_dir()
            .join("x")
            .join(GLOBAL_COMMANDS_FILE)
            .is_file()
    );
}

/// Verifies `commands` seeds the global file and hands it to `$EDITOR`.
#[cfg(unix)]
#[test]
fn commands_opens_global_file_in_editor() {
    let sandbox = Sandbox::new();
    let global = sandbox.config_dir().join("x").join(GLOBAL_COMMANDS_FILE);

    let output = Command::new(env!("CARGO_BIN_EXE_x"))
        .arg("commands")
        .current_dir(sandbox.project.path())
        .env("XDG_CONFIG_HOME", sandbox.config_dir())
        .env("EDITOR", "true")
        .env_remove("VISUAL")
        .output()
        .expect("spawn x");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains(&format!("Opening {}", global.display())));
    assert!(global.is_file());
}

/// Verifies the built-in default command dry-runs end to end.
#[test]
fn dry_run_of_default_command_succeeds() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["list", "large", "files"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(
        out.contains("Would execute: <dry run: steps.plan.command>"),
        "stdout: {out}"
    );
}

/// Verifies a bare invocation prints the listing and fails.
#[test]
fn no_arguments_prints_listing() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&[]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stdout(&output).contains("Usage: x <command>"));
}

/// Verifies a dry run describes the interpolated command without running it.
#[test]
fn dry_run_describes_exec_step() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["hello", "Bob"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains("Would execute: echo hi Bob"), "stdout: {out}");
    assert!(out.contains("Dry run complete"));
}

/// Verifies `--help` after a command name prints its help instead of running it.
#[test]
fn command_help_is_printed() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["hello", "--help"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains("Usage: x hello <name>"));
    assert!(out.contains("Who to greet"));
    assert!(!out.contains("Would execute"));
}

/// Verifies a missing argument is an error with exit status 1.
#[test]
fn missing_argument_fails() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["hello"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: missing required argument: name"));
}

/// Verifies usage starts at zero when nothing was recorded.
#[test]
fn usage_starts_empty() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["usage"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("Requests:              0"));
}
