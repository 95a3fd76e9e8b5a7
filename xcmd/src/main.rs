//! `x`: run YAML-defined command pipelines from the terminal.
//!
//! The first token selects a command from the merged command set
//! (built-in, `commands.yaml`, then every `xcommands.yaml` from `/` down to
//! the current directory). Anything else is handed to the default command.

use std::cell::RefCell;
use std::env;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use xcmd::command::CommandSet;
use xcmd::exit_codes;
use xcmd::help::{render_command_help, render_command_list};
use xcmd::io::anthropic::AnthropicClient;
use xcmd::io::commands::{ensure_global_commands, load_command_set};
use xcmd::io::config::{API_KEY_ENV, AppPaths, load_settings, write_settings};
use xcmd::io::confirm::{Prompter, StdinPrompter};
use xcmd::io::editor::open_in_editor;
use xcmd::io::environment::SystemValues;
use xcmd::io::shell::{ShellExecutionError, ShellMode, SystemShell};
use xcmd::io::usage::{UsageFile, load_usage};
use xcmd::logging::{self, DEBUG_ENV, DRYRUN_ENV, env_flag};
use xcmd::pipeline::{PipelineOutcome, run_pipeline};
use xcmd::steps::{RunOptions, Runtime};

#[derive(Parser)]
#[command(
    name = "x",
    version,
    about = "Natural-language command assistant",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Store an API key (and optionally a model) in the settings file.
    Configure,
    /// Open the global commands file in your editor.
    Commands {
        /// List every available command instead, grouped by where it is defined.
        #[arg(short, long)]
        list: bool,
    },
    /// Print accumulated token usage.
    Usage,
    /// Replace this binary with the latest release.
    Upgrade,
    /// Print the version.
    Version,
    /// `x <command> [args...]` or `x <query...>` for the default command.
    #[command(external_subcommand)]
    Run(Vec<String>),
}

fn main() {
    logging::init(env_flag(DEBUG_ENV));
    let code = match run() {
        Ok(code) => code,
        Err(err) => exit_code_for(&err),
    };
    std::process::exit(code);
}

/// Interactive commands already showed their own failure; only their exit status is kept.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ShellExecutionError>() {
        Some(ShellExecutionError::Exit {
            code: Some(code),
            mode: ShellMode::Interactive,
            ..
        }) => *code,
        Some(ShellExecutionError::Interrupted { .. }) => {
            println!();
            exit_codes::INTERRUPTED
        }
        _ => {
            eprintln!("Error: {err:#}");
            exit_codes::FAILURE
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        None => cmd_list().map(|_| exit_codes::FAILURE),
        Some(Cmd::Configure) => cmd_configure(),
        Some(Cmd::Commands { list: true }) => cmd_list(),
        Some(Cmd::Commands { list: false }) => cmd_edit_commands(),
        Some(Cmd::Usage) => cmd_usage(),
        Some(Cmd::Upgrade) => {
            eprintln!("Self-upgrade is not available in this build.");
            Ok(exit_codes::FAILURE)
        }
        Some(Cmd::Version) => {
            println!("x version {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        Some(Cmd::Run(tokens)) => cmd_run(tokens),
    }
}

fn load_commands(paths: &AppPaths) -> Result<CommandSet> {
    let cwd = env::current_dir().context("resolve current directory")?;
    load_command_set(paths, &cwd)
}

fn cmd_list() -> Result<i32> {
    let paths = AppPaths::discover()?;
    let commands = load_commands(&paths)?;
    print!("{}", render_command_list(&commands));
    Ok(exit_codes::OK)
}

fn cmd_edit_commands() -> Result<i32> {
    let paths = AppPaths::discover()?;
    ensure_global_commands(&paths.commands_path)?;
    println!("Opening {}", paths.commands_path.display());
    open_in_editor(&paths.commands_path)?;
    Ok(exit_codes::OK)
}

fn cmd_usage() -> Result<i32> {
    let paths = AppPaths::discover()?;
    let totals = load_usage(&paths.usage_path)?;
    println!("{}", totals.render());
    Ok(exit_codes::OK)
}

fn cmd_configure() -> Result<i32> {
    let paths = AppPaths::discover()?;
    let mut settings = load_settings(&paths.settings_path)?;
    let prompter = StdinPrompter;

    let key = prompter.ask("Anthropic API key: ")?;
    let key = key.trim();
    if !key.is_empty() {
        settings.api_key = key.to_string();
    } else if !settings.has_api_key() {
        bail!("api key must not be empty");
    }

    let model = prompter.ask(&format!("Model [{}]: ", settings.model))?;
    let model = model.trim();
    if !model.is_empty() {
        settings.model = model.to_string();
    }

    write_settings(&paths.settings_path, &settings)?;
    println!("Saved settings to {}", paths.settings_path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(tokens: Vec<String>) -> Result<i32> {
    let paths = AppPaths::discover()?;
    let settings = load_settings(&paths.settings_path)?
        .with_api_key_override(env::var(API_KEY_ENV).ok());
    let commands = load_commands(&paths)?;

    let (name, args, explicit) = match tokens.split_first() {
        Some((first, rest)) if commands.get(first).is_some() => {
            (first.clone(), rest.to_vec(), true)
        }
        _ => (commands.default.clone(), tokens, false),
    };
    let command = commands.resolve(&name)?;

    if explicit && matches!(args.first().map(String::as_str), Some("--help" | "-h")) {
        print!("{}", render_command_help(&name, command));
        return Ok(exit_codes::OK);
    }
    debug!(command = %name, explicit, args = args.len(), "dispatching");

    let llm = AnthropicClient::from_settings(&settings)?;
    let shell = SystemShell::new(settings.shell_output_limit_bytes);
    let usage = UsageFile::new(&paths.usage_path);
    let rt = Runtime {
        commands: &commands,
        llm: &llm,
        shell: &shell,
        prompter: &StdinPrompter,
        values: &SystemValues,
        usage: &usage,
        options: RunOptions::from_settings(
            &settings,
            env_flag(DRYRUN_ENV),
            env_flag(DEBUG_ENV),
        ),
        call_stack: RefCell::default(),
    };

    match run_pipeline(&rt, &name, command, &args, false)? {
        PipelineOutcome::Completed(_) => Ok(exit_codes::OK),
        PipelineOutcome::Cancelled => {
            println!("Cancelled.");
            Ok(exit_codes::OK)
        }
    }
}
