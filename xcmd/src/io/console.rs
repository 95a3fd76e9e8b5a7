//! Terminal output for pipeline progress.
//!
//! Plain text with crossterm styling; nothing here reads input.

use std::fmt::Display;

use crossterm::style::{Color, Stylize};

use crate::core::confirm::RiskLevel;

pub fn print_exec_command(command: &str) {
    println!("{} {}", "❯ Executing:".dark_cyan().bold(), command);
}

/// Banner for a nested command call.
pub fn print_running_command(name: &str, args: &[String]) {
    println!();
    println!("{} {} {}", "❯ Running command:".magenta().bold(), name, args.join(" "));
}

/// Command shown as an indented block before a confirmation prompt.
pub fn print_command_for_confirm(command: &str) {
    println!();
    for line in command.lines() {
        println!("  {}", line.bold());
    }
    println!();
}

/// Summary, and for medium/high risk the risk and safer alternative.
pub fn print_confirm_info(summary: &str, risk: &str, safer: &str) {
    if !summary.is_empty() {
        println!();
        println!("{} {}", "Summary:".bold(), summary);
    }
    let level = RiskLevel::parse(risk);
    if !level.is_elevated() {
        return;
    }
    let color = match level {
        RiskLevel::High => Color::Red,
        _ => Color::AnsiValue(208),
    };
    println!("{} {}", "Risk:".bold(), risk.with(color));
    if !safer.is_empty() {
        println!("{} {}", "Safer alternative:".bold(), safer);
    }
}

pub fn render_text(text: &str) {
    if text.trim().is_empty() {
        return;
    }
    println!("{}", text.trim_end());
}

pub fn warn(message: impl Display) {
    eprintln!();
    eprintln!("{}", format!("⚠ {message}").yellow());
}

/// `[DEBUG] label` followed by an indented body, if any.
pub fn debug_block(label: &str, body: &str) {
    println!("{} {}", "[DEBUG]".dim(), label);
    for line in body.lines() {
        println!("        {}", line.dim());
    }
}

pub fn dry_run(message: impl Display) {
    println!("{} {}", "[DRYRUN]".magenta(), message);
}
