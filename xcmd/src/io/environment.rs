//! Samples the runtime environment for static template placeholders.

use std::env;

use chrono::Local;

use crate::core::template::{DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT, TemplateValues};

/// Supplies a fresh [`TemplateValues`] snapshot each time it is asked.
pub trait ValueProvider {
    fn sample(&self) -> TemplateValues;
}

/// Reads the clock, working directory, and environment of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemValues;

impl ValueProvider for SystemValues {
    fn sample(&self) -> TemplateValues {
        let now = Local::now();
        TemplateValues {
            time: now.format(TIME_FORMAT).to_string(),
            date: now.format(DATE_FORMAT).to_string(),
            datetime: now.format(DATETIME_FORMAT).to_string(),
            directory: env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            os: os_name().to_string(),
            arch: env::consts::ARCH.to_string(),
            shell: current_shell(),
            user: current_user(),
        }
    }
}

/// `darwin` instead of Rust's `macos`, so commands can use the common name.
pub fn os_name() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn current_shell() -> String {
    if cfg!(windows) {
        return non_empty_var("COMSPEC").unwrap_or_else(|| "cmd.exe".to_string());
    }
    non_empty_var("SHELL").unwrap_or_else(|| "/bin/sh".to_string())
}

fn current_user() -> String {
    non_empty_var("USER")
        .or_else(|| non_empty_var("USERNAME"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_fills_platform_fields() {
        let values = SystemValues.sample();
        assert_eq!(values.arch, env::consts::ARCH);
        assert_eq!(values.os, os_name());
        assert!(!values.shell.is_empty());
        assert_eq!(values.time.len(), 8);
        assert_eq!(values.date.len(), 10);
        assert_eq!(values.datetime.len(), 19);
    }
}
