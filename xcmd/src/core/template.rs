//! Static environment placeholders (`{{time}}`, `{{os}}`, ...).
//!
//! Values are sampled by an `io::environment::ValueProvider` right before each
//! substitution and passed in explicitly, so tests can pin them.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A snapshot of the runtime environment used for placeholder substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateValues {
    pub time: String,
    pub date: String,
    pub datetime: String,
    pub directory: String,
    /// `darwin`, `linux`, `windows`, ...
    pub os: String,
    pub arch: String,
    pub shell: String,
    pub user: String,
}

static STATIC_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(time|date|datetime|directory|os|arch|shell|user)\}\}").unwrap()
});

impl TemplateValues {
    fn lookup(&self, key: &str) -> &str {
        match key {
            "time" => &self.time,
            "date" => &self.date,
            "datetime" => &self.datetime,
            "directory" => &self.directory,
            "os" => &self.os,
            "arch" => &self.arch,
            "shell" => &self.shell,
            "user" => &self.user,
            _ => "",
        }
    }

    /// Replace every static placeholder in `text` in a single pass.
    ///
    /// Dynamic references (`{{args.x}}`, `{{output}}`, ...) are left untouched.
    pub fn apply(&self, text: &str) -> String {
        STATIC_PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures<'_>| self.lookup(&caps[1]).to_string())
            .into_owned()
    }

    /// Target platform for choosing OS-specific command variants.
    pub fn platform(&self) -> Platform {
        Platform::from_os(&self.os)
    }
}

/// Platforms that exec steps can target with a dedicated command variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Darwin,
    Linux,
    Other,
}

impl Platform {
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "darwin" | "macos" => Platform::Darwin,
            "linux" => Platform::Linux,
            _ => Platform::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues {
        TemplateValues {
            time: "12:34:56".to_string(),
            date: "2026-10-19".to_string(),
            datetime: "2026-10-19 12:34:56".to_string(),
            directory: "/work".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            shell: "/bin/zsh".to_string(),
            user: "dev".to_string(),
        }
    }

    #[test]
    fn apply_replaces_every_known_placeholder() {
        let out = values().apply(
            "{{time}}|{{date}}|{{datetime}}|{{directory}}|{{os}}|{{arch}}|{{shell}}|{{user}}",
        );
        assert_eq!(
            out,
            "12:34:56|2026-10-19|2026-10-19 12:34:56|/work|linux|x86_64|/bin/zsh|dev"
        );
    }

    #[test]
    fn apply_leaves_dynamic_references_alone() {
        let out = values().apply("{{args.query}} in {{directory}} -> {{output}} {{unknown}}");
        assert_eq!(out, "{{args.query}} in /work -> {{output}} {{unknown}}");
    }

    #[test]
    fn apply_does_not_rescan_substituted_values() {
        let mut v = values();
        v.directory = "/tmp/{{user}}".to_string();
        assert_eq!(v.apply("{{directory}}"), "/tmp/{{user}}");
    }

    #[test]
    fn platform_maps_os_names() {
        assert_eq!(Platform::from_os("darwin"), Platform::Darwin);
        assert_eq!(Platform::from_os("macos"), Platform::Darwin);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("freebsd"), Platform::Other);
    }
}
