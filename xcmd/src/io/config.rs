//! Settings stored under `<config dir>/config.toml` and the on-disk layout.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const APP_DIR_NAME: &str = "x";
pub const SETTINGS_FILE: &str = "config.toml";
pub const GLOBAL_COMMANDS_FILE: &str = "commands.yaml";
pub const LOCAL_COMMANDS_FILE: &str = "xcommands.yaml";
pub const USAGE_FILE: &str = "usage.json";

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// User settings (TOML).
///
/// Missing fields fall back to the defaults below, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Stored API key. `ANTHROPIC_API_KEY` takes precedence when set.
    pub api_key: String,

    pub model: String,

    pub base_url: String,

    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,

    /// Token ceiling for single-turn `llm` steps.
    pub max_tokens: u32,

    /// Token ceiling for each turn of an `agentic` step.
    pub agentic_max_tokens: u32,

    /// Turn limit for agentic steps that do not set `max_iterations`.
    pub default_max_iterations: u32,

    pub request_timeout_secs: u64,

    /// Captured shell output beyond this many bytes is dropped (the pipe is still drained).
    pub shell_output_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            max_tokens: 1024,
            agentic_max_tokens: 4096,
            default_max_iterations: 10,
            request_timeout_secs: 300,
            shell_output_limit_bytes: 1_000_000,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("base_url must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        if self.agentic_max_tokens == 0 {
            return Err(anyhow!("agentic_max_tokens must be > 0"));
        }
        if self.default_max_iterations == 0 {
            return Err(anyhow!("default_max_iterations must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.shell_output_limit_bytes == 0 {
            return Err(anyhow!("shell_output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Prefer a non-empty environment key over the stored one.
    pub fn with_api_key_override(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = key.trim().to_string();
        }
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Where every persistent file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_path: PathBuf,
    pub commands_path: PathBuf,
    pub usage_path: PathBuf,
}

impl AppPaths {
    pub fn in_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            settings_path: config_dir.join(SETTINGS_FILE),
            commands_path: config_dir.join(GLOBAL_COMMANDS_FILE),
            usage_path: config_dir.join(USAGE_FILE),
        }
    }

    /// Resolve the platform config directory (`$XDG_CONFIG_HOME/x` first).
    pub fn discover() -> Result<Self> {
        let base = config_base_dir()?;
        let dir = base.join(APP_DIR_NAME);
        debug!(config_dir = %dir.display(), "resolved config directory");
        Ok(Self::in_dir(&dir))
    }
}

/// `$XDG_CONFIG_HOME` when set (on every platform), else the platform config dir.
fn config_base_dir() -> Result<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg));
    }
    dirs::config_dir().context("no config directory for this platform")
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

/// Owner-only: the settings file holds the API key.
pub const SETTINGS_FILE_MODE: u32 = 0o600;

/// Atomically write settings to disk (temp file + rename), owner-readable only.
pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;
    let mut buf = toml::to_string_pretty(settings).context("serialize settings toml")?;
    buf.push('\n');
    write_atomic_with_mode(path, &buf, Some(SETTINGS_FILE_MODE))
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    write_atomic_with_mode(path, contents, None)
}

/// Temp file + rename. `mode` (unix only) is applied to the temp file before
/// it is renamed into place, so the final path never has wider permissions.
fn write_atomic_with_mode(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    write_temp(&tmp_path, contents, mode)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn write_temp(path: &Path, contents: &str, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if let Some(mode) = mode {
        options.mode(mode);
    }
    let mut file = options.open(path)?;
    if let Some(mode) = mode {
        // `mode` only applies on creation; a leftover temp file keeps its bits otherwise.
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_temp(path: &Path, contents: &str, _mode: Option<u32>) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
