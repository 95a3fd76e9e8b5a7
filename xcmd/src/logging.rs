//! Development-time tracing and the process-level debug switches.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//! - **`[DEBUG]` lines (`io::console`)**: User-facing pipeline trace on stdout,
//!   enabled by `DEBUG=1`. Unaffected by `RUST_LOG`.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEBUG_ENV: &str = "DEBUG";
pub const DRYRUN_ENV: &str = "DRYRUN";

/// Truthy unless unset, empty, `0`, or `false`.
pub fn is_truthy(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") | Some("0") => false,
        Some(v) => !v.eq_ignore_ascii_case("false"),
    }
}

pub fn env_flag(name: &str) -> bool {
    is_truthy(env::var(name).ok().as_deref())
}

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `xcmd=debug` when `debug` is set.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=xcmd=trace x list files
/// ```
pub fn init(debug: bool) {
    let fallback = if debug { "warn,xcmd=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_env_conventions() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(Some("FALSE")));
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("yes")));
        assert!(is_truthy(Some("true")));
    }
}
