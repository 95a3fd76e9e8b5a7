//! Stable exit codes for the `x` binary.
//!
//! A failing interactive shell command passes its own status through instead.

/// Command finished, or the user declined a confirmation.
pub const OK: i32 = 0;
/// Configuration, argument, model, or step failure.
pub const FAILURE: i32 = 1;
/// Interrupted by SIGINT/SIGTERM outside a streaming shell run.
pub const INTERRUPTED: i32 = 130;
