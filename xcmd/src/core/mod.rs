//! Deterministic, pure logic shared by the pipeline engine.
//!
//! Core modules must be free of I/O side effects. Environment values are
//! sampled by `io` and passed in, so everything here is testable in isolation.

pub mod args;
pub mod confirm;
pub mod context;
pub mod errors;
pub mod interpolate;
pub mod template;
