//! Output formatting and display.
//!
//! Everything user-facing the binary prints goes through
//! [`OutputFormatter`]; the library itself only logs through `tracing`
//! and the summary `log` lines.

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};
