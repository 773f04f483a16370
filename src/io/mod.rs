//! Input/Output conventions for the CLI.
//!
//! Exit-code policy (kept deliberately small): a run that completes is a
//! success even when individual category pairs failed; their failures are
//! in the log and omitted from the reports. Only invalid startup
//! configuration exits non-zero.

pub mod exit_code;

pub use exit_code::ExitCode;
