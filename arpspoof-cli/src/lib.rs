//! CLI interface for arpspoof-rs
//!
//! Argument parsing and the mapping from flags to a [`SpoofConfig`](arpspoof_session::SpoofConfig).

pub mod args;

pub use args::{Cli, Commands, ModeArg};
