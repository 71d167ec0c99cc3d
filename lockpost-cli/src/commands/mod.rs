//! Subcommand handlers
//!
//! Each module exposes `execute(args, config_path, writer)`.

pub mod config;
pub mod lock;
pub mod threats;
