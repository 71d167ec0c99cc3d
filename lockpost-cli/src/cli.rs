//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Lockpost -- find compromised npm packages in lockfiles and pin safe versions.
///
/// Use `lockpost <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "lockpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to the lockpost.toml configuration file.
    #[arg(short, long, default_value = "lockpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a project's lockfiles for compromised packages.
    Lock(LockArgs),

    /// List the effective threat database.
    Threats(ThreatsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- lock ----

/// Scan lockfiles in a project directory and plan version pins.
#[derive(Args, Debug)]
pub struct LockArgs {
    /// Project directory (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Maximum dependency chains shown per compromised version (0 disables tracing).
    #[arg(long)]
    pub chains: Option<usize>,

    /// Maximum depth when tracing dependency chains.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// External threat database (JSON) instead of the built-in list.
    #[arg(long)]
    pub threats: Option<PathBuf>,

    /// Write the pin plan into package.json.
    #[arg(long)]
    pub update: bool,

    /// Do not write yarn-style `resolutions` (overrides only).
    #[arg(long)]
    pub no_resolutions: bool,

    /// Do not back up package.json before writing.
    #[arg(long)]
    pub no_backup: bool,
}

// ---- threats ----

/// List entries of the threat database.
#[derive(Args, Debug)]
pub struct ThreatsArgs {
    /// Only show packages whose name contains this text.
    #[arg(long)]
    pub name: Option<String>,

    /// External threat database (JSON) instead of the built-in list.
    #[arg(long)]
    pub threats: Option<PathBuf>,
}

// ---- config ----

/// Manage lockpost configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scan, pin).
        #[arg(long)]
        section: Option<String>,
    },
}
