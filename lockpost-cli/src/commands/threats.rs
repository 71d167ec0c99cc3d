//! `lockpost threats` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use lockpost_core::config::LockpostConfig;
use lockpost_lock_scanner::{LockScannerBuilder, LockScannerConfig, ThreatEntry};

use crate::cli::ThreatsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `threats` command.
///
/// Lists the threat database the `lock` command would use.
pub async fn execute(
    args: ThreatsArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = LockpostConfig::load_or_default(config_path).await?;
    let mut scanner_config = LockScannerConfig::from_core(&config);
    if let Some(threats) = &args.threats {
        scanner_config.threat_db_path = threats.display().to_string();
    }

    let source = if scanner_config.threat_db_path.is_empty() {
        "built-in".to_owned()
    } else {
        scanner_config.threat_db_path.clone()
    };
    info!(source = %source, "loading threat database");

    let scanner = LockScannerBuilder::new().config(scanner_config).build()?;
    let db = scanner.threat_db();

    let filter = args.name.as_deref().map(str::to_lowercase);
    let entries: Vec<ThreatEntry> = db
        .entries()
        .iter()
        .filter(|e| {
            filter
                .as_deref()
                .is_none_or(|f| e.name.to_lowercase().contains(f))
        })
        .cloned()
        .collect();

    let list = ThreatList {
        source,
        total: db.entry_count(),
        filter: args.name,
        entries,
    };

    writer.render(&list)?;

    Ok(())
}

/// Threat database listing.
#[derive(Serialize)]
pub struct ThreatList {
    /// `built-in` or the database file path
    pub source: String,
    /// Total entries in the database
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub entries: Vec<ThreatEntry>,
}

impl Render for ThreatList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "Threat database: {} ({} entries)",
            self.source.bold(),
            self.total
        )?;

        if self.entries.is_empty() {
            match &self.filter {
                Some(f) => writeln!(w, "No entries matching '{}'.", f)?,
                None => writeln!(w, "No entries.")?,
            }
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<28} {:<24} {}",
            "PACKAGE".bold(),
            "COMPROMISED".bold(),
            "LAST SAFE".bold()
        )?;
        for entry in &self.entries {
            writeln!(
                w,
                "{:<28} {:<24} {}",
                entry.name,
                entry.bad_ranges.join(" || ").red(),
                entry.last_safe().unwrap_or("-").green()
            )?;
        }

        Ok(())
    }
}
