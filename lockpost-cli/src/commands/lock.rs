//! `lockpost lock` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use lockpost_core::config::LockpostConfig;
use lockpost_lock_scanner::pin::ApplyOutcome;
use lockpost_lock_scanner::{
    LockScannerBuilder, LockScannerConfig, ScanReport, ThreatenedPackage, VersionStatus,
};

use crate::cli::LockArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `lock` command.
///
/// Exits with code 4 when compromised packages remain unpinned after the run.
pub async fn execute(
    args: LockArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = LockpostConfig::load_or_default(config_path).await?;
    let scanner_config = scanner_config(&config, &args)?;

    if !args.path.is_dir() {
        return Err(CliError::Command(format!(
            "not a directory: {}",
            args.path.display()
        )));
    }

    let scanner = LockScannerBuilder::new().config(scanner_config).build()?;

    info!(path = %args.path.display(), "starting lockfile scan");
    let scan = scanner.scan(&args.path).await?;

    let applied = if args.update && !scan.plan.plan.is_empty() {
        if !scan.manifest_found {
            return Err(CliError::Command(format!(
                "--update requires a package.json in {}",
                args.path.display()
            )));
        }
        Some(scanner.apply_pins(&args.path, &scan.plan.plan).await?)
    } else {
        None
    };

    let report = LockReport { scan, applied };
    writer.render(&report)?;

    let remaining = report.remaining_unpinned();
    if !remaining.is_empty() {
        return Err(CliError::Compromised(format!(
            "{} compromised package(s) not pinned: {}",
            remaining.len(),
            remaining.join(", ")
        )));
    }

    Ok(())
}

/// Merge command-line overrides into the configured scanner settings.
fn scanner_config(config: &LockpostConfig, args: &LockArgs) -> Result<LockScannerConfig, CliError> {
    let mut scanner_config = LockScannerConfig::from_core(config);

    if let Some(chains) = args.chains {
        scanner_config.max_chains = chains;
    }
    if let Some(depth) = args.max_depth {
        scanner_config.max_chain_depth = depth;
    }
    if let Some(threats) = &args.threats {
        scanner_config.threat_db_path = threats.display().to_string();
    }
    if args.no_resolutions {
        scanner_config.also_resolutions = false;
    }
    if args.no_backup {
        scanner_config.backup = false;
    }

    scanner_config.validate()?;
    Ok(scanner_config)
}

/// Scan result plus the outcome of `--update`.
#[derive(Serialize)]
pub struct LockReport {
    #[serde(flatten)]
    pub scan: ScanReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<ApplyOutcome>,
}

impl LockReport {
    /// Compromised names neither pinned before the run nor written by `--update`.
    pub fn remaining_unpinned(&self) -> Vec<&str> {
        self.scan
            .unpinned_compromised()
            .into_iter()
            .filter(|name| {
                !self
                    .applied
                    .as_ref()
                    .is_some_and(|a| a.updated.iter().any(|u| u == name))
            })
            .collect()
    }
}

fn render_package(w: &mut dyn Write, package: &ThreatenedPackage) -> std::io::Result<()> {
    let title = if package.compromised {
        package.name.red().bold()
    } else {
        package.name.yellow()
    };
    write!(w, "  {title}")?;
    if let Some(pinned) = &package.pinned_to {
        write!(w, " {}", format!("(pinned to {pinned})").green())?;
    }
    writeln!(w)?;

    for version in &package.versions {
        let status = match version.status {
            VersionStatus::Compromised => version.status.to_string().red().bold(),
            VersionStatus::Safe => version.status.to_string().green(),
            VersionStatus::Unknown => version.status.to_string().dimmed(),
        };
        write!(w, "    {:<14} {}", version.version, status)?;
        if !version.matched_ranges.is_empty() {
            write!(w, "  matches {}", version.matched_ranges.join(" || "))?;
        }
        writeln!(w)?;

        if !version.dependents.is_empty() {
            writeln!(w, "      required by: {}", version.dependents.join(", "))?;
        }
        for chain in &version.chains {
            writeln!(w, "      {} {}", "chain:".dimmed(), chain)?;
        }
    }

    let target = package
        .safe_installed_max
        .as_deref()
        .map(|v| format!("{v} (installed)"))
        .or_else(|| package.last_safe.as_ref().map(|v| format!("{v} (last safe)")));
    if let Some(target) = target {
        writeln!(w, "    safe target: {target}")?;
    }
    if let Some(notes) = &package.notes {
        writeln!(w, "    {}", notes.dimmed())?;
    }
    if let Some(url) = &package.advisory_url {
        writeln!(w, "    {}", url.dimmed())?;
    }
    Ok(())
}

impl Render for LockReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let scan = &self.scan;

        writeln!(w, "Project: {}", scan.project_dir.bold())?;
        if scan.lockfiles.is_empty() {
            writeln!(w, "{}", "No lockfiles found.".yellow())?;
            return Ok(());
        }
        for lockfile in &scan.lockfiles {
            writeln!(
                w,
                "  {:<12} {} ({} packages, {} edges)",
                lockfile.kind, lockfile.path, lockfile.packages, lockfile.edges
            )?;
        }
        writeln!(
            w,
            "Distinct packages: {}   Threat entries: {}",
            scan.distinct_packages, scan.threat_entries
        )?;
        writeln!(w)?;

        if scan.threatened.is_empty() {
            writeln!(w, "{}", "No known-compromised packages installed.".green())?;
            return Ok(());
        }

        let compromised = scan.compromised_count();
        let summary = format!(
            "{} watched package(s), {} compromised",
            scan.threatened.len(),
            compromised
        );
        if compromised > 0 {
            writeln!(w, "{}", summary.red().bold())?;
        } else {
            writeln!(w, "{}", summary.green().bold())?;
        }
        for package in &scan.threatened {
            render_package(w, package)?;
        }

        let outcome = &scan.plan;
        if !outcome.already_pinned.is_empty() {
            writeln!(w)?;
            let names: Vec<_> = outcome.already_pinned.iter().map(String::as_str).collect();
            writeln!(w, "Already pinned: {}", names.join(", "))?;
        }

        if !outcome.plan.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Pin plan (package.json):".bold())?;
            writeln!(w, "  overrides:")?;
            for (name, version) in &outcome.plan.overrides {
                writeln!(w, "    \"{name}\": \"{version}\"")?;
            }
            if !outcome.plan.resolutions.is_empty() {
                writeln!(w, "  resolutions:")?;
                for (name, version) in &outcome.plan.resolutions {
                    writeln!(w, "    \"{name}\": \"{version}\"")?;
                }
            }
        }
        for warning in &outcome.plan.warnings {
            writeln!(w, "{} {warning}", "warning:".yellow().bold())?;
        }

        if let Some(applied) = &self.applied {
            writeln!(w)?;
            writeln!(
                w,
                "{} {}",
                "Updated".green().bold(),
                applied.path.display()
            )?;
            if !applied.updated.is_empty() {
                writeln!(w, "  overrides: {}", applied.updated.join(", "))?;
            }
            if !applied.updated_resolutions.is_empty() {
                writeln!(w, "  resolutions: {}", applied.updated_resolutions.join(", "))?;
            }
            if let Some(backup) = &applied.backup_path {
                writeln!(w, "  backup: {}", backup.display())?;
            }
        } else if !outcome.plan.is_empty() {
            writeln!(w)?;
            writeln!(w, "Run with --update to write the pin plan.")?;
        }

        Ok(())
    }
}
