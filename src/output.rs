//! Output formatting and styling for command results.
//!
//! Per-entry sweep outcomes go through `tracing` (see [`crate::logging`]);
//! this module prints the things a user asked to see: rule listings, sweep
//! summaries, dry-run plans and undo reports.

use crate::rule_store::{RuleKind, RuleStore};
use crate::sorter::SweepReport;
use crate::undo::UndoReport;
use colored::*;

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the core settings and every rule of a drop folder.
    pub fn rules(store: &RuleStore) {
        Self::info(&format!("Drop folder: {}", store.drop_folder().display()));
        println!("  delimiter: {}", store.delimiter().bold());
        println!("  polling:   {}s", store.polling_interval_secs());

        for kind in [RuleKind::Prefix, RuleKind::Extension] {
            Self::header(&format!("{} rules", kind));
            let rules = store.rules(kind);
            if rules.is_empty() {
                println!("  {}", "(none)".dimmed());
                continue;
            }

            let width = rules.keys().map(|name| name.len()).max().unwrap_or(0);
            for (name, destination) in rules {
                println!("  {:<width$}  →  {}", name.green(), destination, width = width);
            }
        }
    }

    /// Prints the plan of a dry-run sweep.
    pub fn plan(report: &SweepReport) {
        if report.planned.is_empty() {
            Self::dry_run_notice("Nothing would be moved.");
        } else {
            Self::header("DRY RUN: entries would be moved as follows:");
            for (name, destination) in &report.planned {
                println!(" - {}", name);
                println!("   → {}", destination.display());
            }
        }
        Self::sweep_summary(report);
    }

    /// Prints counts for a finished sweep.
    pub fn sweep_summary(report: &SweepReport) {
        Self::header("SUMMARY");
        let rows = [
            ("Moved", report.moved.len()),
            ("Planned", report.planned.len()),
            ("Unmatched", report.unmatched.len()),
            ("Filtered", report.filtered.len()),
            ("Failed", report.failed.len()),
        ];

        for (label, count) in rows {
            if count == 0 {
                continue;
            }
            let count = if label == "Failed" {
                count.to_string().red()
            } else {
                count.to_string().green()
            };
            println!("{:<10} | {}", label, count);
        }
        println!("{}", "-".repeat(20));
        println!(
            "{:<10} | {}",
            "Total".bold(),
            report.total_processed().to_string().bold()
        );
    }

    /// Prints what an undo restored, skipped and failed on.
    pub fn undo_report(report: &UndoReport) {
        Self::success("Undo complete!");
        println!("  Restored: {}", report.restored_files.to_string().green());

        if !report.skipped_files.is_empty() {
            println!("  Skipped: {}", report.skipped_files.len());
            for (path, reason) in &report.skipped_files {
                println!("    - {}: {}", path.display(), reason);
            }
        }

        if !report.failed_restores.is_empty() {
            println!("  Failed: {}", report.failed_restores.len().to_string().red());
            for (path, reason) in &report.failed_restores {
                eprintln!("    - {}: {}", path.display(), reason);
            }
            Self::warning("History was kept because of failures. Fix them and run undo again.");
        }
    }
}
