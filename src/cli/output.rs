use colored::*;
use serde::Serialize;
use std::path::Path;

use crate::apps::{AppBundle, RelatedFile};
use crate::cleaner::{ExecutionResult, JournalEntry, UninstallResult};
use crate::common::config::Config;
use crate::common::format::{
    format_duration, format_path, format_safety, format_size, format_size_colored, truncate,
};
use crate::scanner::types::{DiscoveredEntry, ScannerCategory};
use crate::scanner::ScanReport;

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn rule(width: usize) {
    println!("{}", "─".repeat(width).dimmed());
}

fn category_icon(category: ScannerCategory) -> &'static str {
    match category {
        ScannerCategory::System => "📁",
        ScannerCategory::Browser => "🌐",
        ScannerCategory::Development => "🔧",
        ScannerCategory::Apps => "📦",
        ScannerCategory::Trash => "🗑️",
    }
}

/// Print scan results grouped by category
pub fn print_scan_report(report: &ScanReport, home: &Path, limit: usize, detailed: bool) {
    println!();
    println!("{}  reclaim scan results", "🧹");
    rule(70);
    println!(
        "  Scanned in {}  •  {} reclaimable  •  {} entries",
        format_duration(report.duration).cyan(),
        format_size_colored(report.total_size()),
        report.entries.len().to_string().cyan()
    );
    rule(70);
    println!();

    if report.is_empty() {
        println!("  {} Nothing to reclaim.", "✨");
    }

    let mut shown = 0usize;
    for category in ScannerCategory::ALL {
        let entries = report.by_category(category);
        if entries.is_empty() {
            continue;
        }
        let total: u64 = entries.iter().map(|e| e.size).sum();
        println!(
            "  {} {} ({})",
            category_icon(category),
            category.to_string().bold(),
            format_size_colored(total)
        );
        for entry in entries {
            if shown >= limit {
                break;
            }
            print_entry(entry, home, detailed);
            shown += 1;
        }
        println!();
    }

    if report.entries.len() > shown {
        println!(
            "  {} {} more entries not shown (use {} or {})",
            "…".dimmed(),
            report.entries.len() - shown,
            "--limit".cyan(),
            "--format json".cyan()
        );
        println!();
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("  {} {} scanners failed:", "⚠".yellow(), failures.len());
        for run in failures {
            println!(
                "    {} {}: {}",
                "→".dimmed(),
                run.name,
                run.error.as_deref().unwrap_or("unknown error").dimmed()
            );
        }
        println!();
    }

    rule(70);
    println!(
        "  {} Run {} to preview removal",
        "💡",
        "reclaim clean --category <name>".cyan()
    );
    println!();
}

fn print_entry(entry: &DiscoveredEntry, home: &Path, detailed: bool) {
    println!(
        "    {:<42} {:>10}  {}",
        truncate(&entry.name, 42),
        format_size(entry.size),
        format_safety(entry.safety)
    );
    if detailed {
        println!(
            "      {} {}",
            "↳".dimmed(),
            format_path(&entry.path, home).dimmed()
        );
        println!("      {} id {}", "↳".dimmed(), entry.id.dimmed());
        for (key, value) in &entry.metadata {
            println!("      {} {}: {}", "↳".dimmed(), key.dimmed(), value.dimmed());
        }
    }
}

/// Print the outcome of a clean (or its preview)
pub fn print_execution(result: &ExecutionResult, home: &Path) {
    println!();
    let (icon, label) = if result.simulated {
        ("ℹ️", "Preview")
    } else {
        ("🔥", "Deleted")
    };
    println!(
        "  {} {}: {} items, {}",
        icon,
        label.bold(),
        result.succeeded.to_string().cyan(),
        format_size_colored(result.bytes_freed)
    );

    for path in result.removed.iter().take(20) {
        println!("    {} {}", "•".green(), format_path(path, home).dimmed());
    }
    if result.removed.len() > 20 {
        println!("    … and {} more", result.removed.len() - 20);
    }

    if !result.skipped_items.is_empty() {
        println!();
        println!("  {} {} skipped:", "●".yellow(), result.skipped);
        for item in &result.skipped_items {
            println!(
                "    {} {} ({})",
                "→".dimmed(),
                format_path(&item.path, home),
                item.reason.to_string().yellow()
            );
        }
    }

    if !result.failures.is_empty() {
        println!();
        println!("  {} {} failed:", "⚠".red(), result.failed);
        for item in &result.failures {
            println!(
                "    {} {} ({})",
                "→".dimmed(),
                format_path(&item.path, home),
                item.reason.red()
            );
        }
    }

    if result.simulated && result.succeeded > 0 {
        println!();
        println!("  {} Re-run with {} to delete", "💡", "--yes".cyan());
    }
    println!();
}

/// Print installed applications
pub fn print_apps(apps: &[AppBundle]) {
    println!();
    println!("  {} Installed applications", "📦");
    rule(80);
    if apps.is_empty() {
        println!("  No applications found.");
        println!();
        return;
    }

    println!(
        "  {:<30} {:<36} {:>10}",
        "Name".dimmed(),
        "Bundle id".dimmed(),
        "Size".dimmed()
    );
    for app in apps {
        println!(
            "  {:<30} {:<36} {:>10}",
            truncate(app.display_name(), 30),
            truncate(app.bundle_id().unwrap_or("-"), 36),
            format_size(app.size)
        );
    }
    rule(80);
    let total: u64 = apps.iter().map(|a| a.size).sum();
    println!("  {} apps, {}", apps.len(), format_size_colored(total));
    println!();
}

/// Print one application and its related files
pub fn print_app_info(app: &AppBundle, related: &[RelatedFile], home: &Path) {
    println!();
    println!("  {} {}", "📦", app.display_name().bold());
    println!("    Path:      {}", format_path(&app.path, home));
    println!("    Bundle id: {}", app.bundle_id().unwrap_or("unknown"));
    println!("    Version:   {}", app.version().unwrap_or("unknown"));
    println!("    Size:      {}", format_size(app.size));
    println!();

    if related.is_empty() {
        println!("  No related files found.");
        println!();
        return;
    }

    let total: u64 = related.iter().map(|f| f.size).sum();
    println!(
        "  Related files ({}):",
        format_size_colored(total)
    );
    for file in related {
        let owner = if file.system_owned {
            " [system]".red().to_string()
        } else {
            String::new()
        };
        println!(
            "    {:<16} {:>10}  {}{}",
            file.kind.to_string().dimmed(),
            format_size(file.size),
            format_path(&file.path, home),
            owner
        );
    }
    println!();
}

/// Print the outcome of an uninstall (or its preview)
pub fn print_uninstall(result: &UninstallResult, home: &Path) {
    println!();
    println!("  {} {}", "📦", result.app_name.bold());
    println!("  {}", "Application bundle".underline());
    print_execution(&result.bundle, home);
    println!("  {}", "Related files".underline());
    print_execution(&result.related, home);
    println!(
        "  Total: {}",
        format_size_colored(result.bytes_freed())
    );
    println!();
}

/// Print deletion history
pub fn print_history(entries: &[JournalEntry], home: &Path) {
    println!();
    println!("  {} Deletion history", "📋");
    rule(80);
    if entries.is_empty() {
        println!("  No deletions recorded.");
        println!();
        return;
    }
    for entry in entries {
        println!(
            "  {}  {:>10}  {}",
            entry
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            entry.size.map(format_size).unwrap_or_else(|| "-".to_string()),
            format_path(&entry.path, home)
        );
    }
    rule(80);
    let total: u64 = entries.iter().filter_map(|e| e.size).sum();
    println!("  {} entries, {} freed", entries.len(), format_size_colored(total));
    println!();
}

/// Print the effective configuration and where it lives
pub fn print_config(config: &Config, data_dir: &Path) -> anyhow::Result<()> {
    let path = Config::config_path(data_dir);
    println!();
    println!("  {} Configuration", "⚙️");
    rule(60);
    if path.exists() {
        println!("  File:    {}", path.display().to_string().cyan());
    } else {
        println!(
            "  File:    {} {}",
            path.display(),
            "(not created, using defaults)".dimmed()
        );
    }
    println!("  Journal: {}", config.journal_path(data_dir).display());
    println!("  Logs:    {}", Config::logs_dir(data_dir).display());
    rule(60);
    for line in toml::to_string_pretty(config)?.lines() {
        println!("  {}", line);
    }
    println!();
    Ok(())
}
