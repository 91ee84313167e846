use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use reclaim::cleaner::DeletionTarget;
use reclaim::cli::args::{
    AppSort, AppsAction, Cli, Commands, ConfigAction, OutputFormat, SafetyFilter, ScanFilter,
};
use reclaim::cli::output;
use reclaim::common::config::Config;
use reclaim::scanner::types::ScanConfig;
use reclaim::scanner::{ScanObserver, ScanProgress, ScanReport};
use reclaim::Engine;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => Config::default_data_dir()?,
    };
    let _guard = init_logging(&data_dir, cli.verbose);

    match &cli.command {
        Commands::Scan {
            filter,
            detailed,
            limit,
        } => cmd_scan(&cli, &data_dir, filter, *detailed, *limit),

        Commands::Clean {
            filter,
            max_safety,
            ids,
            yes,
        } => cmd_clean(&cli, &data_dir, filter, *max_safety, ids.as_deref(), *yes),

        Commands::Apps { action } => cmd_apps(&cli, &data_dir, action),

        Commands::Uninstall { name, yes } => cmd_uninstall(&cli, &data_dir, name, *yes),

        Commands::History { limit } => cmd_history(&cli, &data_dir, *limit),

        Commands::Config { action } => cmd_config(&cli, &data_dir, action),
    }
}

// ─── Setup ────────────────────────────────────────────────────────────────────

/// Warnings go to stderr (debug with --verbose, RUST_LOG wins when set);
/// info and above also land in a daily log file under the data directory.
fn init_logging(data_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "reclaim=debug" } else { "reclaim=warn" };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let logs_dir = Config::logs_dir(data_dir);
    let appender = std::fs::create_dir_all(&logs_dir).ok().and_then(|_| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("reclaim")
            .filename_suffix("log")
            .build(&logs_dir)
            .ok()
    });

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("reclaim=info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if guard.is_none() {
        tracing::warn!(dir = %logs_dir.display(), "log directory unavailable; file logging disabled");
    }
    guard
}

fn build_engine(data_dir: &Path) -> Result<Engine> {
    let config = Config::load(data_dir).context("failed to load configuration")?;
    Engine::new(&config, data_dir).context("failed to start engine")
}

/// Configured scan parameters with command-line overrides applied
fn effective_scan_config(base: &ScanConfig, filter: &ScanFilter) -> ScanConfig {
    ScanConfig::new(
        filter.min_size.unwrap_or(base.min_size()),
        filter.max_depth.unwrap_or(base.max_depth()),
    )
    .with_excluded(base.excluded_paths().to_vec())
    .with_follow_symlinks(base.follow_symlinks())
}

fn run_scan(engine: &Engine, filter: &ScanFilter, show_progress: bool) -> ScanReport {
    let config = effective_scan_config(engine.scan_config(), filter);
    if !show_progress {
        return engine.scan_categories(&filter.categories, &config, None);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Scanning...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel::<ScanProgress>();
    let report = std::thread::scope(|s| {
        let watcher = pb.clone();
        s.spawn(move || {
            for event in rx {
                match event {
                    ScanProgress::Started { scanner_id } => {
                        watcher.set_message(format!("Scanning {}...", scanner_id))
                    }
                    ScanProgress::Completed { scanner_id, count } => {
                        watcher.println(format!("  {} {} ({} found)", "✓".green(), scanner_id, count))
                    }
                    ScanProgress::Failed { scanner_id, .. } => {
                        watcher.println(format!("  {} {} failed", "✗".red(), scanner_id))
                    }
                }
            }
        });
        let report =
            engine.scan_categories(&filter.categories, &config, Some(&tx as &dyn ScanObserver));
        drop(tx);
        report
    });

    pb.finish_and_clear();
    report
}

fn wants_progress(cli: &Cli) -> bool {
    matches!(cli.format, OutputFormat::Human)
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

fn cmd_scan(
    cli: &Cli,
    data_dir: &Path,
    filter: &ScanFilter,
    detailed: bool,
    limit: usize,
) -> Result<()> {
    let engine = build_engine(data_dir)?;
    let report = run_scan(&engine, filter, wants_progress(cli));

    match cli.format {
        OutputFormat::Human => output::print_scan_report(&report, engine.home(), limit, detailed),
        OutputFormat::Json => output::print_json(&report)?,
    }
    Ok(())
}

// ─── Clean ────────────────────────────────────────────────────────────────────

fn cmd_clean(
    cli: &Cli,
    data_dir: &Path,
    filter: &ScanFilter,
    max_safety: SafetyFilter,
    ids: Option<&[String]>,
    yes: bool,
) -> Result<()> {
    let engine = build_engine(data_dir)?;
    let report = run_scan(&engine, filter, wants_progress(cli));

    let selection: Vec<DeletionTarget> = report
        .entries
        .iter()
        .filter(|e| max_safety.allows(e.safety))
        .filter(|e| ids.map_or(true, |ids| ids.iter().any(|id| id == &e.id)))
        .map(DeletionTarget::from)
        .collect();

    if let Some(ids) = ids {
        let unmatched = ids
            .iter()
            .filter(|id| {
                !report
                    .entries
                    .iter()
                    .any(|e| &e.id == *id && max_safety.allows(e.safety))
            })
            .count();
        if unmatched > 0 {
            tracing::warn!(unmatched, "some requested ids were not found or not allowed by --max-safety");
        }
    }

    if selection.is_empty() {
        if matches!(cli.format, OutputFormat::Human) {
            println!();
            println!("  {} Nothing to clean!", "✨");
            println!();
        } else {
            output::print_json(&engine.preview(&[]))?;
        }
        return Ok(());
    }

    let result = if yes {
        engine.execute(&selection)
    } else {
        engine.preview(&selection)
    };

    match cli.format {
        OutputFormat::Human => output::print_execution(&result, engine.home()),
        OutputFormat::Json => output::print_json(&result)?,
    }
    Ok(())
}

// ─── Apps ─────────────────────────────────────────────────────────────────────

fn cmd_apps(cli: &Cli, data_dir: &Path, action: &AppsAction) -> Result<()> {
    let engine = build_engine(data_dir)?;

    match action {
        AppsAction::List { sort } => {
            let mut apps = engine.list_apps();
            if *sort == AppSort::Size {
                apps.sort_by(|a, b| b.size.cmp(&a.size));
            }
            match cli.format {
                OutputFormat::Human => output::print_apps(&apps),
                OutputFormat::Json => output::print_json(&apps)?,
            }
        }
        AppsAction::Info { name } => {
            let app = engine
                .resolve_app(name)
                .with_context(|| format!("no installed application matches '{}'", name))?;
            let related = engine.find_related(&app);
            match cli.format {
                OutputFormat::Human => output::print_app_info(&app, &related, engine.home()),
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "app": app,
                    "related": related,
                }))?,
            }
        }
    }
    Ok(())
}

// ─── Uninstall ────────────────────────────────────────────────────────────────

fn cmd_uninstall(cli: &Cli, data_dir: &Path, name: &str, yes: bool) -> Result<()> {
    let engine = build_engine(data_dir)?;
    let app = engine
        .resolve_app(name)
        .with_context(|| format!("no installed application matches '{}'", name))?;
    let related = engine.find_related(&app);

    let result = if yes {
        engine.uninstall(&app, &related)
    } else {
        engine.preview_uninstall(&app, &related)
    };

    match cli.format {
        OutputFormat::Human => output::print_uninstall(&result, engine.home()),
        OutputFormat::Json => output::print_json(&result)?,
    }
    Ok(())
}

// ─── History ──────────────────────────────────────────────────────────────────

fn cmd_history(cli: &Cli, data_dir: &Path, limit: Option<usize>) -> Result<()> {
    let engine = build_engine(data_dir)?;
    let entries = engine.history(limit).context("failed to read history")?;

    match cli.format {
        OutputFormat::Human => output::print_history(&entries, engine.home()),
        OutputFormat::Json => output::print_json(&entries)?,
    }
    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(cli: &Cli, data_dir: &Path, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(data_dir).context("failed to load configuration")?;
            match cli.format {
                OutputFormat::Human => output::print_config(&config, data_dir)?,
                OutputFormat::Json => output::print_json(&config)?,
            }
        }
        ConfigAction::Init => {
            let path = Config::config_path(data_dir);
            if path.exists() {
                println!(
                    "  {} Config already exists at {}",
                    "ℹ️",
                    path.display().to_string().cyan()
                );
            } else {
                Config::default()
                    .save(data_dir)
                    .context("failed to write configuration")?;
                println!(
                    "  {} Created {}",
                    "✓".green(),
                    path.display().to_string().cyan()
                );
            }
        }
        ConfigAction::Path => {
            let path: PathBuf = Config::config_path(data_dir);
            println!("{}", path.display());
        }
    }
    Ok(())
}
