use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::common::safety::SafetyTier;
use crate::scanner::types::ScannerCategory;

/// reclaim: find and safely remove reclaimable disk space
#[derive(Parser, Debug)]
#[command(
    name = "reclaim",
    version,
    about = "Find and safely remove caches, logs, build output and app leftovers",
    long_about = "reclaim scans for reclaimable files, classifies each by deletion risk,\n\
                  and removes only what you select. Every command previews by default;\n\
                  nothing is deleted without --yes.",
    after_help = "EXAMPLES:\n  \
        reclaim scan                              Scan every category\n  \
        reclaim scan --category development       Only build output and tool caches\n  \
        reclaim scan --format json                Machine-readable results\n  \
        reclaim clean --category system           Preview removing system caches\n  \
        reclaim clean --category system --yes     Remove them\n  \
        reclaim apps list                         List installed applications\n  \
        reclaim apps info Slack                   Show an app and its related files\n  \
        reclaim uninstall Slack --yes             Remove an app and its leftovers\n  \
        reclaim history --limit 20                Recent deletions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config, history and logs
    #[arg(long, global = true, env = "RECLAIM_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose logging to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for reclaimable files
    Scan {
        #[command(flatten)]
        filter: ScanFilter,

        /// Show scanner metadata for each entry
        #[arg(long)]
        detailed: bool,

        /// Maximum rows to show (human output only)
        #[arg(long, default_value = "30")]
        limit: usize,
    },

    /// Remove scanned entries (preview unless --yes)
    Clean {
        #[command(flatten)]
        filter: ScanFilter,

        /// Highest safety tier to include
        #[arg(long, default_value = "safe")]
        max_safety: SafetyFilter,

        /// Only these entry ids (from `scan --format json`)
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<String>>,

        /// Actually delete; without this only a preview is shown
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Inspect installed applications
    Apps {
        #[command(subcommand)]
        action: AppsAction,
    },

    /// Remove an application and its related files (preview unless --yes)
    Uninstall {
        /// Application name, bundle id, or path to the bundle
        name: String,

        /// Actually delete; without this only a preview is shown
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show executed deletions, oldest first
    History {
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Scan parameters shared by `scan` and `clean`
#[derive(clap::Args, Debug, Clone)]
pub struct ScanFilter {
    /// Only scan these categories
    #[arg(long = "category", value_delimiter = ',')]
    pub categories: Vec<ScannerCategory>,

    /// Override the configured size floor, in bytes
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Override the configured traversal depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum AppsAction {
    /// List installed applications
    List {
        /// Sort order
        #[arg(long, default_value = "size")]
        sort: AppSort,
    },

    /// Show an application and the files related to it
    Info {
        /// Application name, bundle id, or path to the bundle
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file
    Init,

    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SafetyFilter {
    Safe,
    Caution,
}

impl SafetyFilter {
    /// Whether an entry of this tier passes the filter
    pub fn allows(self, tier: SafetyTier) -> bool {
        match self {
            SafetyFilter::Safe => tier == SafetyTier::Safe,
            SafetyFilter::Caution => tier.is_deletable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AppSort {
    Name,
    Size,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_categories() {
        let cli = Cli::try_parse_from(["reclaim", "scan", "--category", "system,trash"]).unwrap();
        match cli.command {
            Commands::Scan { filter, .. } => assert_eq!(
                filter.categories,
                vec![ScannerCategory::System, ScannerCategory::Trash]
            ),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_safety_filter() {
        assert!(SafetyFilter::Safe.allows(SafetyTier::Safe));
        assert!(!SafetyFilter::Safe.allows(SafetyTier::Caution));
        assert!(SafetyFilter::Caution.allows(SafetyTier::Caution));
        assert!(!SafetyFilter::Caution.allows(SafetyTier::Protected));
    }
}
