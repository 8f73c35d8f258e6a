//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::report::ReportArgs;

/// Calendar time statistics.
///
/// Reads events from a Google Calendar (or a local cache of one) and reports
/// how much time was spent per day and per configured category.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (TOML, or YAML with a .yaml/.yml extension).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report time spent per day and per category.
    Report(ReportArgs),

    /// List configured categories in the order they are matched.
    Categories,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_flags() {
        let cli = Cli::try_parse_from([
            "ct",
            "--config",
            "ct.yaml",
            "report",
            "--source",
            "work",
            "--weeks",
            "2",
            "--cache",
            "events.json",
            "--decimal-output",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("ct.yaml")));
        let Some(Commands::Report(args)) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.source.as_deref(), Some("work"));
        assert_eq!(args.weeks, Some(2));
        assert_eq!(args.cache, Some(PathBuf::from("events.json")));
        assert!(args.decimal_output);
        assert!(!args.json);
    }
}
