//! Command-line interface built on clap.
//!
//! [`Cli`] holds the global flags (--config, --env-file, --verbose,
//! --log-format) and one of the [`Command`] subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state_machine::Phase;

/// Scheduled backup of the issue tracker and the wiki into blob storage.
#[derive(Debug, Parser)]
#[command(name = "saas-backup", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file. Defaults to ./backup.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// dotenv file loaded before reading BACKUP_* variables.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Plain,
    /// One JSON object per event.
    Json,
}

/// Phase names accepted by `reset --phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    InitiateBackups,
    SaveTrackerArtifact,
    SaveWikiArtifact,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::InitiateBackups => Phase::InitiateBackups,
            PhaseArg::SaveTrackerArtifact => Phase::SaveTrackerArtifact,
            PhaseArg::SaveWikiArtifact => Phase::SaveWikiArtifact,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Handle one scheduler trigger: run at most one phase.
    Run {
        /// Name of the triggering event, recorded in logs.
        #[arg(long, default_value = "scheduled")]
        event: String,
    },

    /// Show the workflow record and when the next phase may run.
    Status,

    /// Overwrite the workflow record.
    ///
    /// Without --phase the record is cleared and the next run initiates new
    /// exports. With --phase the next run executes that phase.
    Reset {
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_with_default_event() {
        let cli = Cli::parse_from(["saas-backup", "run"]);
        match cli.command {
            Command::Run { event } => assert_eq!(event, "scheduled"),
            _ => panic!("expected Run command"),
        }
        assert_eq!(cli.log_format, LogFormat::Plain);
        assert!(!cli.verbose);
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "saas-backup",
            "status",
            "--config",
            "/etc/backup.toml",
            "--env-file",
            ".env.prod",
            "--log-format",
            "json",
            "-v",
        ]);
        assert!(matches!(cli.command, Command::Status));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/backup.toml")));
        assert_eq!(cli.env_file, Some(PathBuf::from(".env.prod")));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(cli.verbose);
    }

    #[test]
    fn cli_parses_reset_phase() {
        let cli = Cli::parse_from(["saas-backup", "reset", "--phase", "save-wiki-artifact"]);
        match cli.command {
            Command::Reset { phase } => {
                assert_eq!(phase.map(Phase::from), Some(Phase::SaveWikiArtifact));
            }
            _ => panic!("expected Reset command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_phase() {
        assert!(Cli::try_parse_from(["saas-backup", "reset", "--phase", "teardown"]).is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
