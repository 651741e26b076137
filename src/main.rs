use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use object_store::ObjectStore;
use tracing::error;

use saas_backup::cli::{Cli, Command};
use saas_backup::config::BackupConfig;
use saas_backup::executor::BackupExecutor;
use saas_backup::orchestrator::{self, Orchestrator, TriggerEvent};
use saas_backup::state_machine::WorkflowState;
use saas_backup::storage::{StateStore, build_object_store};
use saas_backup::telemetry::init_tracing;
use saas_backup::ui::Report;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = BackupConfig::load(cli.config.as_deref(), cli.env_file.as_deref())
        .context("loading configuration")?;
    let store: Arc<dyn ObjectStore> =
        build_object_store(&config.storage).context("opening blob storage")?;
    let states = StateStore::new(store.clone(), &config.storage.state_prefix);
    let cooldowns = config.cooldowns.to_cooldowns();
    let report = Report::default();

    match cli.command {
        Command::Run { event } => {
            let executor = BackupExecutor::from_config(&config, store)?;
            let orchestrator = Orchestrator::new(executor, states, cooldowns);
            match orchestrator.handle(&TriggerEvent::new(event)).await {
                Ok(outcome) => {
                    report.outcome(&outcome);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report.failure(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Status => {
            let state = states.load().await.context("loading workflow state")?;
            let (next, gate) = orchestrator::plan(&state, &cooldowns, Utc::now());
            report.state(states.key(), &state, next, gate);
            Ok(ExitCode::SUCCESS)
        }
        Command::Reset { phase } => {
            let state = match phase {
                Some(phase) => WorkflowState::pending(phase.into()),
                None => WorkflowState::default(),
            };
            states.save(&state).await.context("saving workflow state")?;
            report.reset(states.key(), &state);
            Ok(ExitCode::SUCCESS)
        }
    }
}
