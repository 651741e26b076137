use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::error::{BackupError, ErrorKind, InvocationError};
use crate::executor::{PhaseContext, PhaseExecutor, PhaseReport};
use crate::state_machine::{Cooldowns, GateDecision, Phase, WorkflowState, gate};
use crate::storage::StateStore;

/// The event a scheduler sends to trigger an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerEvent {
    pub name: String,
}

impl TriggerEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Successful ends of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The phase ran and succeeded; the record was updated.
    Completed { phase: Phase, report: PhaseReport },
    /// The phase's cooldown has not elapsed. Nothing ran and nothing was
    /// written.
    Waiting { phase: Phase, ready_at: DateTime<Utc> },
}

/// Phase the next invocation would run from `state`, and whether its gate is
/// open at `now`.
pub fn plan(state: &WorkflowState, cooldowns: &Cooldowns, now: DateTime<Utc>) -> (Phase, GateDecision) {
    let phase = state.next_phase();
    let decision = gate::check(state.last_attempt(), cooldowns.for_phase(phase), now);
    (phase, decision)
}

/// Runs at most one phase per invocation, reconstructing all progress from
/// the persisted [`WorkflowState`].
///
/// Invocations are assumed to be serialized by the scheduler; two running at
/// once would race on the record.
pub struct Orchestrator<E> {
    executor: E,
    states: StateStore,
    cooldowns: Cooldowns,
}

impl<E: PhaseExecutor> Orchestrator<E> {
    pub fn new(executor: E, states: StateStore, cooldowns: Cooldowns) -> Self {
        Self {
            executor,
            states,
            cooldowns,
        }
    }

    /// Handle one scheduler trigger.
    pub async fn handle(&self, event: &TriggerEvent) -> Result<InvocationOutcome, InvocationError> {
        self.handle_at(event, Utc::now()).await
    }

    /// [`Orchestrator::handle`] with an explicit clock.
    pub async fn handle_at(
        &self,
        event: &TriggerEvent,
        now: DateTime<Utc>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let span = tracing::info_span!(
            "invocation",
            event = %event.name,
            invocation.id = %Uuid::new_v4(),
        );
        self.invoke(now).instrument(span).await
    }

    async fn invoke(&self, now: DateTime<Utc>) -> Result<InvocationOutcome, InvocationError> {
        let mut state = self.states.load().await.map_err(InvocationError::StateLoad)?;
        info!(
            current = ?state.current_phase,
            result = %state.last_result,
            last_attempt = %state.last_attempt_time,
            "loaded workflow state"
        );

        let (phase, decision) = plan(&state, &self.cooldowns, now);
        if let GateDecision::Closed { ready_at } = decision {
            info!(%phase, %ready_at, "cooldown not elapsed, waiting");
            return Ok(InvocationOutcome::Waiting { phase, ready_at });
        }

        info!(%phase, "executing phase");
        let ctx = PhaseContext {
            now,
            task_handle: state.last_task_handle.as_deref(),
        };
        let result = self.executor.execute(phase, &ctx).await;

        match result {
            Ok(report) => {
                state.record_success(phase, now, report.task_handle.clone());
                self.persist(&state)
                    .await
                    .map_err(|source| InvocationError::Persistence {
                        source,
                        phase_error: None,
                    })?;
                info!(%phase, artifact = ?report.artifact_key, "phase succeeded");
                Ok(InvocationOutcome::Completed { phase, report })
            }
            Err(err) => Err(self.fail(state, phase, now, err).await),
        }
    }

    /// The single failure path: record the failure against the phase that
    /// ran, persist it, and hand the error back to the caller.
    async fn fail(
        &self,
        mut state: WorkflowState,
        phase: Phase,
        now: DateTime<Utc>,
        err: BackupError,
    ) -> InvocationError {
        match err.kind() {
            ErrorKind::NotReady => warn!(%phase, error = %err, "export not ready, will retry"),
            kind => error!(%phase, %kind, error = %err, "phase failed"),
        }

        let task_handle = err.task_handle().map(str::to_string);
        state.record_failure(phase, now, err.to_string(), task_handle);
        match self.persist(&state).await {
            Ok(()) => InvocationError::PhaseFailed { phase, source: err },
            Err(source) => InvocationError::Persistence {
                source,
                phase_error: Some(err),
            },
        }
    }

    async fn persist(&self, state: &WorkflowState) -> Result<(), BackupError> {
        self.states.save(state).await.inspect_err(|e| {
            error!(key = %self.states.key(), error = %e, "could not persist workflow state");
        })
    }
}
