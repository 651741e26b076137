//! Terminal output for the CLI, styled with `console`.
//!
//! Logs go to stderr through tracing; this module writes the short human
//! summary on stdout.

use std::error::Error as _;

use chrono::{DateTime, Utc};
use console::Style;

use crate::error::InvocationError;
use crate::orchestrator::InvocationOutcome;
use crate::state_machine::{GateDecision, Phase, PhaseResult, WorkflowState};

/// Colour palette shared by every printer.
pub struct Report {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl Report {
    pub fn outcome(&self, outcome: &InvocationOutcome) {
        match outcome {
            InvocationOutcome::Completed { phase, report } => {
                println!("  {} {phase} succeeded", self.green.apply_to("✓"));
                if let Some(key) = &report.artifact_key {
                    println!("    {} {key}", self.dim.apply_to("stored"));
                }
                if let Some(handle) = &report.task_handle {
                    println!("    {} {handle}", self.dim.apply_to("task"));
                }
            }
            InvocationOutcome::Waiting { phase, ready_at } => {
                println!(
                    "  {} {phase} waiting for cooldown until {}",
                    self.yellow.apply_to("…"),
                    stamp(*ready_at)
                );
            }
        }
    }

    pub fn failure(&self, err: &InvocationError) {
        println!("  {} {err}", self.red.apply_to("✗"));
        let mut cause = err.source().and_then(|e| e.source());
        while let Some(e) = cause {
            println!("    {} {e}", self.dim.apply_to("caused by"));
            cause = e.source();
        }
    }

    /// Print the record at `key` and what the next invocation would do.
    pub fn state(&self, key: &str, state: &WorkflowState, next: Phase, gate: GateDecision) {
        let result_style = match state.last_result {
            PhaseResult::Succeeded => &self.green,
            PhaseResult::Failed => &self.red,
            PhaseResult::Pending => &self.yellow,
        };

        println!("{}", self.dim.apply_to(format!("─── {key} ───")));
        match state.current_phase {
            Some(phase) => println!("  phase         {phase}"),
            None => println!("  phase         {}", self.dim.apply_to("(never run)")),
        }
        println!("  result        {}", result_style.apply_to(state.last_result));
        println!("  last attempt  {}", or_dash(&state.last_attempt_time));
        println!(
            "  task handle   {}",
            or_dash(state.last_task_handle.as_deref().unwrap_or_default())
        );
        if !state.error_detail.is_empty() {
            println!("  error         {}", self.red.apply_to(&state.error_detail));
        }

        match gate {
            GateDecision::Open => {
                println!("  next          {next} {}", self.green.apply_to("(ready now)"));
            }
            GateDecision::Closed { ready_at } => {
                println!(
                    "  next          {next} {}",
                    self.yellow.apply_to(format!("(not before {})", stamp(ready_at)))
                );
            }
        }
    }

    pub fn reset(&self, key: &str, state: &WorkflowState) {
        println!(
            "  {} {key} reset, next run executes {}",
            self.green.apply_to("✓"),
            state.next_phase()
        );
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
