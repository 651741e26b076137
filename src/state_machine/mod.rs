pub mod gate;
mod phase;
mod workflow;

pub use gate::{Cooldowns, GateDecision};
pub use phase::{Phase, PhaseResult, UnknownPhase};
pub use workflow::WorkflowState;
