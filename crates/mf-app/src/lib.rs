//! mf-app: the simulation orchestrator and the unified error taxonomy that
//! sits above the solver/simulator crates (spec section 5 and section 7).
//!
//! This is the only crate in the workspace expected to call into
//! `tracing` directly: lower crates declare the dependency but leave
//! emitting events to their caller.

pub mod error;
pub mod orchestrator;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::Orchestrator;
