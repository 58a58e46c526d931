//! mf-sim: transient simulators layered over the steady-state MNA solver.
//!
//! Provides:
//! - [`droplet`]: event-driven immiscible-droplet flow
//! - [`mixing`]: instantaneous-mixing passive-scalar transport
//! - [`diffusive`]: diffusive-mixing junction topology and concentration
//!   profile analysis
//! - [`hybrid`]: the outer Abstract-CFD coupling loop

pub mod diffusive;
pub mod droplet;
pub mod error;
pub mod hybrid;
pub mod mixing;

// Internal module
mod events;

// Re-exports for public API
pub use diffusive::{apportion_sections, classify_topology, compose_profile, InflowSource, OutflowSection};
pub use droplet::{Boundary, BoundaryCrossing, BoundaryKind, BoundaryState, Droplet, DropletPhase, DropletSimulator};
pub use error::{
    DiffusiveError, DiffusiveResult, DropletError, DropletResult, HybridError, HybridResult, MixingError,
    MixingResult,
};
pub use hybrid::{CfdSimulator, HybridCoupler, NaiveScheme, RelaxationScheme};
pub use mixing::{Injection as MixingInjection, MixingSimulator};
