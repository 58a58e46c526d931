//! mf-mna: Modified Nodal Analysis solver for steady single-phase flow
//! through a microfluidic network.
//!
//! Builds the partitioned system `[[G, B], [C, D]] * [p; q] = [i; e]` from a
//! graph's channel resistances and pumps, solves it by column-pivoted QR,
//! and writes node pressures, channel flow rates, and pump duals back into
//! the graph. Hybrid-mode callers (mf-sim's Abstract-CFD coupler) extend
//! the assembled system with extra conductances and opening constraints
//! via [`solve_hybrid`] without this crate depending on the CFD side.

pub mod error;
pub mod solve;
pub mod system;

pub use error::{MnaError, MnaResult};
pub use solve::{solve, solve_hybrid, SolveReport};
pub use system::{ExtraConductance, ExtraConstraint, SystemLayout};
