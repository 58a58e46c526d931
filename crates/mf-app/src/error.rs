//! The orchestrator's unified error taxonomy (spec.md section 7).
//!
//! Every lower crate keeps its own error type; this module only classifies
//! them into the five kinds the orchestrator reports to callers and decides
//! how to propagate. Named `OrchestratorError` rather than `CoreError` to
//! avoid colliding with the foundation-level `mf_core::CoreError`, which
//! covers a different (lower, numeric-invariant) layer entirely.
use thiserror::Error;

/// Unified error taxonomy for the simulation orchestrator.
///
/// `Topology` and `Configuration` are fatal at setup, before the first
/// solve. `Numerical`, `RuntimeLimit`, and `Integration` abort the current
/// run but leave the result log intact up to the last saved snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("topology invalid: {what}")]
    Topology { what: String },

    #[error("configuration invalid: {what}")]
    Configuration { what: String },

    #[error("numerical failure: {what}")]
    Numerical { what: String },

    #[error("runtime limit exceeded: {what}")]
    RuntimeLimit { what: String },

    #[error("cfd integration failure: {what}")]
    Integration { what: String },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl From<mf_graph::GraphError> for OrchestratorError {
    fn from(e: mf_graph::GraphError) -> Self {
        use mf_graph::GraphError as G;
        match e {
            G::InvalidNodeRef { .. }
            | G::InvalidOpeningNode { .. }
            | G::UngroundedNode { .. }
            | G::DuplicateGroupMembership { .. }
            | G::EmptyModule { .. } => OrchestratorError::Topology { what: e.to_string() },
            G::InvalidGeometry { .. } | G::IdNotFound { .. } => {
                OrchestratorError::Configuration { what: e.to_string() }
            }
        }
    }
}

impl From<mf_resistance::ResistanceError> for OrchestratorError {
    fn from(e: mf_resistance::ResistanceError) -> Self {
        use mf_resistance::ResistanceError as R;
        match e {
            R::NonPositiveResistance { .. } => OrchestratorError::Numerical { what: e.to_string() },
            R::DropletsUnsupported { .. } | R::NonPhysical { .. } => {
                OrchestratorError::Configuration { what: e.to_string() }
            }
        }
    }
}

impl From<mf_mna::MnaError> for OrchestratorError {
    fn from(e: mf_mna::MnaError) -> Self {
        use mf_mna::MnaError as M;
        match e {
            M::RankDeficient => OrchestratorError::Numerical { what: e.to_string() },
            M::UnknownNode(_) | M::UnknownPump(_) => OrchestratorError::Configuration { what: e.to_string() },
            M::Graph(g) => OrchestratorError::from(g),
        }
    }
}

impl From<mf_fluids::FluidError> for OrchestratorError {
    fn from(e: mf_fluids::FluidError) -> Self {
        OrchestratorError::Configuration { what: e.to_string() }
    }
}

impl From<mf_sim::DropletError> for OrchestratorError {
    fn from(e: mf_sim::DropletError) -> Self {
        use mf_sim::DropletError as D;
        match e {
            D::InvalidArg { .. } | D::InvalidInjection { .. } => {
                OrchestratorError::Configuration { what: e.to_string() }
            }
            D::IterationLimit { .. } => OrchestratorError::RuntimeLimit { what: e.to_string() },
            D::Mna(m) => OrchestratorError::from(m),
            D::Fluid(f) => OrchestratorError::from(f),
        }
    }
}

impl From<mf_sim::MixingError> for OrchestratorError {
    fn from(e: mf_sim::MixingError) -> Self {
        use mf_sim::MixingError as Mx;
        match e {
            Mx::InvalidArg { .. } => OrchestratorError::Configuration { what: e.to_string() },
            Mx::NegativeInflow => OrchestratorError::Numerical { what: e.to_string() },
            Mx::Fluid(f) => OrchestratorError::from(f),
        }
    }
}

impl From<mf_sim::DiffusiveError> for OrchestratorError {
    fn from(e: mf_sim::DiffusiveError) -> Self {
        use mf_sim::DiffusiveError as Df;
        match e {
            Df::InvalidTopology { .. } => OrchestratorError::Topology { what: e.to_string() },
            Df::InvalidArg { .. } => OrchestratorError::Configuration { what: e.to_string() },
        }
    }
}

impl From<mf_sim::HybridError> for OrchestratorError {
    fn from(e: mf_sim::HybridError) -> Self {
        use mf_sim::HybridError as H;
        match e {
            H::MissingResistanceModel | H::UnknownModule(_) | H::NotBijective { .. } => {
                OrchestratorError::Configuration { what: e.to_string() }
            }
            H::Mna(m) => OrchestratorError::from(m),
        }
    }
}
