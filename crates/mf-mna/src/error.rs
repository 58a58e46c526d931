//! Error types for MNA solving.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MnaError {
    #[error("network has no ground or group reference: rank-deficient system")]
    RankDeficient,

    #[error("node {0:?} referenced by the system is not present in the graph")]
    UnknownNode(mf_core::NodeId),

    #[error("pump {0:?} referenced by the system is not present in the graph")]
    UnknownPump(mf_core::PumpId),

    #[error("graph error: {0}")]
    Graph(#[from] mf_graph::GraphError),
}

pub type MnaResult<T> = Result<T, MnaError>;
