//! Network topology errors.

use mf_core::{ChannelId, ModuleId, NodeId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("channel {channel} references non-existent node {node}")]
    InvalidNodeRef { channel: ChannelId, node: NodeId },

    #[error("opening in module {module} references non-existent node {node}")]
    InvalidOpeningNode { module: ModuleId, node: NodeId },

    #[error("channel {channel} has non-positive geometry (w={width}, h={height}, L={length})")]
    InvalidGeometry {
        channel: ChannelId,
        width: f64,
        height: f64,
        length: f64,
    },

    #[error("node {node} does not belong to any group")]
    UngroundedNode { node: NodeId },

    #[error("node {node} belongs to more than one group")]
    DuplicateGroupMembership { node: NodeId },

    #[error("id not found in index map: {what}")]
    IdNotFound { what: &'static str },

    #[error("module {module} has no openings")]
    EmptyModule { module: ModuleId },
}
