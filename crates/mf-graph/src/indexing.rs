//! Stable indexing for solver integration.
//!
//! Bidirectional mappings between domain ids and contiguous solver
//! indices. Node/channel/pump ids are already contiguous by construction
//! (the builder hands out indices 0..N), so this is mostly a thin,
//! explicit API boundary for `mf-mna` rather than a real remapping.

use mf_core::{ChannelId, NodeId, PumpId};

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct IndexMap {
    node_ids: Vec<NodeId>,
    channel_ids: Vec<ChannelId>,
    pump_ids: Vec<PumpId>,
}

impl IndexMap {
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            node_ids: graph.nodes().iter().map(|n| n.id).collect(),
            channel_ids: graph.channels().iter().map(|c| c.id).collect(),
            pump_ids: graph.pumps().iter().map(|p| p.id).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }
    pub fn channel_count(&self) -> usize {
        self.channel_ids.len()
    }
    pub fn pump_count(&self) -> usize {
        self.pump_ids.len()
    }

    pub fn node_idx(&self, id: NodeId) -> GraphResult<usize> {
        let idx = id.index() as usize;
        if idx < self.node_ids.len() {
            Ok(idx)
        } else {
            Err(GraphError::IdNotFound { what: "NodeId" })
        }
    }

    pub fn channel_idx(&self, id: ChannelId) -> GraphResult<usize> {
        let idx = id.index() as usize;
        if idx < self.channel_ids.len() {
            Ok(idx)
        } else {
            Err(GraphError::IdNotFound { what: "ChannelId" })
        }
    }

    pub fn pump_idx(&self, id: PumpId) -> GraphResult<usize> {
        let idx = id.index() as usize;
        if idx < self.pump_ids.len() {
            Ok(idx)
        } else {
            Err(GraphError::IdNotFound { what: "PumpId" })
        }
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }
    pub fn channel_ids(&self) -> &[ChannelId] {
        &self.channel_ids
    }
    pub fn pump_ids(&self) -> &[PumpId] {
        &self.pump_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::ChannelKind;
    use mf_core::NodeId;

    #[test]
    fn index_map_round_trip() {
        let mut b = GraphBuilder::new();
        let n1 = b.add_node((0.0, 0.0), true, false);
        let n2 = b.add_node((1.0, 0.0), false, false);
        b.add_channel(n1, n2, 1e-4, 1e-4, Some(1.0), ChannelKind::Normal);
        let g = b.build().unwrap();
        let idx = IndexMap::from_graph(&g);
        assert_eq!(idx.node_idx(n1).unwrap(), 0);
        assert_eq!(idx.node_idx(n2).unwrap(), 1);
        assert!(idx.node_idx(NodeId::from_index(99)).is_err());
    }
}
