//! Topology validation.

use mf_core::GroupId;

use crate::error::{GraphError, GraphResult};
use crate::graph::{CfdModule, Channel, Node};

pub(crate) fn validate_structure(
    nodes: &[Node],
    channels: &[Channel],
    modules: &[CfdModule],
) -> GraphResult<()> {
    for ch in channels {
        if ch.node_a.index() as usize >= nodes.len() {
            return Err(GraphError::InvalidNodeRef {
                channel: ch.id,
                node: ch.node_a,
            });
        }
        if ch.node_b.index() as usize >= nodes.len() {
            return Err(GraphError::InvalidNodeRef {
                channel: ch.id,
                node: ch.node_b,
            });
        }
        if ch.width <= 0.0 || ch.height <= 0.0 || ch.length <= 0.0 {
            return Err(GraphError::InvalidGeometry {
                channel: ch.id,
                width: ch.width,
                height: ch.height,
                length: ch.length,
            });
        }
    }

    for m in modules {
        if m.openings.is_empty() {
            return Err(GraphError::EmptyModule { module: m.id });
        }
        for opening in &m.openings {
            if opening.node.index() as usize >= nodes.len() {
                return Err(GraphError::InvalidOpeningNode {
                    module: m.id,
                    node: opening.node,
                });
            }
        }
    }

    Ok(())
}

/// Every non-ground node must belong to exactly one group (spec.md invariant).
pub(crate) fn validate_groups(nodes: &[Node], node_group: &[GroupId]) -> GraphResult<()> {
    for node in nodes {
        if !node.ground && node_group.len() <= node.id.index() as usize {
            return Err(GraphError::UngroundedNode { node: node.id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChannelKind;
    use mf_core::{ChannelId, NodeId};

    #[test]
    fn rejects_invalid_node_ref() {
        let nodes = vec![Node {
            id: NodeId::from_index(0),
            position: (0.0, 0.0),
            ground: false,
            sink: false,
            pressure: 0.0,
        }];
        let channels = vec![Channel {
            id: ChannelId::from_index(0),
            node_a: NodeId::from_index(0),
            node_b: NodeId::from_index(99),
            height: 1e-4,
            width: 1e-4,
            length: 1e-2,
            kind: ChannelKind::Normal,
            resistance: 0.0,
            flow_rate: 0.0,
            pressure_drop: 0.0,
        }];
        assert!(validate_structure(&nodes, &channels, &[]).is_err());
    }

    #[test]
    fn rejects_non_positive_geometry() {
        let nodes = vec![
            Node {
                id: NodeId::from_index(0),
                position: (0.0, 0.0),
                ground: false,
                sink: false,
                pressure: 0.0,
            },
            Node {
                id: NodeId::from_index(1),
                position: (1.0, 0.0),
                ground: false,
                sink: false,
                pressure: 0.0,
            },
        ];
        let channels = vec![Channel {
            id: ChannelId::from_index(0),
            node_a: NodeId::from_index(0),
            node_b: NodeId::from_index(1),
            height: 0.0,
            width: 1e-4,
            length: 1e-2,
            kind: ChannelKind::Normal,
            resistance: 0.0,
            flow_rate: 0.0,
            pressure_drop: 0.0,
        }];
        assert!(validate_structure(&nodes, &channels, &[]).is_err());
    }
}
