//! Incremental network builder.

use mf_core::{ChannelId, GroupId, ModuleId, NodeId, PumpId, Real};

use crate::error::GraphResult;
use crate::graph::{
    CfdModule, Channel, ChannelKind, Graph, Group, Incidence, Node, Opening, Pump, PumpKind,
};
use crate::validate;

/// Builder for constructing a [`Graph`] incrementally. Call [`build`] once
/// topology is complete to validate it and compute connectivity groups.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    channels: Vec<Channel>,
    pumps: Vec<Pump>,
    modules: Vec<CfdModule>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, position: (Real, Real), ground: bool, sink: bool) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            position,
            ground,
            sink,
            pressure: 0.0,
        });
        id
    }

    /// Add a rectangular channel. If `length` is `None`, it is derived
    /// from the straight-line distance between the endpoint positions.
    pub fn add_channel(
        &mut self,
        node_a: NodeId,
        node_b: NodeId,
        height: Real,
        width: Real,
        length: Option<Real>,
        kind: ChannelKind,
    ) -> ChannelId {
        let id = ChannelId::from_index(self.channels.len() as u32);
        let length = length.unwrap_or_else(|| self.euclidean_distance(node_a, node_b));
        self.channels.push(Channel {
            id,
            node_a,
            node_b,
            height,
            width,
            length,
            kind,
            resistance: 0.0,
            flow_rate: 0.0,
            pressure_drop: 0.0,
        });
        id
    }

    fn euclidean_distance(&self, a: NodeId, b: NodeId) -> Real {
        let pa = self
            .nodes
            .get(a.index() as usize)
            .map(|n| n.position)
            .unwrap_or((0.0, 0.0));
        let pb = self
            .nodes
            .get(b.index() as usize)
            .map(|n| n.position)
            .unwrap_or((0.0, 0.0));
        ((pb.0 - pa.0).powi(2) + (pb.1 - pa.1).powi(2)).sqrt()
    }

    pub fn add_pressure_pump(&mut self, node_a: NodeId, node_b: NodeId, pressure: Real) -> PumpId {
        self.add_pump(node_a, node_b, PumpKind::Pressure(pressure))
    }

    pub fn add_flow_rate_pump(&mut self, node_a: NodeId, node_b: NodeId, flow_rate: Real) -> PumpId {
        self.add_pump(node_a, node_b, PumpKind::FlowRate(flow_rate))
    }

    fn add_pump(&mut self, node_a: NodeId, node_b: NodeId, kind: PumpKind) -> PumpId {
        let id = PumpId::from_index(self.pumps.len() as u32);
        self.pumps.push(Pump {
            id,
            node_a,
            node_b,
            kind,
            solved_dual: 0.0,
        });
        id
    }

    /// Add a CFD module. Openings are attached afterward with
    /// [`GraphBuilder::add_opening`].
    pub fn add_module(
        &mut self,
        boundary_nodes: Vec<NodeId>,
        rect_min: (Real, Real),
        rect_max: (Real, Real),
    ) -> ModuleId {
        let id = ModuleId::from_index(self.modules.len() as u32);
        self.modules.push(CfdModule {
            id,
            boundary_nodes,
            openings: Vec::new(),
            rect_min,
            rect_max,
        });
        id
    }

    pub fn add_opening(
        &mut self,
        module: ModuleId,
        node: NodeId,
        normal: (Real, Real),
        width: Real,
    ) {
        if let Some(m) = self.modules.get_mut(module.index() as usize) {
            m.openings.push(Opening::new(node, normal, width));
        }
    }

    /// Validate the topology, compute connectivity groups, and freeze into
    /// an immutable [`Graph`].
    pub fn build(self) -> GraphResult<Graph> {
        validate::validate_structure(&self.nodes, &self.channels, &self.modules)?;

        let n = self.nodes.len();
        let mut node_channels: Vec<Vec<Incidence>> = vec![Vec::new(); n];
        let mut node_pumps: Vec<Vec<PumpId>> = vec![Vec::new(); n];

        for ch in &self.channels {
            node_channels[ch.node_a.index() as usize].push(Incidence {
                channel: ch.id,
                is_source_end: true,
            });
            node_channels[ch.node_b.index() as usize].push(Incidence {
                channel: ch.id,
                is_source_end: false,
            });
        }
        for pump in &self.pumps {
            node_pumps[pump.node_a.index() as usize].push(pump.id);
            node_pumps[pump.node_b.index() as usize].push(pump.id);
        }

        let (groups, node_group) = compute_groups(&self.nodes, &self.channels, &self.pumps);

        validate::validate_groups(&self.nodes, &node_group)?;

        Ok(Graph {
            nodes: self.nodes,
            channels: self.channels,
            pumps: self.pumps,
            modules: self.modules,
            groups,
            node_channels,
            node_pumps,
            node_group,
        })
    }
}

/// Union-find over nodes connected by channels or pumps, then turn each
/// component into a [`Group`]. A component containing a ground node is
/// already "grounded" and "initialized" with that node as its reference;
/// a floating component is left uninitialized for the MNA solver to
/// bootstrap.
fn compute_groups(nodes: &[Node], channels: &[Channel], pumps: &[Pump]) -> (Vec<Group>, Vec<GroupId>) {
    let n = nodes.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }
    fn union(parent: &mut [usize], a: usize, b: usize) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            parent[ra] = rb;
        }
    }

    for ch in channels {
        union(&mut parent, ch.node_a.index() as usize, ch.node_b.index() as usize);
    }
    for pump in pumps {
        union(&mut parent, pump.node_a.index() as usize, pump.node_b.index() as usize);
    }

    let mut root_to_group: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut node_group: Vec<GroupId> = Vec::with_capacity(n);

    for i in 0..n {
        let root = find(&mut parent, i);
        let group_idx = *root_to_group.entry(root).or_insert_with(|| {
            let idx = groups.len();
            groups.push(Group {
                id: GroupId::from_index(idx as u32),
                nodes: Vec::new(),
                channels: Vec::new(),
                reference_node: None,
                initialized: false,
                grounded: false,
            });
            idx
        });
        groups[group_idx].nodes.push(nodes[i].id);
        node_group.push(GroupId::from_index(group_idx as u32));

        if nodes[i].ground {
            groups[group_idx].grounded = true;
            groups[group_idx].reference_node = Some(nodes[i].id);
            groups[group_idx].initialized = true;
        } else if !groups[group_idx].grounded && groups[group_idx].reference_node.is_none() {
            // Provisional pin for a floating group, used by the first MNA
            // solve only; the solver promotes it to the lowest-pressure
            // member once that solve completes (spec: group bootstrapping).
            groups[group_idx].reference_node = Some(nodes[i].id);
        }
    }

    for ch in channels {
        let g = node_group[ch.node_a.index() as usize].index() as usize;
        groups[g].channels.push(ch.id);
    }

    (groups, node_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut b = GraphBuilder::new();
        let n1 = b.add_node((0.0, 0.0), true, false);
        let n2 = b.add_node((1.0, 0.0), false, false);
        b.add_channel(n1, n2, 1e-4, 1e-4, Some(1.0), ChannelKind::Normal);
        let g = b.build().unwrap();
        assert_eq!(g.nodes().len(), 2);
        assert_eq!(g.channels().len(), 1);
        assert_eq!(g.groups().len(), 1);
        assert!(g.groups()[0].grounded);
    }

    #[test]
    fn derived_channel_length() {
        let mut b = GraphBuilder::new();
        let n1 = b.add_node((0.0, 0.0), true, false);
        let n2 = b.add_node((3.0, 4.0), false, false);
        let c = b.add_channel(n1, n2, 1e-4, 1e-4, None, ChannelKind::Normal);
        let g = b.build().unwrap();
        assert!((g.channel(c).unwrap().length - 5.0).abs() < 1e-12);
    }

    #[test]
    fn floating_group_uninitialized() {
        let mut b = GraphBuilder::new();
        let n1 = b.add_node((0.0, 0.0), false, false);
        let n2 = b.add_node((1.0, 0.0), false, false);
        b.add_channel(n1, n2, 1e-4, 1e-4, Some(1.0), ChannelKind::Normal);
        let g = b.build().unwrap();
        assert_eq!(g.groups().len(), 1);
        assert!(!g.groups()[0].initialized);
        assert!(g.groups()[0].reference_node.is_some());
    }

    #[test]
    fn disjoint_components_are_separate_groups() {
        let mut b = GraphBuilder::new();
        let a1 = b.add_node((0.0, 0.0), true, false);
        let a2 = b.add_node((1.0, 0.0), false, false);
        b.add_channel(a1, a2, 1e-4, 1e-4, Some(1.0), ChannelKind::Normal);
        let b1 = b.add_node((10.0, 0.0), true, false);
        let b2 = b.add_node((11.0, 0.0), false, false);
        b.add_channel(b1, b2, 1e-4, 1e-4, Some(1.0), ChannelKind::Normal);
        let g = b.build().unwrap();
        assert_eq!(g.groups().len(), 2);
        assert_ne!(g.group_of(a1), g.group_of(b1));
    }
}
