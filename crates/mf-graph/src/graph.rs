//! Core network data structures: the immutable-topology graph of nodes,
//! channels, pumps, CFD modules, and connectivity groups.

use mf_core::{ChannelId, GroupId, ModuleId, NodeId, PumpId, Real};

/// Kind of a rectangular channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Normal,
    Bypass,
    Cloggable,
}

/// A point in the plane; lives for the whole simulation. Pressure is
/// rewritten on every MNA solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: (Real, Real),
    pub ground: bool,
    pub sink: bool,
    pub pressure: Real,
}

/// A directed rectangular channel from `node_a` to `node_b`. Geometry is
/// immutable; `resistance`/`flow_rate`/`pressure_drop` are rewritten per
/// solve. Positive `flow_rate` means flow from `node_a` to `node_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub height: Real,
    pub width: Real,
    pub length: Real,
    pub kind: ChannelKind,
    pub resistance: Real,
    pub flow_rate: Real,
    pub pressure_drop: Real,
}

impl Channel {
    pub fn volume(&self) -> Real {
        self.width * self.height * self.length
    }

    pub fn other_end(&self, from: NodeId) -> Option<NodeId> {
        if from == self.node_a {
            Some(self.node_b)
        } else if from == self.node_b {
            Some(self.node_a)
        } else {
            None
        }
    }
}

/// The boundary condition carried by a pump: a fixed pressure (and the
/// flow rate reported after solving) or a fixed flow rate (and the
/// pressure drop reported after solving).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PumpKind {
    Pressure(Real),
    FlowRate(Real),
}

/// A directed source edge between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Pump {
    pub id: PumpId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub kind: PumpKind,
    /// The dual quantity, filled in after a solve (flow rate for a
    /// pressure pump, pressure drop for a flow-rate pump).
    pub solved_dual: Real,
}

/// A boundary cell of a CFD module connecting to the 1-D network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opening {
    pub node: NodeId,
    pub normal: (Real, Real),
    pub width: Real,
    /// Radial angle of the outward normal, in `[0, 2*pi)`.
    pub radial_angle: Real,
}

impl Opening {
    pub fn new(node: NodeId, normal: (Real, Real), width: Real) -> Self {
        let radial_angle = normalize_angle(normal.1.atan2(normal.0));
        Self {
            node,
            normal,
            width,
            radial_angle,
        }
    }
}

pub fn normalize_angle(theta: Real) -> Real {
    let two_pi = std::f64::consts::TAU;
    let mut a = theta % two_pi;
    if a < 0.0 {
        a += two_pi;
    }
    a
}

/// An axis-aligned rectangle embedded in the network, replaced by a 2-D
/// LBM domain in hybrid mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CfdModule {
    pub id: ModuleId,
    pub boundary_nodes: Vec<NodeId>,
    pub openings: Vec<Opening>,
    pub rect_min: (Real, Real),
    pub rect_max: (Real, Real),
}

impl CfdModule {
    pub fn opening_for(&self, node: NodeId) -> Option<&Opening> {
        self.openings.iter().find(|o| o.node == node)
    }
}

/// A maximal connected subgraph pinned by one reference pressure.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub nodes: Vec<NodeId>,
    pub channels: Vec<ChannelId>,
    pub reference_node: Option<NodeId>,
    pub initialized: bool,
    pub grounded: bool,
}

/// A point along a channel, shared by injections and droplet boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelPosition {
    pub channel: ChannelId,
    pub position: Real,
}

/// Which channels (and in which direction) touch a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incidence {
    pub channel: ChannelId,
    /// True if this node is the channel's `node_a` (so positive flow
    /// leaves the node through this channel).
    pub is_source_end: bool,
}

/// The validated, frozen network topology.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) channels: Vec<Channel>,
    pub(crate) pumps: Vec<Pump>,
    pub(crate) modules: Vec<CfdModule>,
    pub(crate) groups: Vec<Group>,

    /// node index -> channel incidences (insertion order of channels).
    pub(crate) node_channels: Vec<Vec<Incidence>>,
    /// node index -> pump ids touching it.
    pub(crate) node_pumps: Vec<Vec<PumpId>>,
    /// node id -> group id, for every node.
    pub(crate) node_group: Vec<GroupId>,
}

impl Graph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }
    pub fn pumps(&self) -> &[Pump] {
        &self.pumps
    }
    pub fn modules(&self) -> &[CfdModule] {
        &self.modules
    }
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index() as usize)
    }
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index() as usize)
    }
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.index() as usize)
    }
    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.index() as usize)
    }
    pub fn pump(&self, id: PumpId) -> Option<&Pump> {
        self.pumps.get(id.index() as usize)
    }
    pub fn pump_mut(&mut self, id: PumpId) -> Option<&mut Pump> {
        self.pumps.get_mut(id.index() as usize)
    }
    pub fn module(&self, id: ModuleId) -> Option<&CfdModule> {
        self.modules.get(id.index() as usize)
    }
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.index() as usize)
    }
    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id.index() as usize)
    }

    /// Channel incidences for a node, in insertion order.
    pub fn node_channels(&self, node: NodeId) -> &[Incidence] {
        &self.node_channels[node.index() as usize]
    }

    pub fn node_pumps(&self, node: NodeId) -> &[PumpId] {
        &self.node_pumps[node.index() as usize]
    }

    pub fn group_of(&self, node: NodeId) -> GroupId {
        self.node_group[node.index() as usize]
    }

    /// Node ids, ordered by incident angle as seen from `at`, ascending.
    /// Used by the diffusive-mixing topology analyzer.
    pub fn channels_by_radial_angle(&self, at: NodeId) -> Vec<(Incidence, Real)> {
        let here = self.node(at).expect("valid node").position;
        let mut items: Vec<(Incidence, Real)> = self
            .node_channels(at)
            .iter()
            .map(|inc| {
                let ch = self.channel(inc.channel).expect("valid channel");
                let other = ch.other_end(at).expect("incident channel touches node");
                let there = self.node(other).expect("valid node").position;
                let angle =
                    normalize_angle((there.1 - here.1).atan2(there.0 - here.0));
                (*inc, angle)
            })
            .collect();
        items.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_radial_angle_matches_normal() {
        let o = Opening::new(NodeId::from_index(0), (0.0, 1.0), 1e-4);
        assert!((o.radial_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn normalize_angle_wraps_negative() {
        let a = normalize_angle(-std::f64::consts::FRAC_PI_2);
        assert!((a - (std::f64::consts::TAU - std::f64::consts::FRAC_PI_2)).abs() < 1e-12);
    }

    #[test]
    fn channel_volume_and_other_end() {
        let ch = Channel {
            id: ChannelId::from_index(0),
            node_a: NodeId::from_index(0),
            node_b: NodeId::from_index(1),
            height: 1e-4,
            width: 2e-4,
            length: 1e-2,
            kind: ChannelKind::Normal,
            resistance: 0.0,
            flow_rate: 0.0,
            pressure_drop: 0.0,
        };
        assert!((ch.volume() - 1e-4 * 2e-4 * 1e-2).abs() < 1e-20);
        assert_eq!(ch.other_end(NodeId::from_index(0)), Some(NodeId::from_index(1)));
        assert_eq!(ch.other_end(NodeId::from_index(1)), Some(NodeId::from_index(0)));
        assert_eq!(ch.other_end(NodeId::from_index(2)), None);
    }
}
