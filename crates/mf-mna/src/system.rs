//! Matrix assembly: builds the partitioned MNA system `A*x = z` from a
//! graph's current topology, resistances, and pump/group sources.

use std::collections::HashMap;

use mf_core::{NodeId, PumpId, Real};
use mf_graph::{Graph, PumpKind};
use nalgebra::{DMatrix, DVector};

/// An extra conductance edge contributed to `G` by a hybrid CFD module's
/// internal, fully-connected wiring before it has been solved once.
#[derive(Debug, Clone, Copy)]
pub struct ExtraConductance {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub conductance: Real,
}

/// An extra source contributed by an initialized hybrid CFD module's
/// opening: either a pinned pressure (group-ground opening) or an
/// exogenous flow injection (every other opening).
#[derive(Debug, Clone, Copy)]
pub enum ExtraConstraint {
    Pressure { node: NodeId, value: Real },
    FlowInjection { node: NodeId, value: Real },
}

/// Maps graph nodes/pumps to rows and columns of the assembled system.
#[derive(Debug, Clone)]
pub struct SystemLayout {
    /// Row/column index of each non-ground node, in `0..n`.
    node_row: HashMap<NodeId, usize>,
    /// Row/column index (offset by `n`) of each pressure-pump source.
    pump_row: HashMap<PumpId, usize>,
    /// Row/column index (offset by `n`) of each floating group's
    /// reference-pinning source, keyed by the group's reference node.
    group_ref_row: HashMap<NodeId, usize>,
    n: usize,
    p: usize,
}

impl SystemLayout {
    pub fn node_count(&self) -> usize {
        self.n
    }
    pub fn source_count(&self) -> usize {
        self.p
    }
    pub fn row_of_node(&self, node: NodeId) -> Option<usize> {
        self.node_row.get(&node).copied()
    }
    pub fn row_of_pump(&self, pump: PumpId) -> Option<usize> {
        self.pump_row.get(&pump).map(|r| self.n + r)
    }
}

/// Assembles `A`, `z`, and the layout from the graph's current state, plus
/// any hybrid-mode extra terms. Pure; does not mutate the graph.
pub fn assemble(
    graph: &Graph,
    extra_conductances: &[ExtraConductance],
    extra_constraints: &[ExtraConstraint],
) -> (DMatrix<Real>, DVector<Real>, SystemLayout) {
    let mut node_row = HashMap::new();
    for node in graph.nodes() {
        if !node.ground {
            let idx = node_row.len();
            node_row.insert(node.id, idx);
        }
    }
    let n = node_row.len();

    let mut pump_row = HashMap::new();
    for pump in graph.pumps() {
        if let PumpKind::Pressure(_) = pump.kind {
            let idx = pump_row.len();
            pump_row.insert(pump.id, idx);
        }
    }

    let mut group_ref_row = HashMap::new();
    for group in graph.groups() {
        if !group.grounded {
            if let Some(reference) = group.reference_node {
                let idx = pump_row.len() + group_ref_row.len();
                group_ref_row.insert(reference, idx);
            }
        }
    }

    let pressure_pins: Vec<(NodeId, Real)> = extra_constraints
        .iter()
        .filter_map(|c| match *c {
            ExtraConstraint::Pressure { node, value } => Some((node, value)),
            ExtraConstraint::FlowInjection { .. } => None,
        })
        .collect();
    let p = pump_row.len() + group_ref_row.len() + pressure_pins.len();

    let mut a = DMatrix::<Real>::zeros(n + p, n + p);
    let mut z = DVector::<Real>::zeros(n + p);

    for channel in graph.channels() {
        let g = 1.0 / channel.resistance;
        stamp_conductance(&mut a, &node_row, channel.node_a, channel.node_b, g);
    }
    for extra in extra_conductances {
        stamp_conductance(&mut a, &node_row, extra.node_a, extra.node_b, extra.conductance);
    }

    for pump in graph.pumps() {
        match pump.kind {
            PumpKind::Pressure(value) => {
                let k = pump_row[&pump.id];
                stamp_pressure_source(&mut a, &mut z, &node_row, n, pump.node_a, pump.node_b, k, value);
            }
            PumpKind::FlowRate(value) => {
                if let Some(&row) = node_row.get(&pump.node_a) {
                    z[row] -= value;
                }
                if let Some(&row) = node_row.get(&pump.node_b) {
                    z[row] += value;
                }
            }
        }
    }

    for group in graph.groups() {
        if group.grounded {
            continue;
        }
        let Some(reference) = group.reference_node else {
            continue;
        };
        let Some(&k) = group_ref_row.get(&reference) else {
            continue;
        };
        let e = if group.initialized {
            graph.node(reference).map(|n| n.pressure).unwrap_or(0.0)
        } else {
            0.0
        };
        if let Some(&row) = node_row.get(&reference) {
            a[(row, n + k)] += 1.0;
            a[(n + k, row)] += 1.0;
        }
        z[n + k] = e;
    }

    for constraint in extra_constraints {
        if let ExtraConstraint::FlowInjection { node, value } = *constraint {
            if let Some(&row) = node_row.get(&node) {
                z[row] += value;
            }
        }
    }
    for (k, &(node, value)) in pressure_pins.iter().enumerate() {
        let row = n + pump_row.len() + group_ref_row.len() + k;
        if let Some(&nr) = node_row.get(&node) {
            a[(nr, row)] += 1.0;
            a[(row, nr)] += 1.0;
        }
        z[row] = value;
    }

    let layout = SystemLayout {
        node_row,
        pump_row,
        group_ref_row,
        n,
        p,
    };
    (a, z, layout)
}

fn stamp_conductance(
    a: &mut DMatrix<Real>,
    node_row: &HashMap<NodeId, usize>,
    node_a: NodeId,
    node_b: NodeId,
    g: Real,
) {
    let ra = node_row.get(&node_a).copied();
    let rb = node_row.get(&node_b).copied();
    if let Some(ra) = ra {
        a[(ra, ra)] += g;
    }
    if let Some(rb) = rb {
        a[(rb, rb)] += g;
    }
    if let (Some(ra), Some(rb)) = (ra, rb) {
        a[(ra, rb)] -= g;
        a[(rb, ra)] -= g;
    }
}

#[allow(clippy::too_many_arguments)]
fn stamp_pressure_source(
    a: &mut DMatrix<Real>,
    z: &mut DVector<Real>,
    node_row: &HashMap<NodeId, usize>,
    n: usize,
    node_a: NodeId,
    node_b: NodeId,
    k: usize,
    value: Real,
) {
    if let Some(&ra) = node_row.get(&node_a) {
        a[(ra, n + k)] -= 1.0;
        a[(n + k, ra)] -= 1.0;
    }
    if let Some(&rb) = node_row.get(&node_b) {
        a[(rb, n + k)] += 1.0;
        a[(n + k, rb)] += 1.0;
    }
    z[n + k] = value;
}
