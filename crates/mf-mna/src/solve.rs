//! High-level solve: assemble, factor via column-pivoted QR, write results
//! back into the graph, and bootstrap any newly-appeared floating group.

use mf_core::Real;
use mf_graph::Graph;
use nalgebra::linalg::ColPivQR;
use nalgebra::DVector;

use crate::error::{MnaError, MnaResult};
use crate::system::{assemble, ExtraConductance, ExtraConstraint, SystemLayout};

/// Outcome of one MNA solve: nothing beyond confirmation, since all
/// results are written directly into the graph's nodes, channels, and
/// pumps. Kept as a named type so callers (and tests) can match on it
/// without digging into the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveReport {
    pub free_node_count: usize,
    pub source_count: usize,
}

/// Runs one MNA solve against the graph's current resistances and pump
/// configuration, with no hybrid extension terms.
pub fn solve(graph: &mut Graph) -> MnaResult<SolveReport> {
    solve_hybrid(graph, &[], &[])
}

/// Runs one MNA solve with hybrid-mode extension terms: extra internal
/// module conductances (uninitialized CFD modules) and extra opening
/// constraints (initialized CFD modules).
pub fn solve_hybrid(
    graph: &mut Graph,
    extra_conductances: &[ExtraConductance],
    extra_constraints: &[ExtraConstraint],
) -> MnaResult<SolveReport> {
    let (a, z, layout) = assemble(graph, extra_conductances, extra_constraints);

    let x = if a.nrows() == 0 {
        DVector::zeros(0)
    } else {
        let qr = ColPivQR::new(a);
        qr.solve(&z).ok_or(MnaError::RankDeficient)?
    };

    write_back(graph, &x, &layout);
    bootstrap_groups(graph);

    Ok(SolveReport {
        free_node_count: layout.node_count(),
        source_count: layout.source_count(),
    })
}

fn write_back(graph: &mut Graph, x: &DVector<Real>, layout: &SystemLayout) {
    let node_ids: Vec<_> = graph.nodes().iter().map(|n| n.id).collect();
    for id in node_ids {
        let pressure = if graph.node(id).map(|n| n.ground).unwrap_or(false) {
            0.0
        } else {
            layout.row_of_node(id).map(|row| x[row]).unwrap_or(0.0)
        };
        if let Some(node) = graph.node_mut(id) {
            node.pressure = pressure;
        }
    }

    let pump_ids: Vec<_> = graph.pumps().iter().map(|p| p.id).collect();
    for id in pump_ids {
        if let Some(row) = layout.row_of_pump(id) {
            let dual = x[row];
            if let Some(pump) = graph.pump_mut(id) {
                pump.solved_dual = dual;
            }
        }
    }

    let channel_ids: Vec<_> = graph.channels().iter().map(|c| c.id).collect();
    for id in channel_ids {
        let Some(channel) = graph.channel(id) else {
            continue;
        };
        let pa = graph.node(channel.node_a).map(|n| n.pressure).unwrap_or(0.0);
        let pb = graph.node(channel.node_b).map(|n| n.pressure).unwrap_or(0.0);
        let drop = pa - pb;
        let flow = drop / graph.channel(id).unwrap().resistance;
        if let Some(channel) = graph.channel_mut(id) {
            channel.pressure_drop = drop;
            channel.flow_rate = flow;
        }
    }
}

/// On the first solve after a new (floating, uninitialized) group appears,
/// pin its reference node at the member with the lowest solved pressure.
fn bootstrap_groups(graph: &mut Graph) {
    let group_ids: Vec<_> = graph.groups().iter().map(|g| g.id).collect();
    for gid in group_ids {
        let Some(group) = graph.group(gid) else {
            continue;
        };
        if group.grounded || group.initialized {
            continue;
        }
        let lowest = group
            .nodes
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let pa = graph.node(a).map(|n| n.pressure).unwrap_or(Real::INFINITY);
                let pb = graph.node(b).map(|n| n.pressure).unwrap_or(Real::INFINITY);
                pa.partial_cmp(&pb).unwrap()
            });
        if let (Some(lowest), Some(group)) = (lowest, graph.group_mut(gid)) {
            group.reference_node = Some(lowest);
            group.initialized = true;
        }
    }
}
