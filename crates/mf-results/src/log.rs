//! The in-memory result log: an append-only history of saved states plus
//! a standing archive of every mixture ever created.

use mf_core::Real;
use mf_fluids::Mixture;
use mf_graph::Graph;

use crate::types::{ModeSnapshot, SavedState};

/// Time-indexed simulation states and the full mixture archive, per
/// spec.md section 6. No file or JSON writer lives here: the caller owns
/// serialization, this type just holds plain, cloneable data.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    states: Vec<SavedState>,
    mixture_archive: Vec<Mixture>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            mixture_archive: Vec::new(),
        }
    }

    /// Snapshot the network's current node pressures and channel flow
    /// rates at `time`, paired with the active simulator's mode-specific
    /// state, and append it to the log.
    pub fn record(&mut self, graph: &Graph, time: Real, mode: ModeSnapshot) {
        let node_pressures = graph.nodes().iter().map(|n| (n.id, n.pressure)).collect();
        let edge_flow_rates = graph.channels().iter().map(|c| (c.id, c.flow_rate)).collect();
        self.states.push(SavedState {
            time,
            node_pressures,
            edge_flow_rates,
            mode,
        });
    }

    /// Archive a mixture the instant it is created, independent of
    /// whether any saved state still references it.
    pub fn archive_mixture(&mut self, mixture: Mixture) {
        self.mixture_archive.push(mixture);
    }

    pub fn states(&self) -> &[SavedState] {
        &self.states
    }

    pub fn last(&self) -> Option<&SavedState> {
        self.states.last()
    }

    pub fn mixture_archive(&self) -> &[Mixture] {
        &self.mixture_archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use mf_core::{MixtureId, SpecieId};
    use mf_graph::{ChannelKind, GraphBuilder};

    fn simple_graph() -> Graph {
        let mut b = GraphBuilder::new();
        let a = b.add_node((0.0, 0.0), true, false);
        let c = b.add_node((1.0, 0.0), false, false);
        b.add_channel(a, c, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        b.build().unwrap()
    }

    #[test]
    fn record_captures_current_network_state() {
        let mut graph = simple_graph();
        graph.node_mut(graph.nodes()[1].id).unwrap().pressure = 42.0;
        let mut log = ResultLog::new();
        log.record(&graph, 0.0, ModeSnapshot::Droplet(HashMap::new()));
        assert_eq!(log.states().len(), 1);
        let saved = log.last().unwrap();
        assert_eq!(saved.node_pressures[&graph.nodes()[1].id], 42.0);
    }

    #[test]
    fn mixture_archive_accumulates_across_states() {
        let mut log = ResultLog::new();
        let mut conc = HashMap::new();
        conc.insert(SpecieId::from_index(0), 1.0);
        log.archive_mixture(Mixture::new(MixtureId::from_index(0), conc.clone()));
        log.archive_mixture(Mixture::new(MixtureId::from_index(1), conc));
        assert_eq!(log.mixture_archive().len(), 2);
    }

    #[test]
    fn states_preserved_up_to_an_aborted_run() {
        let graph = simple_graph();
        let mut log = ResultLog::new();
        for i in 0..3 {
            log.record(&graph, i as Real, ModeSnapshot::Mixing(HashMap::new()));
        }
        // A caller that aborts mid-run (spec.md section 7: numerical errors
        // abort with full state preserved up to the last saved snapshot)
        // still has every prior snapshot available.
        assert_eq!(log.states().len(), 3);
        assert_eq!(log.last().unwrap().time, 2.0);
    }
}
