//! Simulation Orchestrator (spec section 5): owns the network as a shared
//! mutable workspace and drives whichever simulator is active, recording
//! each step into the result log. Single-threaded, cooperative,
//! event-at-a-time — no internal task spawning.

use std::collections::{HashMap, VecDeque};

use mf_core::Real;
use mf_graph::Graph;
use mf_mna::solve;
use mf_resistance::ResistanceModel;
use mf_results::{DropletRecord, ModeSnapshot, MixturePosition, ResultLog};
use mf_sim::{CfdSimulator, DropletSimulator, HybridCoupler, MixingSimulator, RelaxationScheme};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Owns the network for the duration of one simulation run. Simulators
/// borrow it rather than owning their own copy, per spec section 9's
/// "non-owning index or handle" guidance.
pub struct Orchestrator {
    graph: Graph,
    viscosity: Real,
}

impl Orchestrator {
    pub fn new(graph: Graph, viscosity: Real) -> Self {
        Self { graph, viscosity }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn viscosity(&self) -> Real {
        self.viscosity
    }

    fn apply_resistances(&mut self, model: &dyn ResistanceModel) -> OrchestratorResult<()> {
        let channel_ids: Vec<_> = self.graph.channels().iter().map(|c| c.id).collect();
        for id in channel_ids {
            let Some(ch) = self.graph.channel(id) else { continue };
            let resistance = model.resistance(ch.width, ch.height, ch.length, self.viscosity)?;
            if let Some(ch) = self.graph.channel_mut(id) {
                ch.resistance = resistance;
            }
        }
        Ok(())
    }

    fn snapshot(&self, time: Real, mode: ModeSnapshot, log: &mut ResultLog) {
        log.record(&self.graph, time, mode);
    }

    /// Mode (a): steady continuous single-phase flow. One MNA solve,
    /// recorded as a single snapshot at `time`.
    pub fn run_continuous(
        &mut self,
        model: &dyn ResistanceModel,
        time: Real,
        log: &mut ResultLog,
    ) -> OrchestratorResult<()> {
        self.apply_resistances(model)?;
        solve(&mut self.graph)?;
        self.snapshot(time, ModeSnapshot::Continuous, log);
        Ok(())
    }

    /// Mode (b): transient immiscible-droplet flow. Steps the droplet
    /// simulator one admissible event at a time, recording a snapshot
    /// after each event so a numerical failure mid-run leaves every prior
    /// state intact in `log` (spec section 7 propagation rule).
    pub fn run_droplet(
        &mut self,
        sim: &mut DropletSimulator,
        model: &dyn ResistanceModel,
        log: &mut ResultLog,
    ) -> OrchestratorResult<()> {
        loop {
            let continued = sim.step(&mut self.graph, model, self.viscosity).map_err(|e| {
                if let mf_sim::DropletError::IterationLimit { limit } = &e {
                    tracing::warn!(limit = *limit, "droplet run hit its iteration cap before settling");
                }
                OrchestratorError::from(e)
            })?;
            let boundaries_by_droplet = |droplet_id| {
                sim.boundaries().iter().filter(move |b| b.droplet == droplet_id).cloned().collect()
            };
            let droplets = sim
                .droplets()
                .iter()
                .map(|d| {
                    (
                        d.id,
                        DropletRecord {
                            boundaries: boundaries_by_droplet(d.id),
                            fully_occupied_channel_ids: d.fully_occupied.clone(),
                        },
                    )
                })
                .collect();
            self.snapshot(sim.clock(), ModeSnapshot::Droplet(droplets), log);
            if !continued {
                tracing::debug!(time = sim.clock(), "droplet run settled, no admissible event remains");
                return Ok(());
            }
        }
    }

    /// Mode (c): transient passive-scalar mixing. Steps the mixing
    /// simulator one `dt`-driven advance at a time, recording the front
    /// positions of every channel after each step.
    pub fn run_mixing(&mut self, sim: &mut MixingSimulator, log: &mut ResultLog) -> OrchestratorResult<()> {
        loop {
            let continued = sim.step(&self.graph)?;
            let fronts: HashMap<_, VecDeque<MixturePosition>> = sim
                .front_positions()
                .into_iter()
                .map(|(channel, positions)| {
                    let deque = positions
                        .into_iter()
                        .map(|(mixture, position)| MixturePosition { mixture, position })
                        .collect();
                    (channel, deque)
                })
                .collect();
            self.snapshot(sim.clock(), ModeSnapshot::Mixing(fronts), log);
            if !continued {
                return Ok(());
            }
        }
    }

    /// Mode (d): hybrid Abstract-CFD coupling. Runs the outer relaxation
    /// loop to convergence (or the iteration cap) and records one final
    /// snapshot; the loop itself is a single converged steady state rather
    /// than a time series, so no intermediate recording is meaningful.
    pub fn run_hybrid(
        &mut self,
        coupler: &HybridCoupler,
        scheme: &dyn RelaxationScheme,
        simulators: &mut [Box<dyn CfdSimulator>],
        time: Real,
        log: &mut ResultLog,
    ) -> OrchestratorResult<usize> {
        let iterations = coupler.run(&mut self.graph, scheme, simulators)?;
        let modules = simulators
            .iter()
            .map(|sim| (sim.get_module(), format!("converged={}", sim.has_converged())))
            .collect();
        self.snapshot(time, ModeSnapshot::Hybrid(modules), log);
        Ok(iterations)
    }
}
