//! Event-driven simulator for transient immiscible-droplet flow (spec
//! section 4.3): droplets occupy channel sections, modify channel
//! resistance, and move as boundaries cross channel ends.

use std::cmp::Ordering;
use std::collections::HashMap;

use mf_core::{ChannelId, DropletId, IdGen, InjectionId, MixtureId, NodeId, Real};
use mf_fluids::Mixture;
use mf_graph::{Channel, ChannelKind, Graph};
use mf_mna::solve;
use mf_resistance::ResistanceModel;

use crate::error::{DropletError, DropletResult};
use crate::events::clamp_position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropletPhase {
    Injection,
    Network,
    Trapped,
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Leading edge: moves away from the droplet's center as flow advances.
    Head,
    /// Trailing edge: moves toward the droplet's center as flow advances.
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    Normal,
    WaitInflow,
    WaitOutflow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub droplet: DropletId,
    pub kind: BoundaryKind,
    pub channel: ChannelId,
    /// Position along the channel, `node_a` side = 0.
    pub position: Real,
    pub state: BoundaryState,
    /// Signed flow rate driving this boundary; positive = motion away from
    /// the droplet's center.
    pub flow_rate: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Droplet {
    pub id: DropletId,
    pub mixture: MixtureId,
    pub volume: Real,
    pub phase: DropletPhase,
    pub fully_occupied: Vec<ChannelId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Injection {
    pub id: InjectionId,
    pub channel: ChannelId,
    pub position: Real,
    pub volume: Real,
    pub mixture: MixtureId,
    pub time: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    DropletInjection { injection_idx: usize },
    BoundaryHead { boundary_idx: usize },
    BoundaryTail { boundary_idx: usize },
    /// A moving head arrives at a node already occupied by another droplet.
    MergeBifurcation { boundary_idx: usize, node: NodeId },
    /// Two boundaries of different droplets in the same channel meet.
    MergeChannel { boundary_a: usize, boundary_b: usize },
    TimeStep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledEvent {
    time: Real,
    priority: u8,
    kind: EventKind,
}

impl ScheduledEvent {
    fn order_key(&self) -> (Real, u8) {
        (self.time, self.priority)
    }
}

/// One recorded boundary crossing, for tests and result logging: which
/// channel a droplet boundary entered and at what simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCrossing {
    pub droplet: DropletId,
    pub channel: ChannelId,
    pub time: Real,
}

pub struct DropletSimulator {
    droplets: Vec<Droplet>,
    boundaries: Vec<Boundary>,
    pending_injections: Vec<Injection>,
    clock: Real,
    iterations: usize,
    max_iterations: usize,
    pub slip_factor: Real,
    id_gen: IdGen,
    crossings: Vec<BoundaryCrossing>,
    archive: Vec<Mixture>,
}

impl DropletSimulator {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            droplets: Vec::new(),
            boundaries: Vec::new(),
            pending_injections: Vec::new(),
            clock: 0.0,
            iterations: 0,
            max_iterations,
            slip_factor: 1.0,
            id_gen: IdGen::new(),
            crossings: Vec::new(),
            archive: Vec::new(),
        }
    }

    pub fn clock(&self) -> Real {
        self.clock
    }

    pub fn droplets(&self) -> &[Droplet] {
        &self.droplets
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn crossings(&self) -> &[BoundaryCrossing] {
        &self.crossings
    }

    pub fn archive(&self) -> &[Mixture] {
        &self.archive
    }

    /// Archive a mixture the caller already knows the concentration of, so
    /// a merge event blending two droplets' fluids can look it up by id.
    pub fn seed_mixture(&mut self, mixture: Mixture) -> MixtureId {
        let id = mixture.id;
        self.archive.push(mixture);
        id
    }

    fn find_archived(&self, id: MixtureId) -> Option<&Mixture> {
        self.archive.iter().rev().find(|m| m.id == id)
    }

    /// Schedule a droplet injection, validated against spec 4.3 "injection
    /// validity": `volume(droplet)/volume(channel) < 1` and the head/tail
    /// fractional span must stay within `[0, 1]`.
    pub fn schedule_injection(
        &mut self,
        graph: &Graph,
        channel: ChannelId,
        position: Real,
        volume: Real,
        mixture: MixtureId,
        time: Real,
    ) -> DropletResult<InjectionId> {
        let ch = graph
            .channel(channel)
            .ok_or(DropletError::InvalidArg { what: "channel" })?;
        let channel_volume = ch.volume();
        if !(volume / channel_volume < 1.0) {
            return Err(DropletError::InvalidInjection {
                what: "droplet volume does not fit inside target channel",
            });
        }
        let fraction = (volume / channel_volume) / 2.0;
        if position - fraction < 0.0 || position + fraction > 1.0 {
            return Err(DropletError::InvalidInjection {
                what: "injection span exceeds channel bounds",
            });
        }
        let id = self.id_gen.next_id(InjectionId::from_index);
        self.pending_injections.push(Injection {
            id,
            channel,
            position,
            volume,
            mixture,
            time,
        });
        Ok(id)
    }

    /// Runs one admissible-event iteration: recompute resistances, solve
    /// MNA, pick the earliest admissible event, advance boundaries to it,
    /// and apply it. Returns `false` once no admissible event remains.
    pub fn step(
        &mut self,
        graph: &mut Graph,
        model: &dyn ResistanceModel,
        viscosity: Real,
    ) -> DropletResult<bool> {
        if self.iterations >= self.max_iterations {
            return Err(DropletError::IterationLimit {
                limit: self.max_iterations,
            });
        }
        self.recompute_resistances(graph, model, viscosity)?;
        solve(graph)?;
        self.update_boundary_flows(graph);
        self.reprocess_waiting_boundaries(graph)?;

        let events = self.admissible_events(graph);
        let Some(next) = events
            .into_iter()
            .min_by(|a, b| a.order_key().partial_cmp(&b.order_key()).unwrap_or(Ordering::Equal))
        else {
            return Ok(false);
        };

        let dt = next.time;
        self.advance_boundaries(graph, dt);
        self.clock += dt;
        self.apply_event(graph, next.kind)?;
        self.iterations += 1;
        Ok(true)
    }

    /// Runs [`DropletSimulator::step`] until no admissible event remains.
    pub fn run(
        &mut self,
        graph: &mut Graph,
        model: &dyn ResistanceModel,
        viscosity: Real,
    ) -> DropletResult<()> {
        while self.step(graph, model, viscosity)? {}
        Ok(())
    }

    fn recompute_resistances(
        &self,
        graph: &mut Graph,
        model: &dyn ResistanceModel,
        viscosity: Real,
    ) -> DropletResult<()> {
        let channel_ids: Vec<_> = graph.channels().iter().map(|c| c.id).collect();
        for id in channel_ids {
            let Some(ch) = graph.channel(id) else { continue };
            if ch.kind == ChannelKind::Bypass {
                continue;
            }
            let mut resistance = model
                .resistance(ch.width, ch.height, ch.length, viscosity)
                .map_err(|_| DropletError::InvalidArg { what: "resistance" })?;
            let occupied_volume = self.droplet_volume_in_channel(id);
            if occupied_volume > 0.0 {
                resistance += model
                    .droplet_resistance(ch.width, ch.height, ch.length, viscosity, occupied_volume)
                    .unwrap_or(0.0);
            }
            if let Some(ch) = graph.channel_mut(id) {
                ch.resistance = resistance;
            }
        }
        Ok(())
    }

    fn droplet_volume_in_channel(&self, channel: ChannelId) -> Real {
        let mut heads: Vec<Real> = Vec::new();
        let mut tails: Vec<Real> = Vec::new();
        for b in self.boundaries.iter().filter(|b| b.channel == channel) {
            match b.kind {
                BoundaryKind::Head => heads.push(b.position),
                BoundaryKind::Tail => tails.push(b.position),
            }
        }
        // One droplet segment per (tail, head) pair sharing this channel;
        // approximate with the widest observed span when several coexist.
        let mut total = 0.0;
        for h in &heads {
            if let Some(t) = tails.iter().copied().reduce(Real::min) {
                total += (h - t).abs();
            }
        }
        total
    }

    /// Per spec 4.3: boundary flow = channel flow × (|boundary volume| /
    /// sum of boundary volumes at the same reference node), signed so
    /// positive means motion away from the droplet's center. A boundary's
    /// own volume is its droplet's volume; the reference node is the node
    /// its motion is directed toward (`node_b` for a head, `node_a` for a
    /// tail). Several boundaries only share a reference node when more
    /// than one droplet approaches or leaves the same junction at once.
    fn update_boundary_flows(&mut self, graph: &Graph) {
        let droplet_volume: HashMap<DropletId, Real> = self.droplets.iter().map(|d| (d.id, d.volume)).collect();

        let mut node_totals: HashMap<NodeId, Real> = HashMap::new();
        for b in &self.boundaries {
            let Some(ch) = graph.channel(b.channel) else { continue };
            let node = boundary_reference_node(b, ch);
            let volume = droplet_volume.get(&b.droplet).copied().unwrap_or(0.0).abs();
            *node_totals.entry(node).or_insert(0.0) += volume;
        }

        for b in &mut self.boundaries {
            let Some(ch) = graph.channel(b.channel) else { continue };
            let sign = match b.kind {
                BoundaryKind::Head => 1.0,
                BoundaryKind::Tail => -1.0,
            };
            let node = boundary_reference_node(b, ch);
            let total = node_totals.get(&node).copied().unwrap_or(0.0);
            let volume = droplet_volume.get(&b.droplet).copied().unwrap_or(0.0).abs();
            let weight = if total > 0.0 { volume / total } else { 1.0 };
            b.flow_rate = ch.flow_rate * sign * weight;
        }
    }

    fn admissible_events(&self, graph: &Graph) -> Vec<ScheduledEvent> {
        let mut events = Vec::new();

        for (idx, injection) in self.pending_injections.iter().enumerate() {
            if injection.time >= self.clock {
                events.push(ScheduledEvent {
                    time: injection.time - self.clock,
                    priority: 1,
                    kind: EventKind::DropletInjection { injection_idx: idx },
                });
            }
        }

        for (idx, b) in self.boundaries.iter().enumerate() {
            if b.state != BoundaryState::Normal || b.flow_rate == 0.0 {
                continue;
            }
            let Some(ch) = graph.channel(b.channel) else { continue };
            let target = match b.kind {
                BoundaryKind::Head => 1.0,
                BoundaryKind::Tail => 0.0,
            };
            let distance = (target - b.position).abs();
            let volume = ch.volume();
            if volume <= 0.0 {
                continue;
            }
            let time = distance * volume / b.flow_rate.abs();
            if b.kind == BoundaryKind::Head && self.node_occupied_by_other_droplet(graph, ch.node_b, b.droplet) {
                events.push(ScheduledEvent {
                    time,
                    priority: 0,
                    kind: EventKind::MergeBifurcation { boundary_idx: idx, node: ch.node_b },
                });
                continue;
            }
            let kind = match b.kind {
                BoundaryKind::Head => EventKind::BoundaryHead { boundary_idx: idx },
                BoundaryKind::Tail => EventKind::BoundaryTail { boundary_idx: idx },
            };
            events.push(ScheduledEvent { time, priority: 1, kind });
        }

        events.extend(self.merge_channel_events(graph));
        events
    }

    /// A node is occupied by another droplet when one of its boundaries is
    /// stalled there (`WaitOutflow`/`WaitInflow`), or holding the
    /// far/near end of a channel incident to that node.
    fn node_occupied_by_other_droplet(&self, graph: &Graph, node: NodeId, exclude: DropletId) -> bool {
        self.boundaries.iter().any(|b| {
            if b.droplet == exclude || b.state == BoundaryState::Normal {
                return false;
            }
            let Some(ch) = graph.channel(b.channel) else { return false };
            match b.kind {
                BoundaryKind::Head => ch.node_b == node,
                BoundaryKind::Tail => ch.node_a == node,
            }
        })
    }

    /// Detect pairs of boundaries belonging to different droplets sharing
    /// a channel whose positions will coincide: per spec 4.3,
    /// `t = (p1 - p0) / (v0 - v1)`, emitted only when `t >= 0` and the
    /// meeting position falls inside `[0, 1]`.
    fn merge_channel_events(&self, graph: &Graph) -> Vec<ScheduledEvent> {
        let mut by_channel: HashMap<ChannelId, Vec<usize>> = HashMap::new();
        for (idx, b) in self.boundaries.iter().enumerate() {
            if b.state == BoundaryState::Normal {
                by_channel.entry(b.channel).or_default().push(idx);
            }
        }

        let mut events = Vec::new();
        for (channel, idxs) in by_channel {
            if idxs.len() < 2 {
                continue;
            }
            let Some(ch) = graph.channel(channel) else { continue };
            let volume = ch.volume();
            if volume <= 0.0 {
                continue;
            }
            for i in 0..idxs.len() {
                for j in (i + 1)..idxs.len() {
                    let a = &self.boundaries[idxs[i]];
                    let b = &self.boundaries[idxs[j]];
                    if a.droplet == b.droplet {
                        continue;
                    }
                    let v0 = self.slip_factor * a.flow_rate / volume;
                    let v1 = self.slip_factor * b.flow_rate / volume;
                    if (v0 - v1).abs() < 1e-15 {
                        continue;
                    }
                    let t = (b.position - a.position) / (v0 - v1);
                    if t < 0.0 {
                        continue;
                    }
                    let meeting = a.position + v0 * t;
                    if !(0.0..=1.0).contains(&meeting) {
                        continue;
                    }
                    events.push(ScheduledEvent {
                        time: t,
                        priority: 0,
                        kind: EventKind::MergeChannel { boundary_a: idxs[i], boundary_b: idxs[j] },
                    });
                }
            }
        }
        events
    }

    fn advance_boundaries(&mut self, graph: &Graph, dt: Real) {
        for b in &mut self.boundaries {
            if b.flow_rate == 0.0 {
                continue;
            }
            let Some(ch) = graph.channel(b.channel) else { continue };
            let volume = ch.volume();
            if volume <= 0.0 {
                continue;
            }
            let delta = self.slip_factor * b.flow_rate * dt / volume;
            b.position = clamp_position(b.position + delta);
        }
    }

    fn apply_event(&mut self, graph: &mut Graph, kind: EventKind) -> DropletResult<()> {
        match kind {
            EventKind::DropletInjection { injection_idx } => {
                let injection = self.pending_injections.remove(injection_idx);
                let droplet_id = self.id_gen.next_id(DropletId::from_index);
                let Some(ch) = graph.channel(injection.channel) else {
                    return Err(DropletError::InvalidArg { what: "channel" });
                };
                let volume = ch.volume();
                let fraction = (injection.volume / volume) / 2.0;
                self.droplets.push(Droplet {
                    id: droplet_id,
                    mixture: injection.mixture,
                    volume: injection.volume,
                    phase: DropletPhase::Network,
                    fully_occupied: Vec::new(),
                });
                self.boundaries.push(Boundary {
                    droplet: droplet_id,
                    kind: BoundaryKind::Head,
                    channel: injection.channel,
                    position: clamp_position(injection.position + fraction),
                    state: BoundaryState::Normal,
                    flow_rate: 0.0,
                });
                self.boundaries.push(Boundary {
                    droplet: droplet_id,
                    kind: BoundaryKind::Tail,
                    channel: injection.channel,
                    position: clamp_position(injection.position - fraction),
                    state: BoundaryState::Normal,
                    flow_rate: 0.0,
                });
                self.crossings.push(BoundaryCrossing {
                    droplet: droplet_id,
                    channel: injection.channel,
                    time: self.clock,
                });
                Ok(())
            }
            EventKind::BoundaryHead { boundary_idx } => {
                self.cross_boundary(graph, boundary_idx, BoundaryKind::Head)
            }
            EventKind::BoundaryTail { boundary_idx } => {
                self.cross_boundary(graph, boundary_idx, BoundaryKind::Tail)
            }
            EventKind::MergeBifurcation { boundary_idx, node } => self.merge_bifurcation(graph, boundary_idx, node),
            EventKind::MergeChannel { boundary_a, boundary_b } => self.merge_channel(boundary_a, boundary_b),
            EventKind::TimeStep => Ok(()),
        }
    }

    fn cross_boundary(
        &mut self,
        graph: &Graph,
        boundary_idx: usize,
        kind: BoundaryKind,
    ) -> DropletResult<()> {
        let boundary = self.boundaries[boundary_idx];
        let Some(ch) = graph.channel(boundary.channel) else {
            return Err(DropletError::InvalidArg { what: "channel" });
        };
        let from_node = match kind {
            BoundaryKind::Head => ch.node_b,
            BoundaryKind::Tail => ch.node_a,
        };

        match kind {
            BoundaryKind::Head => {
                let best = graph
                    .node_channels(from_node)
                    .iter()
                    .filter(|inc| inc.is_source_end)
                    .filter(|inc| {
                        graph
                            .channel(inc.channel)
                            .map(|c| c.kind != ChannelKind::Bypass)
                            .unwrap_or(false)
                    })
                    .max_by(|a, b| {
                        let fa = graph.channel(a.channel).map(|c| c.flow_rate).unwrap_or(0.0);
                        let fb = graph.channel(b.channel).map(|c| c.flow_rate).unwrap_or(0.0);
                        fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
                    });
                match best {
                    Some(inc) if graph.channel(inc.channel).map(|c| c.flow_rate > 0.0).unwrap_or(false) => {
                        let new_channel = inc.channel;
                        self.boundaries[boundary_idx].channel = new_channel;
                        self.boundaries[boundary_idx].position = 0.0;
                        self.boundaries[boundary_idx].state = BoundaryState::Normal;
                        self.crossings.push(BoundaryCrossing {
                            droplet: boundary.droplet,
                            channel: new_channel,
                            time: self.clock,
                        });
                    }
                    _ => {
                        self.boundaries[boundary_idx].state = BoundaryState::WaitOutflow;
                    }
                }
            }
            BoundaryKind::Tail => {
                let successors: Vec<_> = graph
                    .node_channels(from_node)
                    .iter()
                    .filter(|inc| !inc.is_source_end)
                    .filter(|inc| {
                        graph
                            .channel(inc.channel)
                            .map(|c| c.kind != ChannelKind::Bypass && c.flow_rate > 0.0)
                            .unwrap_or(false)
                    })
                    .collect();
                match successors.as_slice() {
                    [only] => {
                        let new_channel = only.channel;
                        self.boundaries[boundary_idx].channel = new_channel;
                        self.boundaries[boundary_idx].position = 1.0;
                        self.boundaries[boundary_idx].state = BoundaryState::Normal;
                    }
                    [] => {
                        self.boundaries[boundary_idx].state = BoundaryState::WaitInflow;
                    }
                    _ => {
                        self.boundaries.remove(boundary_idx);
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-evaluate every stalled boundary against the freshly solved flow
    /// field: a `WaitOutflow` head retries its outgoing branch, a
    /// `WaitInflow` tail retries its incoming one. Processed from the
    /// highest index down so a `Tail` removal never invalidates an
    /// index still to be visited.
    fn reprocess_waiting_boundaries(&mut self, graph: &Graph) -> DropletResult<()> {
        let waiting: Vec<(usize, BoundaryKind)> = self
            .boundaries
            .iter()
            .enumerate()
            .filter(|(_, b)| b.state != BoundaryState::Normal)
            .map(|(idx, b)| (idx, b.kind))
            .collect();
        for (idx, kind) in waiting.into_iter().rev() {
            self.cross_boundary(graph, idx, kind)?;
        }
        Ok(())
    }

    /// Create a droplet that replaces `droplet_a` and `droplet_b`: its
    /// volume is their sum, its mixture the volume-weighted blend of both
    /// (when both are archived), and it inherits the union of their
    /// fully-occupied channels. Every boundary of either parent is
    /// reassigned to it; both parents are sunk.
    fn create_merged_droplet(&mut self, droplet_a: DropletId, droplet_b: DropletId) -> DropletResult<DropletId> {
        let pos_a = self
            .droplets
            .iter()
            .position(|d| d.id == droplet_a)
            .ok_or(DropletError::InvalidArg { what: "droplet" })?;
        let pos_b = self
            .droplets
            .iter()
            .position(|d| d.id == droplet_b)
            .ok_or(DropletError::InvalidArg { what: "droplet" })?;

        let a = self.droplets[pos_a].clone();
        let b = self.droplets[pos_b].clone();
        let merged_id = self.id_gen.next_id(DropletId::from_index);

        let archived_pair = match (self.find_archived(a.mixture), self.find_archived(b.mixture)) {
            (Some(ma), Some(mb)) => Some((ma.clone(), mb.clone())),
            _ => None,
        };
        let mixture = match archived_pair {
            Some((ma, mb)) => {
                let mixture_id = self.id_gen.next_id(MixtureId::from_index);
                let blended = Mixture::mix_weighted(mixture_id, &[(&ma, a.volume), (&mb, b.volume)])?;
                let id = blended.id;
                self.archive.push(blended);
                id
            }
            None => a.mixture,
        };

        let mut fully_occupied = a.fully_occupied.clone();
        for c in &b.fully_occupied {
            if !fully_occupied.contains(c) {
                fully_occupied.push(*c);
            }
        }

        self.droplets.push(Droplet {
            id: merged_id,
            mixture,
            volume: a.volume + b.volume,
            phase: DropletPhase::Network,
            fully_occupied,
        });
        self.droplets[pos_a].phase = DropletPhase::Sink;
        self.droplets[pos_b].phase = DropletPhase::Sink;

        for boundary in &mut self.boundaries {
            if boundary.droplet == droplet_a || boundary.droplet == droplet_b {
                boundary.droplet = merged_id;
            }
        }
        Ok(merged_id)
    }

    fn merge_bifurcation(&mut self, graph: &Graph, boundary_idx: usize, node: NodeId) -> DropletResult<()> {
        let head = self.boundaries[boundary_idx];
        let other = self.boundaries.iter().position(|b| {
            if b.droplet == head.droplet || b.state == BoundaryState::Normal {
                return false;
            }
            let Some(ch) = graph.channel(b.channel) else { return false };
            match b.kind {
                BoundaryKind::Head => ch.node_b == node,
                BoundaryKind::Tail => ch.node_a == node,
            }
        });
        let Some(other_idx) = other else {
            // The occupying boundary moved on before this event fired;
            // fall back to an ordinary head crossing.
            return self.cross_boundary(graph, boundary_idx, BoundaryKind::Head);
        };
        let other_droplet = self.boundaries[other_idx].droplet;
        self.create_merged_droplet(head.droplet, other_droplet)?;
        Ok(())
    }

    fn merge_channel(&mut self, boundary_a: usize, boundary_b: usize) -> DropletResult<()> {
        let a = self.boundaries[boundary_a];
        let b = self.boundaries[boundary_b];
        let merged_id = self.create_merged_droplet(a.droplet, b.droplet)?;

        let (hi, lo) = if boundary_a > boundary_b { (boundary_a, boundary_b) } else { (boundary_b, boundary_a) };
        self.boundaries.remove(hi);
        self.boundaries.remove(lo);

        if let Some(merged) = self.droplets.iter_mut().find(|d| d.id == merged_id) {
            if !merged.fully_occupied.contains(&a.channel) {
                merged.fully_occupied.push(a.channel);
            }
        }
        Ok(())
    }
}

/// The node a boundary's prescribed motion is directed toward: `node_b`
/// for a head (moving away from the droplet's center), `node_a` for a
/// tail (moving toward it).
fn boundary_reference_node(b: &Boundary, ch: &Channel) -> NodeId {
    match b.kind {
        BoundaryKind::Head => ch.node_b,
        BoundaryKind::Tail => ch.node_a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_graph::GraphBuilder;
    use mf_resistance::PoiseuilleModel;

    fn ring(n: usize) -> (Graph, Vec<ChannelId>) {
        let mut b = GraphBuilder::new();
        let ground = b.add_node((0.0, 0.0), true, false);
        let nodes: Vec<_> = (0..n)
            .map(|i| {
                let theta = i as Real / n as Real * std::f64::consts::TAU;
                b.add_node((theta.cos(), theta.sin()), false, false)
            })
            .collect();
        b.add_pressure_pump(ground, nodes[0], 100.0);
        b.add_flow_rate_pump(nodes[n / 2], ground, 0.0);
        let mut channels = Vec::new();
        for i in 0..n {
            let c = b.add_channel(
                nodes[i],
                nodes[(i + 1) % n],
                50e-6,
                50e-6,
                Some(1e-3),
                ChannelKind::Normal,
            );
            channels.push(c);
        }
        let graph = b.build().unwrap();
        (graph, channels)
    }

    #[test]
    fn injection_rejects_oversized_droplet() {
        let (graph, channels) = ring(6);
        let mut sim = DropletSimulator::new(1000);
        let result = sim.schedule_injection(
            &graph,
            channels[0],
            0.5,
            graph.channel(channels[0]).unwrap().volume() * 2.0,
            MixtureId::from_index(0),
            0.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn single_droplet_traverses_ring() {
        let (mut graph, channels) = ring(6);
        let model = PoiseuilleModel;
        let mut sim = DropletSimulator::new(1000);
        sim.schedule_injection(
            &graph,
            channels[0],
            0.5,
            graph.channel(channels[0]).unwrap().volume() * 0.2,
            MixtureId::from_index(0),
            0.0,
        )
        .unwrap();
        sim.run(&mut graph, &model, 1e-3).unwrap();
        assert!(!sim.crossings().is_empty());
        assert_eq!(sim.crossings()[0].channel, channels[0]);
    }

    #[test]
    fn tail_waits_then_recovers_once_an_inflow_opens() {
        let (graph, channels) = ring(6);
        let mut sim = DropletSimulator::new(1000);
        let droplet = sim.id_gen.next_id(DropletId::from_index);
        sim.droplets.push(Droplet {
            id: droplet,
            mixture: MixtureId::from_index(0),
            volume: 1e-15,
            phase: DropletPhase::Network,
            fully_occupied: Vec::new(),
        });
        let tail_idx = sim.boundaries.len();
        sim.boundaries.push(Boundary {
            droplet,
            kind: BoundaryKind::Tail,
            channel: channels[0],
            position: 0.0,
            state: BoundaryState::Normal,
            flow_rate: -1e-12,
        });

        let from_node = graph.channel(channels[0]).unwrap().node_a;
        let incoming = graph
            .node_channels(from_node)
            .iter()
            .find(|inc| !inc.is_source_end)
            .unwrap()
            .channel;
        // Starve the only incoming channel so the tail has nowhere to retreat.
        let mut starved = graph.clone();
        starved.channel_mut(incoming).unwrap().flow_rate = 0.0;
        sim.cross_boundary(&starved, tail_idx, BoundaryKind::Tail).unwrap();
        assert_eq!(sim.boundaries[tail_idx].state, BoundaryState::WaitInflow);

        // Once the incoming channel carries flow again, reprocessing admits it.
        let mut recovered = graph.clone();
        recovered.channel_mut(incoming).unwrap().flow_rate = 1e-12;
        sim.reprocess_waiting_boundaries(&recovered).unwrap();
        assert_eq!(sim.boundaries[tail_idx].state, BoundaryState::Normal);
        assert_eq!(sim.boundaries[tail_idx].channel, incoming);
        assert_eq!(sim.boundaries[tail_idx].position, 1.0);
    }

    #[test]
    fn converging_boundaries_in_the_same_channel_schedule_a_merge() {
        let (graph, channels) = ring(6);
        let mut sim = DropletSimulator::new(1000);
        let volume = graph.channel(channels[0]).unwrap().volume();

        let trailing = sim.id_gen.next_id(DropletId::from_index);
        sim.droplets.push(Droplet {
            id: trailing,
            mixture: MixtureId::from_index(0),
            volume: volume * 0.1,
            phase: DropletPhase::Network,
            fully_occupied: Vec::new(),
        });
        let leading = sim.id_gen.next_id(DropletId::from_index);
        sim.droplets.push(Droplet {
            id: leading,
            mixture: MixtureId::from_index(0),
            volume: volume * 0.1,
            phase: DropletPhase::Network,
            fully_occupied: Vec::new(),
        });

        // Trailing droplet's head chases the leading droplet's tail.
        sim.boundaries.push(Boundary {
            droplet: trailing,
            kind: BoundaryKind::Head,
            channel: channels[0],
            position: 0.2,
            state: BoundaryState::Normal,
            flow_rate: 2e-12,
        });
        sim.boundaries.push(Boundary {
            droplet: leading,
            kind: BoundaryKind::Tail,
            channel: channels[0],
            position: 0.5,
            state: BoundaryState::Normal,
            flow_rate: -1e-13,
        });

        let events = sim.merge_channel_events(&graph);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].kind,
            EventKind::MergeChannel { boundary_a: 0, boundary_b: 1 }
        ));

        sim.merge_channel(0, 1).unwrap();
        assert_eq!(sim.boundaries.len(), 0);
        let merged = sim.droplets.iter().find(|d| d.phase == DropletPhase::Network).unwrap();
        assert!((merged.volume - volume * 0.2).abs() < 1e-20);
        assert!(merged.fully_occupied.contains(&channels[0]));
        assert_eq!(
            sim.droplets.iter().filter(|d| d.phase == DropletPhase::Sink).count(),
            2
        );
    }
}
