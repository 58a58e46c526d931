//! Plain data types making up one saved simulation state.

use std::collections::{HashMap, VecDeque};

use mf_core::{ChannelId, DropletId, ModuleId, MixtureId, NodeId, Real};
use mf_sim::Boundary;

/// A mixture front's location within its channel, as carried by the
/// instantaneous-mixing simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixturePosition {
    pub mixture: MixtureId,
    pub position: Real,
}

/// Everything recorded about one droplet at a saved state.
#[derive(Debug, Clone, PartialEq)]
pub struct DropletRecord {
    pub boundaries: Vec<Boundary>,
    pub fully_occupied_channel_ids: Vec<ChannelId>,
}

/// The mode-dependent part of a saved state, per spec.md section 6:
/// droplet boundary records, mixture-front deques, or a caller-reported
/// CFD visualization path, keyed by the owning entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeSnapshot {
    /// Steady continuous single-phase flow: pressures and flow rates alone
    /// are the whole state, no per-entity payload applies.
    Continuous,
    Droplet(HashMap<DropletId, DropletRecord>),
    Mixing(HashMap<ChannelId, VecDeque<MixturePosition>>),
    /// Keyed by module id: this crate's hybrid coupler binds exactly one
    /// `CfdSimulator` per module, so the module id doubles as the
    /// simulator's identity for result-logging purposes.
    Hybrid(HashMap<ModuleId, String>),
}

/// One time-indexed snapshot: network-wide pressures and flows plus
/// whatever mode-specific state the active simulator carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedState {
    pub time: Real,
    pub node_pressures: HashMap<NodeId, Real>,
    pub edge_flow_rates: HashMap<ChannelId, Real>,
    pub mode: ModeSnapshot,
}
