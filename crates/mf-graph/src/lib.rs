//! mf-graph: the network (data model) layer.
//!
//! Provides the immutable-topology graph of nodes, rectangular channels,
//! pumps, CFD modules/openings, and connectivity groups, plus an
//! incremental builder and stable indexing for solver integration.
//!
//! # Example
//!
//! ```
//! use mf_graph::{ChannelKind, GraphBuilder};
//!
//! let mut builder = GraphBuilder::new();
//! let inlet = builder.add_node((0.0, 0.0), true, false);
//! let outlet = builder.add_node((1e-2, 0.0), false, false);
//! builder.add_channel(inlet, outlet, 1e-4, 2e-4, None, ChannelKind::Normal);
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.nodes().len(), 2);
//! assert_eq!(graph.channels().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod indexing;
pub(crate) mod validate;

pub use builder::GraphBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{
    CfdModule, Channel, ChannelKind, ChannelPosition, Graph, Group, Incidence, Node, Opening,
    Pump, PumpKind,
};
pub use indexing::IndexMap;
