//! mf-results: in-memory time-indexed simulation states and the full
//! mixture archive (spec.md section 6). No serialization: the log is
//! plain, cloneable data a caller can write out in whatever format it
//! needs.

pub mod log;
pub mod types;

pub use log::ResultLog;
pub use types::{DropletRecord, MixturePosition, ModeSnapshot, SavedState};
