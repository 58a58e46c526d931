//! mf-resistance: hydraulic resistance models for rectangular channels.
//!
//! Provides a closed family of models mapping channel geometry and
//! continuous-phase viscosity to a resistance, dispatched through the
//! `ResistanceModel` trait:
//! - `OneDModel`: series-expansion shape factor, supports droplet terms
//! - `PoiseuilleModel`: fixed shape factor, no droplet support
//! - `PlanarPoiseuilleFilmModel`: Poiseuille base plus a film-corrected
//!   droplet term
//!
//! # Example
//!
//! ```
//! use mf_resistance::{OneDModel, ResistanceModel};
//!
//! let model = OneDModel;
//! let r = model.resistance(50e-6, 30e-6, 1e-3, 1e-3).unwrap();
//! assert!(r > 0.0);
//! ```

pub mod common;
pub mod error;
pub mod models;
pub mod traits;

pub use error::{ResistanceError, ResistanceResult};
pub use models::{OneDModel, PlanarPoiseuilleFilmModel, PoiseuilleModel};
pub use traits::ResistanceModel;
