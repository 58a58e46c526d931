//! mf-fluids: fluid, specie, and mixture definitions.
//!
//! Provides:
//! - `Fluid` / `Specie` immutable property records
//! - `Mixture` (uniform concentration record) and volumetric-weighted mixing
//! - `DiffusiveMixture` / `FourierProfile` for per-specie concentration
//!   profiles across a channel cross-section
//!
//! # Example
//!
//! ```
//! use mf_fluids::Fluid;
//! use mf_core::FluidId;
//!
//! let water = Fluid::new(FluidId::from_index(0), 1.0e-3, 1000.0).unwrap();
//! assert_eq!(water.density, 1000.0);
//! ```

pub mod composition;
pub mod error;
pub mod model;

pub use composition::{DiffusiveMixture, FourierProfile, Mixture};
pub use error::{FluidError, FluidResult};
pub use model::{Fluid, Specie};
