//! Fluid and specie definitions.
//!
//! Unlike a full equation-of-state backend, these are immutable value
//! records: a continuous-phase fluid carries only what the resistance and
//! droplet models need (viscosity, density); a specie carries only what
//! the mixing models need (diffusivity, saturation concentration).

use mf_core::{FluidId, Real, SpecieId};

use crate::error::{FluidError, FluidResult};

/// A continuous-phase fluid. Immutable once created except via explicit
/// replacement (callers construct a new `Fluid` with the same id).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluid {
    pub id: FluidId,
    pub viscosity: Real,
    pub density: Real,
}

impl Fluid {
    pub fn new(id: FluidId, viscosity: Real, density: Real) -> FluidResult<Self> {
        if !(viscosity.is_finite() && viscosity > 0.0) {
            return Err(FluidError::NonPhysical { what: "viscosity" });
        }
        if !(density.is_finite() && density > 0.0) {
            return Err(FluidError::NonPhysical { what: "density" });
        }
        Ok(Self {
            id,
            viscosity,
            density,
        })
    }
}

/// A chemical specie carried in mixtures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Specie {
    pub id: SpecieId,
    pub diffusivity: Real,
    pub saturation_concentration: Real,
}

impl Specie {
    pub fn new(id: SpecieId, diffusivity: Real, saturation_concentration: Real) -> FluidResult<Self> {
        if !(diffusivity.is_finite() && diffusivity > 0.0) {
            return Err(FluidError::NonPhysical { what: "diffusivity" });
        }
        if !(saturation_concentration.is_finite() && saturation_concentration >= 0.0) {
            return Err(FluidError::NonPhysical {
                what: "saturation_concentration",
            });
        }
        Ok(Self {
            id,
            diffusivity,
            saturation_concentration,
        })
    }
}
