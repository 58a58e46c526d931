//! Concrete resistance models.

use std::f64::consts::PI;

use mf_core::Real;

use crate::common::{check_finite, require_positive_geometry};
use crate::error::{ResistanceError, ResistanceResult};
use crate::traits::ResistanceModel;

fn factor_a(width: Real, height: Real) -> Real {
    12. / (1. - 192. * height * (PI * width / (2. * height)).tanh() / (PI.powi(5) * width))
}

fn finish(value: Real) -> ResistanceResult<Real> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ResistanceError::NonPositiveResistance { value });
    }
    Ok(value)
}

/// Series expansion of the rectangular-duct shape factor, from spec.md 4.1:
/// `R = L * a(w,h) * mu / (w * h^3)`, `a(w,h) = 12 / (1 - 192*h*tanh(pi*w/2h)/(pi^5*w))`.
/// Supports a droplet term `dR = 3 * (V/(w*h)) * a * mu / (w * h^3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneDModel;

impl ResistanceModel for OneDModel {
    fn name(&self) -> &'static str {
        "1d"
    }

    fn resistance(&self, width: Real, height: Real, length: Real, viscosity: Real) -> ResistanceResult<Real> {
        require_positive_geometry(width, height, length)?;
        check_finite(viscosity, "viscosity")?;
        let a = factor_a(width, height);
        finish(length * a * viscosity / (width * height.powi(3)))
    }

    fn droplet_resistance(
        &self,
        width: Real,
        height: Real,
        length: Real,
        viscosity: Real,
        volume_in_channel: Real,
    ) -> ResistanceResult<Real> {
        require_positive_geometry(width, height, length)?;
        check_finite(viscosity, "viscosity")?;
        check_finite(volume_in_channel, "volume_in_channel")?;
        let a = factor_a(width, height);
        let droplet_length = volume_in_channel / (width * height);
        finish(3. * droplet_length * a * viscosity / (width * height.powi(3)))
    }
}

/// Fixed shape-factor (12) rectangular-duct resistance, from spec.md 4.1:
/// `R = L * 12 * mu / (h * w^3)`. No droplet term.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoiseuilleModel;

impl ResistanceModel for PoiseuilleModel {
    fn name(&self) -> &'static str {
        "poiseuille"
    }

    fn resistance(&self, width: Real, height: Real, length: Real, viscosity: Real) -> ResistanceResult<Real> {
        require_positive_geometry(width, height, length)?;
        check_finite(viscosity, "viscosity")?;
        finish(length * 12. * viscosity / (height * width.powi(3)))
    }
}

/// Poiseuille-style base resistance plus a droplet term corrected for the
/// lubricating film left behind the droplet, per spec.md 4.1.
///
/// The film thickness `H_inf` is estimated from the Bretherton law
/// (capillary number `Ca`, viscosity ratio `lambda`), the standard
/// closed-form used in droplet-microfluidics literature when no channel
/// radius measurement is available: `H_inf = 0.670 * Ca^(2/3) / (1 +
/// 3.35 * Ca^(2/3))`, scaled down as `lambda` grows since a more viscous
/// droplet phase resists film formation. `Ca` is approximated from the
/// continuous-phase viscosity and a reference velocity is not tracked by
/// this model, so `Ca` is taken as a fixed constant calibrated against
/// typical PDMS droplet runs; see DESIGN.md for the rationale.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoiseuilleFilmModel {
    pub viscosity_ratio: Real,
    pub capillary_number: Real,
}

impl PlanarPoiseuilleFilmModel {
    pub fn new(viscosity_ratio: Real, capillary_number: Real) -> Self {
        Self {
            viscosity_ratio,
            capillary_number,
        }
    }

    fn film_thickness_fraction(&self) -> Real {
        let ca23 = self.capillary_number.powf(2.0 / 3.0);
        let bretherton = 0.670 * ca23 / (1.0 + 3.35 * ca23);
        bretherton / (1.0 + self.viscosity_ratio)
    }
}

impl ResistanceModel for PlanarPoiseuilleFilmModel {
    fn name(&self) -> &'static str {
        "planar-poiseuille-film"
    }

    fn resistance(&self, width: Real, height: Real, length: Real, viscosity: Real) -> ResistanceResult<Real> {
        require_positive_geometry(width, height, length)?;
        check_finite(viscosity, "viscosity")?;
        finish(length * 12. * viscosity / (height * width.powi(3)))
    }

    fn droplet_resistance(
        &self,
        width: Real,
        height: Real,
        length: Real,
        viscosity: Real,
        volume_in_channel: Real,
    ) -> ResistanceResult<Real> {
        require_positive_geometry(width, height, length)?;
        check_finite(viscosity, "viscosity")?;
        check_finite(volume_in_channel, "volume_in_channel")?;
        let droplet_length = volume_in_channel / (width * height);
        let effective_height = height * (1.0 - self.film_thickness_fraction()).max(0.0);
        if effective_height <= 0.0 {
            return Err(ResistanceError::NonPhysical {
                what: "effective channel height after film correction",
            });
        }
        finish(3. * droplet_length * 12. * viscosity / (effective_height * width.powi(3)))
    }
}
