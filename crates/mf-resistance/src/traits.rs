//! Core trait for hydraulic resistance models.

use mf_core::Real;

use crate::error::ResistanceResult;

/// A closed family of models mapping rectangular-channel geometry and
/// continuous-phase viscosity to a hydraulic resistance.
///
/// Components are deterministic functions of geometry and viscosity alone;
/// they carry no graph or fluid-record state, so a single model instance is
/// shared across every channel that selects it.
pub trait ResistanceModel: Send + Sync {
    /// Model name for debugging and identification.
    fn name(&self) -> &'static str;

    /// Channel resistance for a rectangular channel of the given geometry
    /// carrying a continuous phase of the given viscosity.
    fn resistance(&self, width: Real, height: Real, length: Real, viscosity: Real) -> ResistanceResult<Real>;

    /// Additional resistance contributed by a droplet occupying
    /// `volume_in_channel` of a channel with the given geometry.
    ///
    /// Default implementation reports that the model has no droplet term.
    fn droplet_resistance(
        &self,
        _width: Real,
        _height: Real,
        _length: Real,
        _viscosity: Real,
        _volume_in_channel: Real,
    ) -> ResistanceResult<Real> {
        Err(crate::error::ResistanceError::DropletsUnsupported { model: self.name() })
    }
}
