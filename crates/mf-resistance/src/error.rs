//! Resistance-model errors.

use thiserror::Error;

pub type ResistanceResult<T> = Result<T, ResistanceError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResistanceError {
    #[error("non-positive resistance computed: {value}")]
    NonPositiveResistance { value: f64 },

    #[error("model {model} does not support droplet resistance contributions")]
    DropletsUnsupported { model: &'static str },

    #[error("non-physical value for {what}")]
    NonPhysical { what: &'static str },
}
