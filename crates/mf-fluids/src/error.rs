//! Fluid/specie/mixture errors.

use thiserror::Error;

pub type FluidResult<T> = Result<T, FluidError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    #[error("non-physical value for {what}")]
    NonPhysical { what: &'static str },

    #[error("invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("unknown specie id referenced in {what}")]
    UnknownSpecie { what: &'static str },
}
