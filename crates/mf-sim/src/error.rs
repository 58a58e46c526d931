//! Error types for the four transient simulators.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DropletError {
    #[error("invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("droplet injection invalid: {what}")]
    InvalidInjection { what: &'static str },

    #[error("iteration limit {limit} exceeded without reaching a stop condition")]
    IterationLimit { limit: usize },

    #[error("mna error: {0}")]
    Mna(#[from] mf_mna::MnaError),

    #[error("fluid error: {0}")]
    Fluid(#[from] mf_fluids::FluidError),
}

pub type DropletResult<T> = Result<T, DropletError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixingError {
    #[error("invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("negative inflow volume at node: solver inconsistency")]
    NegativeInflow,

    #[error("fluid error: {0}")]
    Fluid(#[from] mf_fluids::FluidError),
}

pub type MixingResult<T> = Result<T, MixingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffusiveError {
    #[error("invalid junction topology at node: {what}")]
    InvalidTopology { what: &'static str },

    #[error("invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type DiffusiveResult<T> = Result<T, DiffusiveError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HybridError {
    #[error("no resistance model configured for hybrid mode, or a non-Poiseuille model was given")]
    MissingResistanceModel,

    #[error("cfd simulator references unknown module {0:?}")]
    UnknownModule(mf_core::ModuleId),

    #[error("modules and simulators are not in bijection: {what}")]
    NotBijective { what: &'static str },

    #[error("mna error: {0}")]
    Mna(#[from] mf_mna::MnaError),
}

pub type HybridResult<T> = Result<T, HybridError>;
