use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Foundation-level error. Higher crates define their own error enums and
/// convert into this one (or into their own) via `#[from]`, following the
/// `tf-solver::SolverError -> TfError` layering.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("invariant violated: {what}")]
    Invariant { what: &'static str },
}
