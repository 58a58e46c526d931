//! Shared helpers for resistance-model calculations.

use mf_core::numeric::ensure_finite;

use crate::error::{ResistanceError, ResistanceResult};

pub fn check_finite(value: f64, what: &'static str) -> ResistanceResult<()> {
    ensure_finite(value, what).map_err(|_| ResistanceError::NonPhysical { what })?;
    Ok(())
}

pub fn require_positive_geometry(width: f64, height: f64, length: f64) -> ResistanceResult<()> {
    if width <= 0.0 {
        return Err(ResistanceError::NonPhysical { what: "width" });
    }
    if height <= 0.0 {
        return Err(ResistanceError::NonPhysical { what: "height" });
    }
    if length <= 0.0 {
        return Err(ResistanceError::NonPhysical { what: "length" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_finite_rejects_nan() {
        assert!(check_finite(f64::NAN, "x").is_err());
        assert!(check_finite(1.0, "x").is_ok());
    }

    #[test]
    fn require_positive_geometry_rejects_zero() {
        assert!(require_positive_geometry(0.0, 1.0, 1.0).is_err());
        assert!(require_positive_geometry(1.0, 1.0, 1.0).is_ok());
    }
}
