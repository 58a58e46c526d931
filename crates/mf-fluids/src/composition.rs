//! Mixtures: immutable concentration records, and the per-specie Fourier
//! concentration profiles carried by diffusive-mixing channels.

use std::collections::HashMap;
use std::f64::consts::PI;

use mf_core::{MixtureId, Real, SpecieId};

use crate::error::{FluidError, FluidResult};

/// An immutable record: id plus a mapping from specie id to concentration
/// (mol/m^3). Produced by instantaneous mixing at a node, or as a leaf
/// "constant" input to diffusive-mixing profile composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixture {
    pub id: MixtureId,
    concentrations: HashMap<SpecieId, Real>,
}

impl Mixture {
    pub fn new(id: MixtureId, concentrations: HashMap<SpecieId, Real>) -> Self {
        Self { id, concentrations }
    }

    pub fn concentration(&self, specie: SpecieId) -> Real {
        self.concentrations.get(&specie).copied().unwrap_or(0.0)
    }

    pub fn species(&self) -> impl Iterator<Item = SpecieId> + '_ {
        self.concentrations.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.concentrations.is_empty()
    }

    /// Volumetric-weighted mix of several (mixture, volume) inflows, per
    /// spec.md 4.4 step 2: for every specie present in any inflow,
    /// `new_concentration = sum(c_i * v_i) / sum(v_i)`.
    pub fn mix_weighted(id: MixtureId, inflows: &[(&Mixture, Real)]) -> FluidResult<Self> {
        let total_volume: Real = inflows.iter().map(|(_, v)| v).sum();
        if !(total_volume.is_finite()) || total_volume < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "total inflow volume",
            });
        }
        if total_volume == 0.0 {
            return Ok(Self::new(id, HashMap::new()));
        }

        let mut species: Vec<SpecieId> = Vec::new();
        for (m, _) in inflows {
            for s in m.species() {
                if !species.contains(&s) {
                    species.push(s);
                }
            }
        }

        let mut out = HashMap::with_capacity(species.len());
        for s in species {
            let weighted: Real = inflows
                .iter()
                .map(|(m, v)| m.concentration(s) * v)
                .sum();
            out.insert(s, weighted / total_volume);
        }
        Ok(Self::new(id, out))
    }
}

/// A truncated Fourier series on `xi in [0, 1]`:
/// `g(xi) = a0 + sum_{n=1..N} a_n * cos(n * pi * xi)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierProfile {
    pub a0: Real,
    pub coeffs: Vec<Real>,
}

impl FourierProfile {
    pub fn constant(value: Real) -> Self {
        Self {
            a0: value,
            coeffs: Vec::new(),
        }
    }

    pub fn evaluate(&self, xi: Real) -> Real {
        let mut g = self.a0;
        for (n0, a_n) in self.coeffs.iter().enumerate() {
            let n = (n0 + 1) as Real;
            g += a_n * (n * PI * xi).cos();
        }
        g
    }
}

/// A mixture carrying, per specie, a cross-channel concentration profile
/// rather than a single uniform value (used downstream of a diffusive
/// junction).
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusiveMixture {
    pub id: MixtureId,
    profiles: HashMap<SpecieId, FourierProfile>,
}

impl DiffusiveMixture {
    pub fn new(id: MixtureId, profiles: HashMap<SpecieId, FourierProfile>) -> Self {
        Self { id, profiles }
    }

    pub fn profile(&self, specie: SpecieId) -> Option<&FourierProfile> {
        self.profiles.get(&specie)
    }

    pub fn species(&self) -> impl Iterator<Item = SpecieId> + '_ {
        self.profiles.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::SpecieId;

    #[test]
    fn mix_weighted_two_to_one() {
        let s = SpecieId::from_index(0);
        let mut c_a = HashMap::new();
        c_a.insert(s, 1.0);
        let a = Mixture::new(MixtureId::from_index(0), c_a);

        let mut c_b = HashMap::new();
        c_b.insert(s, 0.0);
        let b = Mixture::new(MixtureId::from_index(1), c_b);

        // 2 volumes of `a` meeting 1 volume of `b` -> concentration 2/3.
        let merged = Mixture::mix_weighted(MixtureId::from_index(2), &[(&a, 2.0), (&b, 1.0)]).unwrap();
        assert!((merged.concentration(s) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mix_weighted_rejects_negative_volume() {
        let s = SpecieId::from_index(0);
        let mut c_a = HashMap::new();
        c_a.insert(s, 1.0);
        let a = Mixture::new(MixtureId::from_index(0), c_a);
        let result = Mixture::mix_weighted(MixtureId::from_index(1), &[(&a, -1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn fourier_profile_constant_is_flat() {
        let p = FourierProfile::constant(0.5);
        assert_eq!(p.evaluate(0.0), 0.5);
        assert_eq!(p.evaluate(1.0), 0.5);
    }

    #[test]
    fn fourier_profile_first_mode_at_half() {
        let p = FourierProfile {
            a0: 0.0,
            coeffs: vec![1.0],
        };
        // cos(pi * 0.5) = 0
        assert!(p.evaluate(0.5).abs() < 1e-12);
        // cos(0) = 1
        assert!((p.evaluate(0.0) - 1.0).abs() < 1e-12);
    }
}
