// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Species State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Ionization-state bookkeeping for a super-particle.
//!
//! A particle carries one [`ElementOccupation`] per element. Index `C` of
//! an occupation vector is the population fraction in charge state `C`
//! (index 0 is the neutral atom, index Z the bare nucleus). The
//! [`Representation`] tag decides how a requested migration is applied:
//!
//! - `Discrete`: the particle sits in exactly one state and moves as a
//!   whole, with probability equal to the requested increment.
//! - `Fractional`: the increment is shifted between adjacent levels,
//!   capped at the source occupancy.
//!
//! Readers never need to know which representation is active; they see
//! occupation vectors and the cached `mu`/`eta`.

use crate::constants::{atomic_weight, FRACTION_SILENT_TOL, FRACTION_WARN_TOL};
use crate::error::{CollideError, CollideResult};

/// How ionization changes are applied to a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representation {
    /// One discrete charge state per particle.
    Discrete,
    /// Continuous fractional occupation over charge states.
    #[default]
    Fractional,
}

/// Occupation vector of one element inside a particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementOccupation {
    z: u8,
    atomic_weight: f64,
    mass_fraction: f64,
    number_fraction: f64,
    fractions: Vec<f64>,
}

impl ElementOccupation {
    fn new(z: u8, mass_fraction: f64, fractions: Vec<f64>) -> CollideResult<Self> {
        let atomic_weight = atomic_weight(z).ok_or_else(|| {
            CollideError::PhysicsViolation(format!("unsupported atomic number z={z}"))
        })?;
        if fractions.len() != z as usize + 1 {
            return Err(CollideError::PhysicsViolation(format!(
                "occupation vector for z={z} must have {} entries, got {}",
                z as usize + 1,
                fractions.len()
            )));
        }
        if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(CollideError::PhysicsViolation(format!(
                "occupation fractions for z={z} must be finite and >= 0"
            )));
        }
        let sum: f64 = fractions.iter().sum();
        if sum <= 0.0 {
            return Err(CollideError::PhysicsViolation(format!(
                "occupation fractions for z={z} sum to zero"
            )));
        }
        if !mass_fraction.is_finite() || mass_fraction <= 0.0 {
            return Err(CollideError::PhysicsViolation(format!(
                "mass fraction for z={z} must be finite and > 0"
            )));
        }
        Ok(Self {
            z,
            atomic_weight,
            mass_fraction,
            number_fraction: 1.0,
            fractions: fractions.into_iter().map(|f| f / sum).collect(),
        })
    }

    /// Atomic number.
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Standard atomic weight [amu].
    pub fn atomic_weight(&self) -> f64 {
        self.atomic_weight
    }

    /// Mass fraction of this element in the particle.
    pub fn mass_fraction(&self) -> f64 {
        self.mass_fraction
    }

    /// Number fraction of the particle's atoms that belong to this element.
    pub fn number_fraction(&self) -> f64 {
        self.number_fraction
    }

    /// Occupation fractions, index = charge.
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// Occupation of charge state `charge` (0 if out of range).
    pub fn fraction(&self, charge: u8) -> f64 {
        self.fractions.get(charge as usize).copied().unwrap_or(0.0)
    }

    /// Free electrons per atom of this element.
    pub fn mean_charge(&self) -> f64 {
        self.fractions
            .iter()
            .enumerate()
            .map(|(c, f)| c as f64 * f)
            .sum()
    }

    fn sum(&self) -> f64 {
        self.fractions.iter().sum()
    }
}

/// Ionization state of a super-particle.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesState {
    representation: Representation,
    elements: Vec<ElementOccupation>,
    mu: f64,
    eta: f64,
}

impl SpeciesState {
    /// A particle of element `z` fixed in one charge state.
    pub fn discrete(z: u8, charge: u8) -> CollideResult<Self> {
        if charge > z {
            return Err(CollideError::PhysicsViolation(format!(
                "charge {charge} exceeds atomic number {z}"
            )));
        }
        let mut fractions = vec![0.0; z as usize + 1];
        fractions[charge as usize] = 1.0;
        Self::build(
            Representation::Discrete,
            vec![ElementOccupation::new(z, 1.0, fractions)?],
        )
    }

    /// A particle of element `z` with a fractional occupation vector.
    /// The vector is normalized on entry.
    pub fn fractional(z: u8, fractions: Vec<f64>) -> CollideResult<Self> {
        Self::build(
            Representation::Fractional,
            vec![ElementOccupation::new(z, 1.0, fractions)?],
        )
    }

    /// A neutral particle of element `z` in the requested representation.
    pub fn neutral(z: u8, representation: Representation) -> CollideResult<Self> {
        match representation {
            Representation::Discrete => Self::discrete(z, 0),
            Representation::Fractional => {
                let mut fractions = vec![0.0; z as usize + 1];
                fractions[0] = 1.0;
                Self::fractional(z, fractions)
            }
        }
    }

    /// A trace mixture: `(z, mass fraction, occupation)` per element.
    /// Mass fractions are normalized on entry.
    pub fn trace(components: Vec<(u8, f64, Vec<f64>)>) -> CollideResult<Self> {
        if components.is_empty() {
            return Err(CollideError::PhysicsViolation(
                "trace mixture needs at least one element".to_string(),
            ));
        }
        let mut elements = Vec::with_capacity(components.len());
        for (z, x, f) in components {
            if elements.iter().any(|e: &ElementOccupation| e.z == z) {
                return Err(CollideError::PhysicsViolation(format!(
                    "element z={z} listed twice in trace mixture"
                )));
            }
            elements.push(ElementOccupation::new(z, x, f)?);
        }
        let total: f64 = elements.iter().map(|e| e.mass_fraction).sum();
        for e in &mut elements {
            e.mass_fraction /= total;
        }
        Self::build(Representation::Fractional, elements)
    }

    fn build(representation: Representation, elements: Vec<ElementOccupation>) -> CollideResult<Self> {
        let mut state = SpeciesState {
            representation,
            elements,
            mu: 0.0,
            eta: 0.0,
        };
        state.refresh();
        Ok(state)
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn elements(&self) -> &[ElementOccupation] {
        &self.elements
    }

    /// Mean atomic mass per atom [amu]: `1 / Σ(X/A)`.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Free electrons per atom: `Σ_e n_e Σ_C f_e[C]·C`.
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Mean ionic charge per atom. Equal to `eta` for a neutral-overall particle.
    pub fn mean_charge(&self) -> f64 {
        self.eta
    }

    /// Electron-equivalent count for a particle of `weight` atoms.
    pub fn electron_count(&self, weight: f64) -> f64 {
        weight * self.eta
    }

    /// Largest |Σf − 1| over elements.
    pub fn normalization_error(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| (e.sum() - 1.0).abs())
            .fold(0.0, f64::max)
    }

    /// Move population of element `element` from charge `from` to `from + 1`.
    pub fn ionize(&mut self, element: usize, from: u8, delta: f64, uniform: f64) -> CollideResult<f64> {
        self.migrate(element, from, from.saturating_add(1), delta, uniform)
    }

    /// Move population of element `element` from charge `from` to `from - 1`.
    pub fn recombine(&mut self, element: usize, from: u8, delta: f64, uniform: f64) -> CollideResult<f64> {
        if from == 0 {
            return Err(CollideError::LogicError(
                "cannot recombine a neutral level".to_string(),
            ));
        }
        self.migrate(element, from, from - 1, delta, uniform)
    }

    /// Shift `delta` of element `element`'s population between adjacent
    /// levels and return the fraction actually moved.
    ///
    /// `uniform` is a U(0,1) draw used only by the discrete representation.
    /// A non-finite `delta` is treated as zero; a negative one is a defect.
    pub fn migrate(
        &mut self,
        element: usize,
        from: u8,
        to: u8,
        delta: f64,
        uniform: f64,
    ) -> CollideResult<f64> {
        let Some(occ) = self.elements.get(element) else {
            return Err(CollideError::LogicError(format!(
                "element index {element} out of range ({} elements)",
                self.elements.len()
            )));
        };
        let z = occ.z;
        if from > z || to > z || from.abs_diff(to) != 1 {
            return Err(CollideError::LogicError(format!(
                "invalid migration {from} -> {to} for z={z}"
            )));
        }
        if !delta.is_finite() {
            log::warn!("non-finite migration increment for z={z} ({from} -> {to}); ignored");
            return Ok(0.0);
        }
        if delta < 0.0 {
            return Err(CollideError::LogicError(format!(
                "negative migration increment {delta} for z={z}"
            )));
        }

        let source = occ.fractions[from as usize];
        let moved = match self.representation {
            Representation::Discrete => {
                if source < 0.5 || uniform >= delta.min(1.0) {
                    0.0
                } else {
                    source
                }
            }
            Representation::Fractional => delta.min(source),
        };
        if moved <= 0.0 {
            return Ok(0.0);
        }

        let occ = &mut self.elements[element];
        occ.fractions[from as usize] = (source - moved).max(0.0);
        occ.fractions[to as usize] += moved;
        self.renormalize();
        Ok(moved)
    }

    /// Repair fraction-sum drift and refresh cached quantities.
    /// Returns the largest drift found.
    pub fn renormalize(&mut self) -> f64 {
        let mut worst = 0.0_f64;
        for occ in &mut self.elements {
            for f in occ.fractions.iter_mut() {
                if !f.is_finite() || *f < 0.0 {
                    *f = 0.0;
                }
            }
            let sum = occ.sum();
            let drift = (sum - 1.0).abs();
            worst = worst.max(drift);
            if drift > FRACTION_WARN_TOL {
                log::warn!(
                    "occupation sum drift {drift:.3e} for z={}; renormalizing",
                    occ.z
                );
            }
            if drift > FRACTION_SILENT_TOL && sum > 0.0 {
                for f in occ.fractions.iter_mut() {
                    *f /= sum;
                }
            } else if sum <= 0.0 {
                log::warn!("empty occupation vector for z={}; resetting to neutral", occ.z);
                occ.fractions[0] = 1.0;
            }
        }
        self.refresh();
        worst
    }

    fn refresh(&mut self) {
        let inv_mu: f64 = self
            .elements
            .iter()
            .map(|e| e.mass_fraction / e.atomic_weight)
            .sum();
        self.mu = 1.0 / inv_mu;
        let mut eta = 0.0;
        for e in &mut self.elements {
            e.number_fraction = e.mass_fraction / e.atomic_weight * self.mu;
            eta += e.number_fraction * e.mean_charge();
        }
        self.eta = eta;
    }
}
