// ─────────────────────────────────────────────────────────────────────
// NTC Collide — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{AMU, M_ELECTRON};
use crate::error::{CollideError, CollideResult};
use crate::species::SpeciesState;
use serde::{Deserialize, Serialize};

/// Signed energy [J] a particle still owes its kinetic pools.
/// Positive: still to be removed. Negative: to be returned.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub ion: f64,
    pub electron: f64,
}

impl LedgerEntry {
    pub fn total(&self) -> f64 {
        self.ion + self.electron
    }
}

/// Weighted super-particle as handed over by the tree layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperParticle {
    pub id: u64,
    /// Number of physical atoms represented.
    pub weight: f64,
    /// Bulk (atom/ion) velocity [m/s].
    pub vel: [f64; 3],
    /// Mean electron velocity [m/s] when electrons are carried explicitly.
    pub elec_vel: Option<[f64; 3]>,
    pub species: SpeciesState,
    pub ledger: LedgerEntry,
    /// Suggested upper bound for the next timestep [s]; infinite when no
    /// inelastic event touched the particle this step.
    pub cooling_dt: f64,
}

impl SuperParticle {
    pub fn new(id: u64, weight: f64, vel: [f64; 3], species: SpeciesState) -> CollideResult<Self> {
        let p = SuperParticle {
            id,
            weight,
            vel,
            elec_vel: None,
            species,
            ledger: LedgerEntry::default(),
            cooling_dt: f64::INFINITY,
        };
        p.validate(0)?;
        Ok(p)
    }

    /// Attach an explicit electron velocity field.
    pub fn with_electrons(mut self, elec_vel: [f64; 3]) -> CollideResult<Self> {
        if elec_vel.iter().any(|v| !v.is_finite()) {
            return Err(CollideError::InvalidParticle {
                index: 0,
                message: "electron velocity must be finite".to_string(),
            });
        }
        self.elec_vel = Some(elec_vel);
        Ok(self)
    }

    /// Mass of one atom [kg].
    pub fn atom_mass(&self) -> f64 {
        self.species.mu() * AMU
    }

    /// Number of free electrons represented.
    pub fn electron_count(&self) -> f64 {
        self.species.electron_count(self.weight)
    }

    pub fn ion_kinetic_energy(&self) -> f64 {
        0.5 * self.weight * self.atom_mass() * norm_sq(&self.vel)
    }

    pub fn electron_kinetic_energy(&self) -> f64 {
        match &self.elec_vel {
            Some(ve) => 0.5 * self.electron_count() * M_ELECTRON * norm_sq(ve),
            None => 0.0,
        }
    }

    /// Total kinetic energy [J] over both velocity fields.
    pub fn kinetic_energy(&self) -> f64 {
        self.ion_kinetic_energy() + self.electron_kinetic_energy()
    }

    /// Total momentum [kg m/s] over both velocity fields.
    pub fn momentum(&self) -> [f64; 3] {
        let mi = self.weight * self.atom_mass();
        let mut p = [mi * self.vel[0], mi * self.vel[1], mi * self.vel[2]];
        if let Some(ve) = &self.elec_vel {
            let me = self.electron_count() * M_ELECTRON;
            for k in 0..3 {
                p[k] += me * ve[k];
            }
        }
        p
    }

    /// Carry the electron field across a change of the free electron
    /// count, which was `before` until the species state changed.
    ///
    /// New electrons are born at the bulk velocity, their momentum taken
    /// from the bulk; captured electrons hand their share of the field
    /// momentum to the bulk. Total momentum is unchanged. The kinetic
    /// energy change [J] is booked to the ledger (electron entry while
    /// electrons remain, ion entry otherwise) and returned.
    ///
    /// Without an electron field the electrons ride with the bulk and
    /// nothing moves.
    pub fn carry_electrons(&mut self, before: f64) -> f64 {
        let after = self.electron_count();
        let bulk = self.weight * self.species.mu() * AMU;
        let Some(ve) = self.elec_vel.as_mut() else {
            return 0.0;
        };
        let dn = after - before;
        if dn == 0.0 || !dn.is_finite() || !(bulk > 0.0) {
            return 0.0;
        }
        let e0 = 0.5 * bulk * norm_sq(&self.vel) + 0.5 * before * M_ELECTRON * norm_sq(ve);
        if dn > 0.0 {
            let shrink = 1.0 - dn * M_ELECTRON / bulk;
            for k in 0..3 {
                ve[k] = (before * ve[k] + dn * self.vel[k]) / after;
                self.vel[k] *= shrink;
            }
        } else {
            let gain = -dn * M_ELECTRON / bulk;
            for k in 0..3 {
                self.vel[k] += gain * ve[k];
            }
        }
        let e1 = 0.5 * bulk * norm_sq(&self.vel) + 0.5 * after * M_ELECTRON * norm_sq(ve);
        let de = e1 - e0;
        if after > 0.0 {
            self.ledger.electron += de;
        } else {
            self.ledger.ion += de;
        }
        de
    }

    pub fn reset_cooling(&mut self) {
        self.cooling_dt = f64::INFINITY;
    }

    /// Check weight and velocity fields; `index` is reported in the error.
    pub fn validate(&self, index: usize) -> CollideResult<()> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(CollideError::InvalidParticle {
                index,
                message: "weight must be finite and > 0".to_string(),
            });
        }
        if self.vel.iter().any(|v| !v.is_finite()) {
            return Err(CollideError::InvalidParticle {
                index,
                message: "velocity must be finite".to_string(),
            });
        }
        if let Some(ve) = &self.elec_vel {
            if ve.iter().any(|v| !v.is_finite()) {
                return Err(CollideError::InvalidParticle {
                    index,
                    message: "electron velocity must be finite".to_string(),
                });
            }
        }
        if !self.ledger.ion.is_finite() || !self.ledger.electron.is_finite() {
            return Err(CollideError::InvalidParticle {
                index,
                message: "ledger entries must be finite".to_string(),
            });
        }
        Ok(())
    }
}

/// One collision cell: the particles sharing it and its volume [m³].
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: u64,
    pub volume: f64,
    pub particles: Vec<SuperParticle>,
}

impl Cell {
    pub fn new(id: u64, volume: f64, particles: Vec<SuperParticle>) -> CollideResult<Self> {
        if !volume.is_finite() || volume <= 0.0 {
            return Err(CollideError::PhysicsViolation(format!(
                "cell {id} volume must be finite and > 0, got {volume}"
            )));
        }
        for (i, p) in particles.iter().enumerate() {
            p.validate(i)?;
        }
        Ok(Cell {
            id,
            volume,
            particles,
        })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Total physical atoms in the cell.
    pub fn total_weight(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    pub fn ledger_total(&self) -> f64 {
        self.particles.iter().map(|p| p.ledger.total()).sum()
    }

    pub fn momentum(&self) -> [f64; 3] {
        let mut total = [0.0; 3];
        for p in &self.particles {
            let m = p.momentum();
            for k in 0..3 {
                total[k] += m[k];
            }
        }
        total
    }
}

fn norm_sq(v: &[f64; 3]) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Representation;

    fn hydrogen(weight: f64, vel: [f64; 3]) -> SuperParticle {
        let s = SpeciesState::neutral(1, Representation::Fractional).unwrap();
        SuperParticle::new(7, weight, vel, s).unwrap()
    }

    #[test]
    fn test_particle_kinetic_energy() {
        let p = hydrogen(10.0, [3.0, 4.0, 0.0]);
        let m = 1.00794 * AMU;
        assert!((p.kinetic_energy() - 0.5 * 10.0 * m * 25.0).abs() < 1e-40);
        assert!(p.cooling_dt.is_infinite());
    }

    #[test]
    fn test_electron_field_counts_eta() {
        let s = SpeciesState::fractional(1, vec![0.5, 0.5]).unwrap();
        let p = SuperParticle::new(1, 4.0, [0.0; 3], s)
            .unwrap()
            .with_electrons([1.0, 0.0, 0.0])
            .unwrap();
        assert!((p.electron_count() - 2.0).abs() < 1e-15);
        assert!((p.electron_kinetic_energy() - 0.5 * 2.0 * M_ELECTRON).abs() < 1e-45);
        assert!((p.momentum()[0] - 2.0 * M_ELECTRON).abs() < 1e-45);
    }

    fn momentum_close(a: [f64; 3], b: [f64; 3], scale: f64) -> bool {
        (0..3).all(|k| (a[k] - b[k]).abs() <= 1e-12 * scale)
    }

    #[test]
    fn test_ionization_carries_field_momentum() {
        let s = SpeciesState::fractional(1, vec![0.5, 0.5]).unwrap();
        let mut p = SuperParticle::new(1, 1e10, [2e4, -1e4, 0.0], s)
            .unwrap()
            .with_electrons([3e6, 0.0, -1e6])
            .unwrap();
        let p0 = p.momentum();
        let e0 = p.kinetic_energy();
        let before = p.electron_count();
        p.species.ionize(0, 0, 0.2, 0.0).unwrap();
        let de = p.carry_electrons(before);
        assert!((p.electron_count() - 0.7e10).abs() < 1e-3);
        let scale = p.weight * p.atom_mass() * 2e4 + before * M_ELECTRON * 3e6;
        assert!(momentum_close(p.momentum(), p0, scale));
        assert!(((p.kinetic_energy() - e0) - de).abs() < 1e-12 * e0);
        assert_eq!(p.ledger.electron, de);
        assert_eq!(p.ledger.ion, 0.0);
        // new electrons share the bulk velocity, so the field slows down
        assert!(de < 0.0);
    }

    #[test]
    fn test_full_recombination_hands_momentum_to_bulk() {
        let s = SpeciesState::fractional(1, vec![0.0, 1.0]).unwrap();
        let mut p = SuperParticle::new(2, 1e8, [0.0; 3], s)
            .unwrap()
            .with_electrons([1e6, 0.0, 0.0])
            .unwrap();
        let p0 = p.momentum();
        let e0 = p.kinetic_energy();
        let before = p.electron_count();
        p.species.recombine(0, 1, 1.0, 0.0).unwrap();
        let de = p.carry_electrons(before);
        assert_eq!(p.electron_count(), 0.0);
        assert!(momentum_close(p.momentum(), p0, before * M_ELECTRON * 1e6));
        assert!(p.vel[0] > 0.0);
        // all of the field energy left the pools and is owed back
        assert!(de < 0.0);
        assert_eq!(p.ledger.ion, de);
        assert_eq!(p.ledger.electron, 0.0);
        assert!((p.kinetic_energy() - (e0 + de)).abs() < 1e-12 * e0);
    }

    #[test]
    fn test_first_electrons_start_at_bulk_velocity() {
        let s = SpeciesState::neutral(1, Representation::Fractional).unwrap();
        let mut p = SuperParticle::new(3, 1e6, [5e3, 0.0, 0.0], s)
            .unwrap()
            .with_electrons([0.0; 3])
            .unwrap();
        let p0 = p.momentum();
        p.species.ionize(0, 0, 0.5, 0.0).unwrap();
        p.carry_electrons(0.0);
        let ve = p.elec_vel.unwrap();
        assert!((ve[0] - 5e3).abs() < 1e-9);
        assert!(p.vel[0] < 5e3);
        assert!(momentum_close(p.momentum(), p0, p0[0]));
    }

    #[test]
    fn test_carry_without_field_is_noop() {
        let s = SpeciesState::fractional(1, vec![0.5, 0.5]).unwrap();
        let mut p = SuperParticle::new(4, 10.0, [1.0, 0.0, 0.0], s).unwrap();
        let before = p.electron_count();
        p.species.ionize(0, 0, 0.5, 0.0).unwrap();
        assert_eq!(p.carry_electrons(before), 0.0);
        assert_eq!(p.vel, [1.0, 0.0, 0.0]);
        assert_eq!(p.ledger, LedgerEntry::default());
    }

    #[test]
    fn test_invalid_particles_rejected() {
        let s = SpeciesState::neutral(1, Representation::Discrete).unwrap();
        assert!(SuperParticle::new(0, 0.0, [0.0; 3], s.clone()).is_err());
        assert!(SuperParticle::new(0, 1.0, [f64::NAN, 0.0, 0.0], s.clone()).is_err());
        let p = SuperParticle::new(0, 1.0, [0.0; 3], s).unwrap();
        assert!(p.with_electrons([f64::INFINITY, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_cell_validation_reports_index() {
        let mut bad = hydrogen(1.0, [0.0; 3]);
        bad.weight = -1.0;
        let err = Cell::new(3, 1.0, vec![hydrogen(1.0, [0.0; 3]), bad]).unwrap_err();
        match err {
            CollideError::InvalidParticle { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error {other}"),
        }
        assert!(Cell::new(3, 0.0, vec![]).is_err());
    }

    #[test]
    fn test_cell_totals() {
        let cell = Cell::new(
            1,
            2.0,
            vec![hydrogen(1.0, [1.0, 0.0, 0.0]), hydrogen(3.0, [-1.0, 0.0, 0.0])],
        )
        .unwrap();
        assert_eq!(cell.len(), 2);
        assert!((cell.total_weight() - 4.0).abs() < 1e-15);
        let m = 1.00794 * AMU;
        assert!((cell.momentum()[0] + 2.0 * m).abs() < 1e-40);
        assert_eq!(cell.ledger_total(), 0.0);
    }
}
