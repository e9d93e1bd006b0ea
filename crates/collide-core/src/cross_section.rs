// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Cross Section Provider
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Atomic-process cross sections consumed by the kernel.
//!
//! The kernel treats [`CrossSectionProvider`] as a read-only black box
//! shared by all workers. [`HydrogenicModel`] is a closed-form reference
//! implementation (Lotz ionization, Bethe-type excitation, Kramers
//! recombination and free-free) adequate for tests and benchmarks.

use collide_math::interp::{LossScale, LossTable};
use collide_types::constants::{ionization_potential_ev, A0_BOHR, MAX_Z, RYDBERG_EV};
use collide_types::error::CollideResult;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Electron-driven atomic processes with externally supplied cross sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicProcess {
    FreeFree,
    Excitation,
    Ionization,
    Recombination,
}

/// Target species: element and charge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesKey {
    pub z: u8,
    pub charge: u8,
}

impl SpeciesKey {
    pub fn new(z: u8, charge: u8) -> Self {
        SpeciesKey { z, charge }
    }
}

/// How the kinetic energy lost in one physical event is determined.
#[derive(Debug, Clone, Default)]
pub enum EnergyLoss {
    #[default]
    None,
    /// Fixed loss [eV], e.g. an ionization potential.
    Fixed(f64),
    /// The projectile electron's whole kinetic energy.
    ElectronEnergy,
    /// Drawn from a table; relative tables scale with the electron energy.
    Table(Arc<LossTable>),
}

impl EnergyLoss {
    /// Loss [eV] for uniform draw `u` at electron energy `energy_ev`.
    pub fn sample(&self, u: f64, energy_ev: f64) -> f64 {
        match self {
            EnergyLoss::None => 0.0,
            EnergyLoss::Fixed(e) => *e,
            EnergyLoss::ElectronEnergy => energy_ev,
            EnergyLoss::Table(t) => t.sample(u, energy_ev),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrossSection {
    /// Cross section [m²].
    pub sigma: f64,
    pub loss: EnergyLoss,
}

impl CrossSection {
    pub fn none() -> Self {
        CrossSection::default()
    }
}

/// Source of electron-impact cross sections.
///
/// Implementations must be deterministic, safe to call at `energy_ev → 0`,
/// and return non-negative values. The kernel still floors non-finite or
/// negative results to zero.
pub trait CrossSectionProvider: Send + Sync {
    fn cross_section(&self, process: AtomicProcess, species: SpeciesKey, energy_ev: f64) -> CrossSection;
}

impl<T: CrossSectionProvider + ?Sized> CrossSectionProvider for Arc<T> {
    fn cross_section(&self, process: AtomicProcess, species: SpeciesKey, energy_ev: f64) -> CrossSection {
        (**self).cross_section(process, species, energy_ev)
    }
}

/// Lotz prefactor [m² eV²].
const LOTZ_A: f64 = 4.5e-18;
/// Kramers radiative recombination prefactor [m²].
const KRAMERS_REC: f64 = 2.1e-26;
/// Kramers free-free prefactor [m²].
const KRAMERS_FF: f64 = 1.0e-27;
/// Absorption oscillator strength of the resonance line.
const OSC_STRENGTH: f64 = 0.4162;
/// Smallest photon energy, as a fraction of the electron energy.
const FF_X_MIN: f64 = 1e-3;
const FF_TABLE_NODES: usize = 32;
/// Energies below this are evaluated at this value [eV].
const MIN_ENERGY_EV: f64 = 1e-3;

/// Excitation lines as (fraction of ionization potential, branching).
const EXCITATION_LINES: [(f64, f64); 2] = [(0.75, 0.8), (0.889, 0.2)];

/// Closed-form hydrogenic cross sections for elements up to `MAX_Z`.
#[derive(Debug, Clone)]
pub struct HydrogenicModel {
    excitation: HashMap<SpeciesKey, Arc<LossTable>>,
    bremsstrahlung: Arc<LossTable>,
}

impl HydrogenicModel {
    pub fn new() -> CollideResult<Self> {
        let mut excitation = HashMap::new();
        for z in 1..=MAX_Z {
            for charge in 0..z {
                let Some(ip) = ionization_potential_ev(z, charge) else {
                    continue;
                };
                let lines: Vec<(f64, f64)> = EXCITATION_LINES.iter().map(|&(f, w)| (f * ip, w)).collect();
                excitation.insert(
                    SpeciesKey::new(z, charge),
                    Arc::new(LossTable::lines(&lines, LossScale::Absolute)?),
                );
            }
        }
        let bremsstrahlung = Arc::new(LossTable::log_uniform(
            FF_X_MIN,
            1.0,
            FF_TABLE_NODES,
            LossScale::Relative,
        )?);
        Ok(HydrogenicModel {
            excitation,
            bremsstrahlung,
        })
    }

    fn ionization(&self, s: SpeciesKey, e: f64) -> CrossSection {
        let Some(ip) = ionization_potential_ev(s.z, s.charge) else {
            return CrossSection::none();
        };
        if e <= ip {
            return CrossSection::none();
        }
        let q = outer_electrons(s.z - s.charge);
        CrossSection {
            sigma: LOTZ_A * q * (e / ip).ln() / (e * ip),
            loss: EnergyLoss::Fixed(ip),
        }
    }

    fn excitation(&self, s: SpeciesKey, e: f64) -> CrossSection {
        let (Some(ip), Some(table)) = (ionization_potential_ev(s.z, s.charge), self.excitation.get(&s)) else {
            return CrossSection::none();
        };
        let threshold = EXCITATION_LINES[0].0 * ip;
        if e <= threshold {
            return CrossSection::none();
        }
        let sigma = 4.0 * PI * A0_BOHR * A0_BOHR * OSC_STRENGTH * (RYDBERG_EV / threshold)
            * (RYDBERG_EV / e)
            * (e / threshold).ln();
        CrossSection {
            sigma,
            loss: EnergyLoss::Table(Arc::clone(table)),
        }
    }

    fn recombination(&self, s: SpeciesKey, e: f64) -> CrossSection {
        if s.charge == 0 {
            return CrossSection::none();
        }
        let Some(ip) = ionization_potential_ev(s.z, s.charge - 1) else {
            return CrossSection::none();
        };
        let e = e.max(MIN_ENERGY_EV);
        CrossSection {
            sigma: KRAMERS_REC * (ip / e) * (ip / (e + ip)),
            loss: EnergyLoss::ElectronEnergy,
        }
    }

    fn free_free(&self, s: SpeciesKey, e: f64) -> CrossSection {
        if s.charge == 0 {
            return CrossSection::none();
        }
        let e = e.max(MIN_ENERGY_EV);
        let c = s.charge as f64;
        CrossSection {
            sigma: KRAMERS_FF * c * c * (RYDBERG_EV / e) * (1.0 / FF_X_MIN).ln(),
            loss: EnergyLoss::Table(Arc::clone(&self.bremsstrahlung)),
        }
    }
}

impl CrossSectionProvider for HydrogenicModel {
    fn cross_section(&self, process: AtomicProcess, species: SpeciesKey, energy_ev: f64) -> CrossSection {
        if !energy_ev.is_finite() || energy_ev < 0.0 || species.charge > species.z {
            return CrossSection::none();
        }
        match process {
            AtomicProcess::Ionization => self.ionization(species, energy_ev),
            AtomicProcess::Excitation => self.excitation(species, energy_ev),
            AtomicProcess::Recombination => self.recombination(species, energy_ev),
            AtomicProcess::FreeFree => self.free_free(species, energy_ev),
        }
    }
}

/// Electrons in the outermost shell for `bound` bound electrons.
fn outer_electrons(bound: u8) -> f64 {
    let b = bound as f64;
    if bound <= 2 {
        b
    } else if bound <= 10 {
        b - 2.0
    } else if bound <= 28 {
        b - 10.0
    } else {
        b - 28.0
    }
}
