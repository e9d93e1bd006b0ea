// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Pair Cross-Section Table
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Channel enumeration for one candidate pair.
//!
//! Every (element, charge) combination of the two occupation vectors
//! contributes channels weighted by its population product, so a
//! fractional particle exposes all its charge states at once. Channels
//! are grouped into the three [`ChannelClass`]es used for NTC throttling.

use crate::channel::{Channel, ChannelBuffer, ChannelClass, InteractionKind, Participant, Side};
use crate::cross_section::{AtomicProcess, CrossSectionProvider, SpeciesKey};
use collide_math::vector::{norm, norm_sq, sub, weighted_mean, Vec3};
use collide_types::config::{CoulombCutoff, ElectronModel, KernelConfig};
use collide_types::constants::{atomic_radius, AMU, EPS0, EV_TO_J, K_BOLTZMANN, M_ELECTRON, Q_ELECTRON};
use collide_types::state::{Cell, SuperParticle};
use std::f64::consts::PI;

/// Occupation products below this are skipped.
const POPULATION_FLOOR: f64 = 1e-12;

/// Plasma parameters of one cell, derived once per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPlasma {
    /// Atoms per m³.
    pub atom_density: f64,
    /// Free electrons per m³.
    pub electron_density: f64,
    /// From the mass-weighted bulk velocity dispersion [K].
    pub ion_temperature: f64,
    /// From the electron velocity dispersion, or the ion temperature
    /// when electrons are implicit [K].
    pub electron_temperature: f64,
    /// Electron Debye length [m]; `None` without electrons or temperature.
    pub debye_length: Option<f64>,
    /// Mean interparticle spacing `n^(-1/3)` [m].
    pub spacing: f64,
}

impl CellPlasma {
    pub fn from_cell(cell: &Cell, electrons: ElectronModel) -> Self {
        let volume = cell.volume;
        let total_w: f64 = cell.particles.iter().map(|p| p.weight).sum();
        let total_ne: f64 = cell.particles.iter().map(|p| p.electron_count()).sum();
        let atom_density = total_w / volume;
        let electron_density = total_ne / volume;

        let ion_temperature = dispersion_temperature(
            cell.particles.iter().map(|p| (p.weight, p.atom_mass(), p.vel)),
        );
        let electron_temperature = match electrons {
            ElectronModel::Implicit => ion_temperature,
            ElectronModel::Explicit => dispersion_temperature(
                cell.particles
                    .iter()
                    .filter_map(|p| p.elec_vel.map(|ve| (p.electron_count(), M_ELECTRON, ve))),
            ),
        };

        let debye_length = if electron_density > 0.0 && electron_temperature > 0.0 {
            let l = (EPS0 * K_BOLTZMANN * electron_temperature / (electron_density * Q_ELECTRON * Q_ELECTRON)).sqrt();
            l.is_finite().then_some(l)
        } else {
            None
        };
        let spacing = if atom_density > 0.0 {
            atom_density.powf(-1.0 / 3.0)
        } else {
            volume.cbrt()
        };

        CellPlasma {
            atom_density,
            electron_density,
            ion_temperature,
            electron_temperature,
            debye_length,
            spacing,
        }
    }

    /// Maximum impact parameter for Coulomb channels [m].
    pub fn screening_length(&self, cutoff: CoulombCutoff) -> f64 {
        match cutoff {
            CoulombCutoff::Debye => self.debye_length.unwrap_or(self.spacing),
            CoulombCutoff::InterparticleSpacing => self.spacing,
        }
    }
}

/// `Σ w·m·|v − v̄|² / (3 k Σ w)` with the mass-weighted mean `v̄`.
fn dispersion_temperature(samples: impl Iterator<Item = (f64, f64, Vec3)> + Clone) -> f64 {
    let mut wm = 0.0;
    let mut w_tot = 0.0;
    let mut mean: Vec3 = [0.0; 3];
    for (w, m, v) in samples.clone() {
        mean = weighted_mean(wm, &mean, w * m, &v);
        wm += w * m;
        w_tot += w;
    }
    if w_tot <= 0.0 {
        return 0.0;
    }
    let sum: f64 = samples.map(|(w, m, v)| w * m * norm_sq(&sub(&v, &mean))).sum();
    let t = sum / (3.0 * K_BOLTZMANN * w_tot);
    if t.is_finite() {
        t
    } else {
        0.0
    }
}

/// Σ σ·v per channel class for one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassTotals {
    pub sigma_v: [f64; 3],
}

impl ClassTotals {
    pub fn get(&self, class: ChannelClass) -> f64 {
        self.sigma_v[class.index()]
    }

    pub fn total(&self) -> f64 {
        self.sigma_v.iter().sum()
    }
}

/// Coulomb momentum-transfer cross section and its impact parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoulombCrossSection {
    pub sigma: f64,
    pub b90: f64,
    pub b_max: f64,
}

/// Builds the channel list of a candidate pair inside one cell.
pub struct PairCrossSectionTable<'a, P: CrossSectionProvider + ?Sized> {
    provider: &'a P,
    config: &'a KernelConfig,
    plasma: &'a CellPlasma,
}

impl<'a, P: CrossSectionProvider + ?Sized> PairCrossSectionTable<'a, P> {
    pub fn new(provider: &'a P, config: &'a KernelConfig, plasma: &'a CellPlasma) -> Self {
        PairCrossSectionTable {
            provider,
            config,
            plasma,
        }
    }

    /// Build all three classes into `buf` and return their totals.
    pub fn build(&self, a: &SuperParticle, b: &SuperParticle, buf: &mut ChannelBuffer, repairs: &mut u64) -> ClassTotals {
        buf.clear();
        let mut totals = ClassTotals::default();
        for class in ChannelClass::ALL {
            let before = buf.len();
            self.push_class(a, b, class, buf, repairs);
            totals.sigma_v[class.index()] = buf.channels()[before..].iter().map(Channel::sigma_v).sum();
        }
        totals
    }

    /// Build only `class` into `buf` and return its Σ σ·v.
    pub fn build_class(
        &self,
        a: &SuperParticle,
        b: &SuperParticle,
        class: ChannelClass,
        buf: &mut ChannelBuffer,
        repairs: &mut u64,
    ) -> f64 {
        buf.clear();
        self.push_class(a, b, class, buf, repairs);
        buf.total_sigma_v()
    }

    fn push_class(
        &self,
        a: &SuperParticle,
        b: &SuperParticle,
        class: ChannelClass,
        buf: &mut ChannelBuffer,
        repairs: &mut u64,
    ) {
        match class {
            ChannelClass::Heavy => self.push_heavy(a, b, buf, repairs),
            ChannelClass::ElectronFrom1 => {
                self.push_electron(a, Side::First, b, buf, repairs);
                self.push_electron_electron(a, b, buf, repairs);
            }
            ChannelClass::ElectronFrom2 => self.push_electron(b, Side::Second, a, buf, repairs),
        }
    }

    /// `4π b90² lnΛ` capped at `π b_max²`, for charges `z1·z2` at
    /// centre-of-mass energy `energy_j`.
    pub fn coulomb(&self, z1z2: f64, energy_j: f64) -> CoulombCrossSection {
        let b_max = self.plasma.screening_length(self.config.coulomb.cutoff);
        let cap = PI * b_max * b_max;
        if energy_j <= 0.0 || z1z2 <= 0.0 {
            return CoulombCrossSection {
                sigma: if z1z2 > 0.0 { cap } else { 0.0 },
                b90: b_max,
                b_max,
            };
        }
        let b90 = z1z2 * Q_ELECTRON * Q_ELECTRON / (8.0 * PI * EPS0 * energy_j);
        let ln_lambda = (b_max / b90).ln().max(self.config.coulomb.min_log);
        let sigma = (4.0 * PI * b90 * b90 * ln_lambda).min(cap);
        CoulombCrossSection { sigma, b90, b_max }
    }

    fn push_heavy(&self, a: &SuperParticle, b: &SuperParticle, buf: &mut ChannelBuffer, repairs: &mut u64) {
        let speed = norm(&sub(&a.vel, &b.vel));
        let scale = self.config.elastic.neutral_scale;
        for (ia, ea) in a.species.elements().iter().enumerate() {
            let ma = ea.atomic_weight() * AMU;
            for (ib, eb) in b.species.elements().iter().enumerate() {
                let mb = eb.atomic_weight() * AMU;
                let mu = ma * mb / (ma + mb);
                let energy_j = 0.5 * mu * speed * speed;
                for (ca, fa) in ea.fractions().iter().enumerate() {
                    let pa = ea.number_fraction() * fa;
                    if pa < POPULATION_FLOOR {
                        continue;
                    }
                    for (cb, fb) in eb.fractions().iter().enumerate() {
                        let w = pa * eb.number_fraction() * fb;
                        if w < POPULATION_FLOOR {
                            continue;
                        }
                        let (ca, cb) = (ca as u8, cb as u8);
                        let projectile = Participant::heavy(Side::First, ia, ea.z(), ca);
                        let target = Participant::heavy(Side::Second, ib, eb.z(), cb);
                        let (kind, sigma) = if ca > 0 && cb > 0 {
                            let c = self.coulomb(ca as f64 * cb as f64, energy_j);
                            (
                                InteractionKind::Coulomb {
                                    b90: c.b90,
                                    b_max: c.b_max,
                                },
                                c.sigma,
                            )
                        } else {
                            let r = atomic_radius(ea.z(), ca) + atomic_radius(eb.z(), cb);
                            (InteractionKind::Elastic, scale * PI * r * r)
                        };
                        let sigma = floor_value(sigma, "heavy cross section", repairs);
                        if sigma > 0.0 {
                            buf.push(Channel {
                                kind,
                                class: ChannelClass::Heavy,
                                projectile,
                                target,
                                sigma: w * sigma,
                                speed,
                                energy_ev: energy_j / EV_TO_J,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Relative speed and centre-of-mass energy for an electron of
    /// `donor` hitting the bulk of `target` with atom mass `m_atom`.
    fn electron_kinematics(&self, donor: &SuperParticle, target: &SuperParticle, m_atom: f64) -> (f64, f64) {
        match (self.config.electrons, donor.elec_vel) {
            (ElectronModel::Explicit, Some(ve)) => {
                let speed = norm(&sub(&ve, &target.vel));
                let mu = M_ELECTRON * m_atom / (M_ELECTRON + m_atom);
                (speed, 0.5 * mu * speed * speed)
            }
            _ => heavy_kinematics(donor, target),
        }
    }

    fn push_electron(
        &self,
        donor: &SuperParticle,
        donor_side: Side,
        target: &SuperParticle,
        buf: &mut ChannelBuffer,
        repairs: &mut u64,
    ) {
        let eta = donor.species.eta();
        if eta <= 0.0 {
            return;
        }
        let class = match donor_side {
            Side::First => ChannelClass::ElectronFrom1,
            Side::Second => ChannelClass::ElectronFrom2,
        };
        let projectile = Participant::electron(donor_side);
        let target_side = donor_side.other();
        let e_scale = self.config.elastic.electron_scale;

        for (ie, el) in target.species.elements().iter().enumerate() {
            let (speed, energy_j) = self.electron_kinematics(donor, target, el.atomic_weight() * AMU);
            let energy_ev = energy_j / EV_TO_J;
            let z = el.z();
            for (c, f) in el.fractions().iter().enumerate() {
                let w = eta * el.number_fraction() * f;
                if w < POPULATION_FLOOR {
                    continue;
                }
                let c = c as u8;
                let tgt = Participant::heavy(target_side, ie, z, c);
                let key = SpeciesKey::new(z, c);
                let mut push = |kind: InteractionKind, sigma: f64| {
                    let sigma = floor_value(sigma, "electron cross section", &mut *repairs);
                    if sigma > 0.0 {
                        buf.push(Channel {
                            kind,
                            class,
                            projectile,
                            target: tgt,
                            sigma: w * sigma,
                            speed,
                            energy_ev,
                        });
                    }
                };

                if c == 0 {
                    let r = atomic_radius(z, 0);
                    push(InteractionKind::Elastic, e_scale * PI * r * r);
                } else {
                    let cc = self.coulomb(c as f64, energy_j);
                    push(
                        InteractionKind::Coulomb {
                            b90: cc.b90,
                            b_max: cc.b_max,
                        },
                        cc.sigma,
                    );
                    let ff = self.provider.cross_section(AtomicProcess::FreeFree, key, energy_ev);
                    push(InteractionKind::FreeFree { loss: ff.loss }, ff.sigma);
                    let rr = self.provider.cross_section(AtomicProcess::Recombination, key, energy_ev);
                    push(InteractionKind::Recombination { loss: rr.loss }, rr.sigma);
                }
                if c < z {
                    let ion = self.provider.cross_section(AtomicProcess::Ionization, key, energy_ev);
                    push(InteractionKind::Ionization { loss: ion.loss }, ion.sigma);
                    let exc = self.provider.cross_section(AtomicProcess::Excitation, key, energy_ev);
                    push(InteractionKind::Excitation { loss: exc.loss }, exc.sigma);
                }
            }
        }
    }

    fn push_electron_electron(&self, a: &SuperParticle, b: &SuperParticle, buf: &mut ChannelBuffer, repairs: &mut u64) {
        let w = a.species.eta() * b.species.eta();
        if w < POPULATION_FLOOR {
            return;
        }
        let (speed, energy_j) = match (self.config.electrons, a.elec_vel, b.elec_vel) {
            (ElectronModel::Explicit, Some(va), Some(vb)) => {
                let speed = norm(&sub(&va, &vb));
                (speed, 0.25 * M_ELECTRON * speed * speed)
            }
            _ => heavy_kinematics(a, b),
        };
        let c = self.coulomb(1.0, energy_j);
        let sigma = floor_value(c.sigma, "electron-electron cross section", repairs);
        if sigma > 0.0 {
            buf.push(Channel {
                kind: InteractionKind::Coulomb {
                    b90: c.b90,
                    b_max: c.b_max,
                },
                class: ChannelClass::ElectronFrom1,
                projectile: Participant::electron(Side::First),
                target: Participant::electron(Side::Second),
                sigma: w * sigma,
                speed,
                energy_ev: energy_j / EV_TO_J,
            });
        }
    }
}

/// Bulk relative speed and centre-of-mass energy per atom pair.
fn heavy_kinematics(a: &SuperParticle, b: &SuperParticle) -> (f64, f64) {
    let speed = norm(&sub(&a.vel, &b.vel));
    let (ma, mb) = (a.atom_mass(), b.atom_mass());
    (speed, 0.5 * ma * mb / (ma + mb) * speed * speed)
}

/// Replace non-finite values by zero (counted and logged) and clamp
/// negatives to zero.
pub fn floor_value(x: f64, what: &str, repairs: &mut u64) -> f64 {
    if !x.is_finite() {
        *repairs += 1;
        log::warn!("non-finite {what} ({x}) replaced by zero");
        return 0.0;
    }
    x.max(0.0)
}
