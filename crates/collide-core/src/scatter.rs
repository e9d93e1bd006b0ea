// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Scatter Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Two-body velocity update under asymmetric statistical weights.
//!
//! With `W1 ≥ W2` and `q = W2/W1`, a full two-body scatter produces
//! `v1' = vcm + (m2/M)·u'` and `v2' = vcm − (m1/M)·u'`. Only a fraction
//! `q` of the heavier super-particle takes part, so its outgoing velocity
//! is the blend `(1−q)·v1 + q·v1'` while the lighter one is replaced
//! outright. The blend conserves momentum exactly but removes an extra
//! `δ = ½·W2·m1·(1−q)·|v1' − v1|²` of kinetic energy.
//!
//! In exact mode the scale `s` of the rotated relative vector `g` is
//! solved from `E(s) = α s² + β s + γ = E_target`, which absorbs `δ`.
//! Otherwise `s` is the plain `sqrt((kE − ΔE)/kE)` factor and `δ` is
//! recorded as `ke_delta` and owed back through the ledger.

use crate::ledger::{EnergyLedger, Field};
use collide_math::vector::{add, axpy, dot, is_finite, norm, norm_sq, rotate, scale, sub, Vec3};
use collide_types::error::{CollideError, CollideResult};
use collide_types::state::LedgerEntry;
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};
use std::f64::consts::TAU;

/// One velocity field taking part in a scatter.
pub struct ScatterBody<'a> {
    pub vel: &'a mut Vec3,
    /// Physical members represented by this field.
    pub weight: f64,
    /// Mass of one member [kg].
    pub mass: f64,
    pub ledger: &'a mut LedgerEntry,
    pub field: Field,
}

impl ScatterBody<'_> {
    fn kinetic_energy(&self) -> f64 {
        0.5 * self.weight * self.mass * norm_sq(self.vel)
    }
}

/// Post-collision direction policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScatterAngle {
    Isotropic,
    /// Unscreened Rutherford with impact parameter uniform in `π b_max²`.
    Rutherford { b90: f64, b_max: f64 },
}

impl ScatterAngle {
    /// New relative vector of magnitude `magnitude` deflected from `u`.
    fn deflect<R: Rng + ?Sized>(&self, u: &Vec3, magnitude: f64, rng: &mut R) -> Vec3 {
        let um = norm(u);
        match *self {
            ScatterAngle::Rutherford { b90, b_max }
                if um > 0.0 && b90 > 0.0 && b_max > 0.0 && b90.is_finite() && b_max.is_finite() =>
            {
                let b = b_max * rng.gen::<f64>().sqrt();
                let t2 = (b / b90) * (b / b90);
                let cos_chi = (t2 - 1.0) / (t2 + 1.0);
                let r = rotate(u, cos_chi, TAU * rng.gen::<f64>());
                scale(magnitude / um, &r)
            }
            _ => {
                let d: [f64; 3] = UnitSphere.sample(rng);
                scale(magnitude, &d)
            }
        }
    }
}

/// Result of one scatter call. Energies in J.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScatterOutcome {
    pub kinetic_before: f64,
    pub kinetic_after: f64,
    /// Centre-of-mass energy available to the pair, `½·W2·μ·|u|²`.
    pub available: f64,
    /// Energy taken out of the two ledgers before the scatter.
    pub drained: f64,
    /// Requested loss plus drained ledger energy.
    pub requested: f64,
    /// Positive energy left in the ledgers for later.
    pub deferred: f64,
    /// Blend residual owed back (non-exact mode only).
    pub ke_delta: f64,
    /// `sqrt((kE − ΔE)/kE)`, or 0 when the request exceeds `kE`.
    pub vfac: f64,
    /// The bodies were swapped so that the first is the heavier.
    pub swapped: bool,
}

impl ScatterOutcome {
    /// Kinetic energy actually removed [J].
    pub fn removed(&self) -> f64 {
        self.kinetic_before - self.kinetic_after
    }

    /// Net change of the two touched ledger entries.
    pub fn ledger_change(&self) -> f64 {
        self.deferred - self.ke_delta - self.drained
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterEngine {
    exact: bool,
}

impl ScatterEngine {
    pub fn new(exact_energy: bool) -> Self {
        ScatterEngine {
            exact: exact_energy,
        }
    }

    /// Scatter two velocity fields, removing `delta_e` [J] of kinetic energy.
    ///
    /// Momentum `Σ W·m·v` is conserved exactly. Energy that cannot be
    /// removed now is deposited into the two ledger entries; a negative
    /// `delta_e` is a caller defect.
    pub fn scatter<R: Rng + ?Sized>(
        &self,
        a: ScatterBody<'_>,
        b: ScatterBody<'_>,
        delta_e: f64,
        angle: ScatterAngle,
        rng: &mut R,
    ) -> CollideResult<ScatterOutcome> {
        if delta_e < 0.0 {
            return Err(CollideError::LogicError(format!(
                "negative energy loss requested from scatter: {delta_e:e} J"
            )));
        }
        let delta_e = if delta_e.is_finite() {
            delta_e
        } else {
            log::warn!("non-finite scatter energy loss replaced by zero");
            0.0
        };
        for body in [&a, &b] {
            if !(body.weight.is_finite() && body.weight > 0.0 && body.mass.is_finite() && body.mass > 0.0) {
                return Err(CollideError::LogicError(format!(
                    "scatter body needs positive weight and mass, got W={} m={}",
                    body.weight, body.mass
                )));
            }
        }

        let swapped = b.weight > a.weight;
        let (b1, b2) = if swapped { (b, a) } else { (a, b) };
        let (w1, m1, w2, m2) = (b1.weight, b1.mass, b2.weight, b2.mass);
        let v1 = *b1.vel;
        let v2 = *b2.vel;
        let kinetic_before = b1.kinetic_energy() + b2.kinetic_energy();

        let drained = EnergyLedger::drain(b1.ledger, b1.field) + EnergyLedger::drain(b2.ledger, b2.field);
        let requested = delta_e + drained;

        let q = w2 / w1;
        let m_tot = m1 + m2;
        let mu = m1 * m2 / m_tot;
        let vcm = scale(1.0 / m_tot, &add(&scale(m1, &v1), &scale(m2, &v2)));
        let u = sub(&v1, &v2);
        let available = 0.5 * w2 * mu * norm_sq(&u);

        let removable = requested.min(available);
        let shortfall = requested - removable;
        let k_target = available - removable;
        let vfac = if available > 0.0 {
            (k_target / available).sqrt()
        } else {
            0.0
        };

        let mut outcome = ScatterOutcome {
            kinetic_before,
            kinetic_after: kinetic_before,
            available,
            drained,
            requested,
            deferred: 0.0,
            ke_delta: 0.0,
            vfac,
            swapped,
        };

        let g_mag = if available > 0.0 {
            norm(&u)
        } else {
            (2.0 * k_target / (w2 * mu)).sqrt()
        };
        if !(g_mag > 0.0 && g_mag.is_finite()) {
            // Nothing to rotate: the whole request waits in the ledgers
            Self::defer(b1.ledger, b1.field, b2.ledger, b2.field, requested, m1, m2);
            outcome.deferred = requested;
            return Ok(outcome);
        }

        let g = angle.deflect(&u, g_mag, rng);
        let ca = m2 / m_tot;
        let cb = m1 / m_tot;
        let a_vec = axpy(1.0 - q, &v1, &scale(q, &vcm));

        let mut extra = 0.0;
        let s = if self.exact {
            let alpha = 0.5 * norm_sq(&g) * (w1 * m1 * q * q * ca * ca + w2 * m2 * cb * cb);
            let beta = w1 * m1 * q * ca * dot(&a_vec, &g) - w2 * m2 * cb * dot(&vcm, &g);
            let gamma = 0.5 * w1 * m1 * norm_sq(&a_vec) + 0.5 * w2 * m2 * norm_sq(&vcm);
            let target = kinetic_before - removable;
            let c = gamma - target;
            let disc = beta * beta - 4.0 * alpha * c;
            if disc >= 0.0 {
                let sq = disc.sqrt();
                if beta <= 0.0 {
                    (-beta + sq) / (2.0 * alpha)
                } else {
                    2.0 * c / (-beta - sq)
                }
            } else {
                let s0 = -beta / (2.0 * alpha);
                let e_min = alpha * s0 * s0 + beta * s0 + gamma;
                extra = (e_min - target).max(0.0);
                log::debug!("blend cannot reach target energy; deferring {extra:e} J");
                s0
            }
        } else if available > 0.0 {
            vfac
        } else {
            // g already carries the magnitude of the returned energy
            1.0
        };

        let new_v1 = axpy(q * ca * s, &g, &a_vec);
        let new_v2 = axpy(-cb * s, &g, &vcm);
        if !is_finite(&new_v1) || !is_finite(&new_v2) {
            log::warn!("non-finite post-scatter velocity; pair left unchanged");
            Self::defer(b1.ledger, b1.field, b2.ledger, b2.field, requested, m1, m2);
            outcome.deferred = requested;
            return Ok(outcome);
        }

        if !self.exact {
            let full_v1 = axpy(ca * s, &g, &vcm);
            let dv = sub(&full_v1, &v1);
            let delta = 0.5 * w2 * m1 * (1.0 - q) * norm_sq(&dv);
            EnergyLedger::deposit(b1.ledger, b1.field, -delta);
            outcome.ke_delta = delta;
        }

        let owed = shortfall + extra;
        if owed != 0.0 {
            Self::defer(b1.ledger, b1.field, b2.ledger, b2.field, owed, m1, m2);
            log::debug!("deferred {owed:e} J to ledgers (kE = {available:e} J)");
        }
        outcome.deferred = owed;

        *b1.vel = new_v1;
        *b2.vel = new_v2;
        outcome.kinetic_after = b1.kinetic_energy() + b2.kinetic_energy();
        Ok(outcome)
    }

    fn defer(
        l1: &mut LedgerEntry,
        f1: Field,
        l2: &mut LedgerEntry,
        f2: Field,
        amount: f64,
        m1: f64,
        m2: f64,
    ) {
        let (d1, d2) = EnergyLedger::split(amount, m1, m2);
        EnergyLedger::deposit(l1, f1, d1);
        EnergyLedger::deposit(l2, f2, d2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collide_types::constants::{AMU, M_ELECTRON};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Field2 {
        v: Vec3,
        w: f64,
        m: f64,
        l: LedgerEntry,
    }

    impl Field2 {
        fn new(v: Vec3, w: f64, m: f64) -> Self {
            Field2 {
                v,
                w,
                m,
                l: LedgerEntry::default(),
            }
        }
        fn body(&mut self) -> ScatterBody<'_> {
            ScatterBody {
                vel: &mut self.v,
                weight: self.w,
                mass: self.m,
                ledger: &mut self.l,
                field: Field::Ion,
            }
        }
        fn momentum(&self) -> Vec3 {
            scale(self.w * self.m, &self.v)
        }
        fn energy(&self) -> f64 {
            0.5 * self.w * self.m * norm_sq(&self.v)
        }
    }

    fn run(
        engine: ScatterEngine,
        a: &mut Field2,
        b: &mut Field2,
        de: f64,
        seed: u64,
    ) -> ScatterOutcome {
        let mut rng = StdRng::seed_from_u64(seed);
        engine
            .scatter(a.body(), b.body(), de, ScatterAngle::Isotropic, &mut rng)
            .unwrap()
    }

    #[test]
    fn test_equal_weight_elastic_preserves_speed() {
        let m = AMU;
        let mut a = Field2::new([1000.0, 0.0, 0.0], 1.0, m);
        let mut b = Field2::new([-1000.0, 0.0, 0.0], 1.0, m);
        let out = run(ScatterEngine::new(true), &mut a, &mut b, 0.0, 3);
        let g = norm(&sub(&a.v, &b.v));
        assert!((g - 2000.0).abs() < 1e-9 * 2000.0);
        assert!((out.removed()).abs() < 1e-12 * out.kinetic_before);
        assert!((out.vfac - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_momentum_and_exact_energy_with_unequal_weights() {
        let mut a = Field2::new([3e4, -1e4, 2e3], 50.0, 4.0 * AMU);
        let mut b = Field2::new([-2e4, 5e3, 0.0], 3.0, AMU);
        let p0 = add(&a.momentum(), &b.momentum());
        let e0 = a.energy() + b.energy();
        let out = run(ScatterEngine::new(true), &mut a, &mut b, 0.2 * e0 * 0.01, 11);
        assert!(out.available > 0.2 * e0 * 0.01);
        let p1 = add(&a.momentum(), &b.momentum());
        for k in 0..3 {
            assert!((p1[k] - p0[k]).abs() <= 1e-12 * norm(&p0).max(1e-30));
        }
        let e1 = a.energy() + b.energy();
        assert!(((e0 - 0.002 * e0) - e1).abs() < 1e-9 * e0);
        assert_eq!(a.l.total() + b.l.total(), 0.0);
    }

    #[test]
    fn test_elastic_idempotent_for_any_q() {
        for (i, &w2) in [1.0, 0.5, 0.1, 1e-3].iter().enumerate() {
            let mut a = Field2::new([500.0, 200.0, -100.0], 1.0, 12.0 * AMU);
            let mut b = Field2::new([-300.0, 0.0, 700.0], w2, AMU);
            let e0 = a.energy() + b.energy();
            run(ScatterEngine::new(true), &mut a, &mut b, 0.0, i as u64);
            let e1 = a.energy() + b.energy();
            assert!((e1 - e0).abs() < 1e-10 * e0, "q={w2}: {e0} -> {e1}");
        }
    }

    #[test]
    fn test_shortfall_goes_to_ledger() {
        let mut a = Field2::new([100.0, 0.0, 0.0], 2.0, AMU);
        let mut b = Field2::new([0.0, 0.0, 0.0], 2.0, AMU);
        let e0 = a.energy() + b.energy();
        let k_e = 0.5 * 2.0 * 0.5 * AMU * 100.0 * 100.0;
        let de = 3.0 * k_e;
        let out = run(ScatterEngine::new(true), &mut a, &mut b, de, 5);
        assert!((out.available - k_e).abs() < 1e-12 * k_e);
        assert_eq!(out.vfac, 0.0);
        let ledger = a.l.total() + b.l.total();
        assert!((ledger - (de - k_e)).abs() < 1e-9 * de);
        let e1 = a.energy() + b.energy();
        assert!((e0 - e1 - k_e).abs() < 1e-9 * e0);
        // Equal weights: both leave at the centre-of-mass velocity
        assert!((a.v[0] - 50.0).abs() < 1e-4 && (b.v[0] - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_ledger_is_drained_into_next_request() {
        let mut a = Field2::new([100.0, 0.0, 0.0], 1.0, AMU);
        let mut b = Field2::new([-100.0, 0.0, 0.0], 1.0, AMU);
        a.l.ion = 1e-24;
        let e0 = a.energy() + b.energy();
        let out = run(ScatterEngine::new(true), &mut a, &mut b, 0.0, 9);
        assert!((out.drained - 1e-24).abs() < 1e-40);
        assert_eq!(a.l.ion, 0.0);
        let e1 = a.energy() + b.energy();
        assert!((e0 - e1 - 1e-24).abs() < 1e-9 * e0);
    }

    #[test]
    fn test_negative_ledger_returns_energy() {
        let mut a = Field2::new([10.0, 0.0, 0.0], 1.0, AMU);
        let mut b = Field2::new([10.0, 0.0, 0.0], 1.0, AMU);
        let give = 1e-24;
        b.l.ion = -give;
        let e0 = a.energy() + b.energy();
        let p0 = add(&a.momentum(), &b.momentum());
        let out = run(ScatterEngine::new(true), &mut a, &mut b, 0.0, 2);
        assert_eq!(out.available, 0.0);
        let e1 = a.energy() + b.energy();
        assert!((e1 - e0 - give).abs() < 1e-9 * give.max(e0));
        let p1 = add(&a.momentum(), &b.momentum());
        assert!((p1[0] - p0[0]).abs() < 1e-12 * p0[0]);
        assert_eq!(a.l.total() + b.l.total(), 0.0);
    }

    #[test]
    fn test_zero_relative_speed_defers_everything() {
        let mut a = Field2::new([10.0, 0.0, 0.0], 1.0, AMU);
        let mut b = Field2::new([10.0, 0.0, 0.0], 1.0, AMU);
        let out = run(ScatterEngine::new(true), &mut a, &mut b, 1e-20, 4);
        assert_eq!(out.removed(), 0.0);
        assert!((a.l.total() + b.l.total() - 1e-20).abs() < 1e-35);
        assert_eq!(a.v, [10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_negative_request_is_fatal() {
        let mut a = Field2::new([1.0, 0.0, 0.0], 1.0, AMU);
        let mut b = Field2::new([0.0; 3], 1.0, AMU);
        let mut rng = StdRng::seed_from_u64(0);
        let err = ScatterEngine::new(true)
            .scatter(a.body(), b.body(), -1.0, ScatterAngle::Isotropic, &mut rng)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_exact_records_blend_residual() {
        let mut a = Field2::new([2e3, 0.0, 0.0], 100.0, AMU);
        let mut b = Field2::new([-2e3, 1e3, 0.0], 1.0, AMU);
        let e0 = a.energy() + b.energy();
        let de = 1e-3 * e0;
        let out = run(ScatterEngine::new(false), &mut a, &mut b, de, 8);
        assert!(out.ke_delta > 0.0);
        let ledger = a.l.total() + b.l.total();
        assert!((ledger + out.ke_delta).abs() < 1e-12 * e0);
        // Ledger change plus removed energy equals the request
        let e1 = a.energy() + b.energy();
        assert!(((e0 - e1) + ledger - de).abs() < 1e-9 * e0);
    }

    #[test]
    fn test_swaps_to_heavier_first() {
        let mut light = Field2::new([0.0, 0.0, 1e6], 1.0, M_ELECTRON);
        let mut heavy = Field2::new([0.0; 3], 1e3, AMU);
        let out = run(ScatterEngine::new(true), &mut light, &mut heavy, 0.0, 1);
        assert!(out.swapped);
        // The heavy field barely moves while the electron is fully redirected
        assert!(norm(&heavy.v) < 2.0);
        assert!((norm(&light.v) - 1e6).abs() < 1e3);
    }

    #[test]
    fn test_rutherford_small_angles_dominate() {
        let u = [1.0, 0.0, 0.0];
        let angle = ScatterAngle::Rutherford { b90: 1e-3, b_max: 1.0 };
        let mut rng = StdRng::seed_from_u64(42);
        let mut forward = 0;
        for _ in 0..1000 {
            let g = angle.deflect(&u, 2.0, &mut rng);
            assert!((norm(&g) - 2.0).abs() < 1e-12);
            if g[0] > 0.0 {
                forward += 1;
            }
        }
        assert!(forward > 950, "forward = {forward}");
    }
}
