// ─────────────────────────────────────────────────────────────────────
// NTC Collide — No-Time-Counter Estimate
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Candidate-pair counts per cell and channel class.
//!
//! `N_sel,k = ½·N(N−1)·(W_max/V)·(σv)_max,k·Δt`, where `(σv)_max,k` is a
//! cached high quantile of the σ·v samples seen for `(cell, class)`.
//! While the cache is cold the maximum over a bounded set of pairs of
//! the current particles is used instead.

use crate::channel::{ChannelBuffer, ChannelClass};
use crate::cross_section::CrossSectionProvider;
use crate::pair_table::{floor_value, PairCrossSectionTable};
use collide_math::quantile::P2Quantile;
use collide_types::config::NtcConfig;
use collide_types::error::{CollideError, CollideResult};
use collide_types::state::Cell;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Cache key: cell identity and channel class.
pub type NtcKey = (u64, ChannelClass);

/// Shared σ·v quantile cache.
#[derive(Debug)]
pub struct NtcDatabase {
    quantile: f64,
    entries: Mutex<HashMap<NtcKey, P2Quantile>>,
}

impl NtcDatabase {
    pub fn new(quantile: f64) -> CollideResult<Self> {
        P2Quantile::new(quantile)?;
        Ok(NtcDatabase {
            quantile,
            entries: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> CollideResult<MutexGuard<'_, HashMap<NtcKey, P2Quantile>>> {
        self.entries
            .lock()
            .map_err(|_| CollideError::LogicError("NTC cache lock poisoned".to_string()))
    }

    /// Cached `(σv)_max` for `key`, or `None` until `min_samples` samples
    /// have been observed.
    pub fn estimate(&self, key: NtcKey, min_samples: usize) -> CollideResult<Option<f64>> {
        let entries = self.lock()?;
        Ok(entries
            .get(&key)
            .filter(|q| q.is_ready(min_samples))
            .and_then(P2Quantile::estimate)
            .filter(|v| *v > 0.0))
    }

    /// Feed σ·v samples for `key`. Zero and non-finite samples are skipped.
    pub fn observe(&self, key: NtcKey, samples: &[f64]) -> CollideResult<()> {
        if !samples.iter().any(|s| *s > 0.0 && s.is_finite()) {
            return Ok(());
        }
        let mut entries = self.lock()?;
        let q = match entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => e.insert(P2Quantile::new(self.quantile)?),
        };
        for &s in samples {
            if s > 0.0 {
                q.observe(s);
            }
        }
        Ok(())
    }

    /// Samples observed for `key`.
    pub fn sample_count(&self, key: NtcKey) -> CollideResult<u64> {
        Ok(self.lock()?.get(&key).map_or(0, P2Quantile::count))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached estimate.
    pub fn clear(&self) -> CollideResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Candidate counts for one cell and step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPlan {
    pub candidates: [u64; 3],
    pub sigma_v_max: [f64; 3],
    /// Whether `sigma_v_max` came from a ready cache entry.
    pub ready: [bool; 3],
    /// Largest particle weight in the cell.
    pub w_max: f64,
    /// `W_max / V` [m⁻³].
    pub density: f64,
    /// `ceiling / requested` when the ceiling was hit, otherwise 1.
    pub clamp_scale: f64,
    pub clamped: bool,
    /// Pairs scanned for the on-the-fly maximum.
    pub bootstrap_pairs: u64,
}

impl SelectionPlan {
    pub fn empty() -> Self {
        SelectionPlan {
            candidates: [0; 3],
            sigma_v_max: [0.0; 3],
            ready: [false; 3],
            w_max: 0.0,
            density: 0.0,
            clamp_scale: 1.0,
            clamped: false,
            bootstrap_pairs: 0,
        }
    }

    pub fn total_candidates(&self) -> u64 {
        self.candidates.iter().sum()
    }

    pub fn candidates(&self, class: ChannelClass) -> u64 {
        self.candidates[class.index()]
    }

    pub fn sigma_v_max(&self, class: ChannelClass) -> f64 {
        self.sigma_v_max[class.index()]
    }
}

/// Draw two distinct indices in `0..n` (`n ≥ 2`).
pub fn random_pair<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}

/// `floor(x) + Bernoulli(frac(x))`.
pub fn stochastic_round<R: Rng + ?Sized>(x: f64, rng: &mut R) -> u64 {
    if !(x > 0.0) {
        return 0;
    }
    let base = x.floor();
    let frac = x - base;
    let extra = u64::from(rng.gen::<f64>() < frac);
    (base as u64).saturating_add(extra)
}

pub struct PairSelector<'a> {
    ntc: &'a NtcDatabase,
    config: &'a NtcConfig,
    ceiling: Option<usize>,
}

impl<'a> PairSelector<'a> {
    pub fn new(ntc: &'a NtcDatabase, config: &'a NtcConfig, ceiling: Option<usize>) -> Self {
        PairSelector { ntc, config, ceiling }
    }

    /// Plan this step's candidate counts for `cell`.
    pub fn plan<P, R>(
        &self,
        cell: &Cell,
        table: &PairCrossSectionTable<'_, P>,
        buf: &mut ChannelBuffer,
        dt: f64,
        rng: &mut R,
        repairs: &mut u64,
    ) -> CollideResult<SelectionPlan>
    where
        P: CrossSectionProvider + ?Sized,
        R: Rng + ?Sized,
    {
        let n = cell.len();
        let mut plan = SelectionPlan::empty();
        if n < 2 || !(dt > 0.0) {
            return Ok(plan);
        }
        plan.w_max = cell.particles.iter().map(|p| p.weight).fold(0.0, f64::max);
        plan.density = plan.w_max / cell.volume;
        if !(plan.density > 0.0) || !plan.density.is_finite() {
            return Ok(plan);
        }

        for class in ChannelClass::ALL {
            if let Some(v) = self.ntc.estimate((cell.id, class), self.config.min_samples)? {
                plan.sigma_v_max[class.index()] = v;
                plan.ready[class.index()] = true;
            }
        }
        if plan.ready.iter().any(|r| !r) {
            self.bootstrap(cell, table, buf, rng, repairs, &mut plan)?;
        }

        let pairs = 0.5 * n as f64 * (n - 1) as f64;
        let mut expected = [0.0; 3];
        for class in ChannelClass::ALL {
            let k = class.index();
            let e = floor_value(pairs * plan.density * plan.sigma_v_max[k] * dt, "candidate count", repairs);
            expected[k] = e;
            plan.candidates[k] = stochastic_round(e, rng);
        }

        if let Some(ceiling) = self.ceiling {
            let total = plan.total_candidates();
            if total > ceiling as u64 {
                plan.clamp_scale = ceiling as f64 / total as f64;
                plan.candidates = scale_counts(plan.candidates, ceiling as u64);
                plan.clamped = true;
                log::warn!(
                    "cell {}: {total} candidate pairs clamped to {ceiling} (scale {:.3e})",
                    cell.id,
                    plan.clamp_scale
                );
            }
        }

        log::debug!(
            "cell {}: N={n} expected={:?} candidates={:?} ready={:?}",
            cell.id,
            expected,
            plan.candidates,
            plan.ready
        );
        Ok(plan)
    }

    /// Maximum σ·v per cold class over all pairs, or over
    /// `bootstrap_pairs` random pairs when the cell has more.
    fn bootstrap<P, R>(
        &self,
        cell: &Cell,
        table: &PairCrossSectionTable<'_, P>,
        buf: &mut ChannelBuffer,
        rng: &mut R,
        repairs: &mut u64,
        plan: &mut SelectionPlan,
    ) -> CollideResult<()>
    where
        P: CrossSectionProvider + ?Sized,
        R: Rng + ?Sized,
    {
        let n = cell.len();
        let all_pairs = (n * (n - 1) / 2) as u64;
        let limit = self.config.bootstrap_pairs as u64;
        let mut samples: [Vec<f64>; 3] = Default::default();
        let mut max = [0.0_f64; 3];
        let mut visit = |i: usize, j: usize, buf: &mut ChannelBuffer, repairs: &mut u64| {
            let totals = table.build(&cell.particles[i], &cell.particles[j], buf, repairs);
            for (k, sv) in totals.sigma_v.iter().enumerate() {
                if *sv > 0.0 {
                    max[k] = max[k].max(*sv);
                    samples[k].push(*sv);
                }
            }
        };

        if all_pairs <= limit {
            for i in 0..n {
                for j in i + 1..n {
                    visit(i, j, &mut *buf, &mut *repairs);
                }
            }
            plan.bootstrap_pairs = all_pairs;
        } else {
            for _ in 0..limit {
                let (i, j) = random_pair(n, rng);
                visit(i, j, &mut *buf, &mut *repairs);
            }
            plan.bootstrap_pairs = limit;
        }

        for class in ChannelClass::ALL {
            let k = class.index();
            if !plan.ready[k] {
                plan.sigma_v_max[k] = max[k];
                self.ntc.observe((cell.id, class), &samples[k])?;
            }
        }
        Ok(())
    }
}

/// Scale `counts` down so they sum to exactly `ceiling`, keeping the
/// proportions (largest remainders get the leftover slots).
fn scale_counts(counts: [u64; 3], ceiling: u64) -> [u64; 3] {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return counts;
    }
    let s = ceiling as f64 / total as f64;
    let mut out = [0u64; 3];
    let mut rem = [0.0_f64; 3];
    for k in 0..3 {
        let x = counts[k] as f64 * s;
        out[k] = x.floor() as u64;
        rem[k] = x - x.floor();
    }
    let mut left = ceiling.saturating_sub(out.iter().sum());
    let mut order = [0usize, 1, 2];
    order.sort_by(|a, b| rem[*b].total_cmp(&rem[*a]));
    for k in order {
        if left == 0 {
            break;
        }
        if counts[k] > out[k] {
            out[k] += 1;
            left -= 1;
        }
    }
    out
}
