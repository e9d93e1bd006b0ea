// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! CollisionKernel: the parallel per-step driver.
//!
//! Cells are independent within a step and are processed with rayon.
//! Each cell draws from its own `StdRng` seeded from
//! `(seed, step, cell id)`, and per-cell statistics are merged in cell
//! order, so results do not depend on the number of worker threads.

use crate::cell::CellCollider;
use crate::channel::ChannelBuffer;
use crate::cross_section::CrossSectionProvider;
use crate::diagnostics::CollisionStats;
use crate::ntc::NtcDatabase;
use collide_types::config::KernelConfig;
use collide_types::error::{CollideError, CollideResult};
use collide_types::state::Cell;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seed of the random stream for `cell_id` at step `step`.
pub fn derive_seed(seed: u64, step: u64, cell_id: u64) -> u64 {
    splitmix64(splitmix64(seed ^ step.wrapping_mul(GOLDEN_GAMMA)) ^ cell_id)
}

/// Weighted-species collision kernel.
pub struct CollisionKernel<P: CrossSectionProvider> {
    config: KernelConfig,
    provider: P,
    ntc: NtcDatabase,
    pool: Option<ThreadPool>,
}

impl<P: CrossSectionProvider> CollisionKernel<P> {
    /// Validate `config` and build the kernel (and its thread pool when
    /// `threads` is set).
    pub fn new(config: KernelConfig, provider: P) -> CollideResult<Self> {
        config.validate()?;
        let ntc = NtcDatabase::new(config.ntc.quantile)?;
        let pool = match config.threads {
            Some(n) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| CollideError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        Ok(CollisionKernel {
            config,
            provider,
            ntc,
            pool,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Shared NTC cache.
    pub fn ntc(&self) -> &NtcDatabase {
        &self.ntc
    }

    /// Advance collisions in every cell by `dt` seconds.
    ///
    /// Returns merged statistics. Any `LogicError` from a cell aborts the
    /// step; the cells already processed keep their updates.
    pub fn step(&self, cells: &mut [Cell], dt: f64, step_index: u64) -> CollideResult<CollisionStats> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(CollideError::PhysicsViolation(format!(
                "timestep must be finite and > 0, got {dt}"
            )));
        }
        let stats = match &self.pool {
            Some(pool) => pool.install(|| self.sweep(cells, dt, step_index)),
            None => self.sweep(cells, dt, step_index),
        }?;
        log::debug!(
            "step {step_index}: {} cells, {} candidates, {} events, ledger {:.3e} J",
            stats.cells,
            stats.candidates,
            stats.total_events(),
            stats.ledger_total
        );
        Ok(stats)
    }

    fn sweep(&self, cells: &mut [Cell], dt: f64, step_index: u64) -> CollideResult<CollisionStats> {
        let collider = CellCollider::new(&self.config, &self.provider, &self.ntc);
        let seed = self.config.seed;
        let results: Vec<CollideResult<CollisionStats>> = cells
            .par_iter_mut()
            .map_init(ChannelBuffer::new, |buf, cell| {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, step_index, cell.id));
                collider.collide(cell, dt, &mut rng, buf)
            })
            .collect();

        let mut total = CollisionStats::new();
        for r in results {
            total = total.merge(r?);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::HydrogenicModel;
    use collide_types::species::{Representation, SpeciesState};
    use collide_types::state::SuperParticle;

    fn cells(n_cells: u64) -> Vec<Cell> {
        let s = SpeciesState::neutral(1, Representation::Fractional).unwrap();
        (0..n_cells)
            .map(|c| {
                let particles = (0..6)
                    .map(|i| {
                        let v = 1e3 * (i as f64 + c as f64);
                        SuperParticle::new(i, 1e12, [v, 0.0, -v], s.clone()).unwrap()
                    })
                    .collect();
                Cell::new(c, 1e-9, particles).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_derive_seed_separates_streams() {
        let a = derive_seed(1, 0, 0);
        assert_ne!(a, derive_seed(1, 0, 1));
        assert_ne!(a, derive_seed(1, 1, 0));
        assert_ne!(a, derive_seed(2, 0, 0));
        assert_eq!(a, derive_seed(1, 0, 0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = KernelConfig {
            threads: Some(2),
            ntc: collide_types::config::NtcConfig {
                quantile: 2.0,
                ..Default::default()
            },
            ..KernelConfig::default()
        };
        assert!(matches!(
            CollisionKernel::new(cfg, HydrogenicModel::new().unwrap()),
            Err(CollideError::ConfigError(_))
        ));
    }

    #[test]
    fn test_bad_timestep_rejected() {
        let kernel = CollisionKernel::new(KernelConfig::default(), HydrogenicModel::new().unwrap()).unwrap();
        let mut c = cells(1);
        assert!(kernel.step(&mut c, 0.0, 0).is_err());
        assert!(kernel.step(&mut c, f64::NAN, 0).is_err());
    }

    #[test]
    fn test_step_merges_cells() {
        let kernel = CollisionKernel::new(KernelConfig::default(), HydrogenicModel::new().unwrap()).unwrap();
        let mut c = cells(4);
        let stats = kernel.step(&mut c, 1e-5, 0).unwrap();
        assert_eq!(stats.cells, 4);
        assert!(stats.candidates > 0);
        assert!(kernel.ntc().len() >= 4);
    }

    #[test]
    fn test_thread_count_does_not_change_results() {
        let run = |threads: Option<usize>| {
            let cfg = KernelConfig {
                threads,
                ..KernelConfig::default()
            };
            let kernel = CollisionKernel::new(cfg, HydrogenicModel::new().unwrap()).unwrap();
            let mut c = cells(6);
            let mut last = CollisionStats::new();
            for step in 0..3 {
                last = kernel.step(&mut c, 1e-5, step).unwrap();
            }
            (c, last)
        };
        let (c1, s1) = run(Some(1));
        let (c4, s4) = run(Some(4));
        assert_eq!(s1.accepted, s4.accepted);
        assert_eq!(s1.candidates, s4.candidates);
        for (a, b) in c1.iter().zip(&c4) {
            for (p, q) in a.particles.iter().zip(&b.particles) {
                assert_eq!(p.vel, q.vel);
            }
        }
    }
}
