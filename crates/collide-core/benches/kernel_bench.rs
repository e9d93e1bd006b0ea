// -------------------------------------------------------------------------
// NTC Collide -- Kernel Sweep Benchmark
// Full collision step over a set of mixed H/He cells, implicit vs explicit
// electrons, at two particle counts per cell.
// -------------------------------------------------------------------------

use collide_core::cross_section::HydrogenicModel;
use collide_core::kernel::CollisionKernel;
use collide_types::config::{ElectronModel, KernelConfig};
use collide_types::constants::{AMU, EV_TO_J, M_ELECTRON};
use collide_types::species::{Representation, SpeciesState};
use collide_types::state::{Cell, SuperParticle};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

/// Self-contained cell set so benchmarks do not depend on external input.
fn make_cells(n_cells: u64, per_cell: u64, electrons: ElectronModel) -> Vec<Cell> {
    let mut rng = StdRng::seed_from_u64(2026);
    let vt = (20.0 * EV_TO_J / AMU).sqrt();
    let ve = (20.0 * EV_TO_J / M_ELECTRON).sqrt();
    (0..n_cells)
        .map(|c| {
            let particles = (0..per_cell)
                .map(|i| {
                    let species = match i % 3 {
                        0 => SpeciesState::fractional(1, vec![0.4, 0.6]).expect("valid occupation"),
                        1 => SpeciesState::neutral(1, Representation::Fractional).expect("valid element"),
                        _ => SpeciesState::fractional(2, vec![0.2, 0.5, 0.3]).expect("valid occupation"),
                    };
                    let mut v = || vt * (rng.gen::<f64>() - 0.5);
                    let vel = [v(), v(), v()];
                    let p = SuperParticle::new(i, 1e12, vel, species).expect("valid particle");
                    match electrons {
                        ElectronModel::Explicit => {
                            let mut e = || ve * (rng.gen::<f64>() - 0.5);
                            let elec = [e(), e(), e()];
                            p.with_electrons(elec).expect("finite electron velocity")
                        }
                        ElectronModel::Implicit => p,
                    }
                })
                .collect();
            Cell::new(c, 1e-12, particles).expect("valid cell")
        })
        .collect()
}

fn bench_kernel_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_step");
    group.sample_size(10);

    for &per_cell in &[16u64, 64] {
        for electrons in [ElectronModel::Implicit, ElectronModel::Explicit] {
            let config = KernelConfig {
                electrons,
                max_collisions_per_cell: Some(2000),
                ..KernelConfig::default()
            };
            let kernel = CollisionKernel::new(config, HydrogenicModel::new().expect("reference model"))
                .expect("valid config");
            let cells = make_cells(32, per_cell, electrons);

            group.bench_with_input(
                BenchmarkId::new(format!("{electrons:?}"), per_cell),
                &cells,
                |b, cells| {
                    let mut step = 0u64;
                    b.iter(|| {
                        let mut work = cells.clone();
                        let stats = kernel.step(&mut work, 1e-10, step).expect("step should not error");
                        step += 1;
                        black_box(stats.accepted)
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_kernel_step);
criterion_main!(benches);
