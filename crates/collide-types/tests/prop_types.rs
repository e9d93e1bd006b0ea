// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Property-Based Tests (proptest) for collide-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for collide-types using proptest.
//!
//! Covers: occupation normalization under repeated migration, the
//! no-negative-fraction rule, trace-mixture derived quantities,
//! configuration serialization roundtrip.

use collide_types::config::KernelConfig;
use collide_types::species::{Representation, SpeciesState};
use proptest::prelude::*;

fn occupation(z: u8) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, z as usize + 1)
        .prop_filter("non-zero sum", |v| v.iter().sum::<f64>() > 1e-3)
}

// ── Migration Invariants ─────────────────────────────────────────────

proptest! {
    /// Σf stays 1 within 1e-6 after any sequence of migrations.
    #[test]
    fn fractions_stay_normalized(
        f in occupation(6),
        moves in prop::collection::vec((0u8..6, any::<bool>(), 0.0f64..2.0), 1..64),
    ) {
        let mut s = SpeciesState::fractional(6, f).unwrap();
        for (level, up, delta) in moves {
            if up {
                s.ionize(0, level, delta, 0.5).unwrap();
            } else {
                s.recombine(0, level + 1, delta, 0.5).unwrap();
            }
            let sum: f64 = s.elements()[0].fractions().iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6, "sum drifted to {}", sum);
        }
    }

    /// The migrated fraction never exceeds the source occupancy, so no
    /// level ever goes negative.
    #[test]
    fn migration_capped_at_source(
        f in occupation(3),
        level in 0u8..3,
        delta in 0.0f64..5.0,
    ) {
        let mut s = SpeciesState::fractional(3, f).unwrap();
        let before = s.elements()[0].fraction(level);
        let moved = s.ionize(0, level, delta, 0.0).unwrap();
        prop_assert!(moved <= before + 1e-15);
        prop_assert!(moved <= delta + 1e-15);
        prop_assert!(s.elements()[0].fractions().iter().all(|&x| x >= 0.0));
    }

    /// Discrete particles are always one-hot after a migration.
    #[test]
    fn discrete_stays_one_hot(
        charge in 0u8..8,
        delta in 0.0f64..1.5,
        u in 0.0f64..1.0,
    ) {
        let mut s = SpeciesState::discrete(8, charge).unwrap();
        let moved = s.ionize(0, charge, delta, u).unwrap();
        prop_assert!(moved == 0.0 || moved == 1.0);
        let f = s.elements()[0].fractions();
        prop_assert_eq!(f.iter().filter(|&&x| x == 1.0).count(), 1);
        prop_assert_eq!(f.iter().filter(|&&x| x == 0.0).count(), 8);
    }
}

// ── Derived Quantities ───────────────────────────────────────────────

proptest! {
    /// Number fractions of a trace mixture sum to one and eta is bounded
    /// by the heaviest element's Z.
    #[test]
    fn trace_number_fractions(
        x_h in 0.01f64..1.0,
        x_he in 0.01f64..1.0,
        x_o in 0.01f64..1.0,
        f_h in occupation(1),
        f_he in occupation(2),
        f_o in occupation(8),
    ) {
        let s = SpeciesState::trace(vec![(1, x_h, f_h), (2, x_he, f_he), (8, x_o, f_o)]).unwrap();
        let total: f64 = s.elements().iter().map(|e| e.number_fraction()).sum();
        prop_assert!((total - 1.0).abs() < 1e-12);
        prop_assert!(s.eta() >= 0.0 && s.eta() <= 8.0);
        prop_assert!(s.mu() >= 1.0 && s.mu() <= 16.0);
    }

    /// A neutral particle has no free electrons in either representation.
    #[test]
    fn neutral_has_zero_eta(z in 1u8..=30, discrete in any::<bool>()) {
        let repr = if discrete { Representation::Discrete } else { Representation::Fractional };
        let s = SpeciesState::neutral(z, repr).unwrap();
        prop_assert_eq!(s.eta(), 0.0);
        prop_assert_eq!(s.representation(), repr);
    }
}

// ── Configuration Roundtrip ──────────────────────────────────────────

proptest! {
    #[test]
    fn config_roundtrip(
        quantile in 0.5f64..0.99,
        min_samples in 5usize..512,
        ceiling in prop::option::of(1usize..10_000),
        exact in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let mut cfg = KernelConfig::default();
        cfg.ntc.quantile = quantile;
        cfg.ntc.min_samples = min_samples;
        cfg.max_collisions_per_cell = ceiling;
        cfg.exact_energy = exact;
        cfg.seed = seed;
        let json = serde_json::to_string(&cfg).unwrap();
        let back = KernelConfig::from_json_str(&json).unwrap();
        prop_assert_eq!(cfg, back);
    }
}
