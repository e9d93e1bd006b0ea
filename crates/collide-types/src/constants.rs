// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C)
pub const Q_ELECTRON: f64 = 1.602176634e-19;

/// Electron mass (kg)
pub const M_ELECTRON: f64 = 9.1093837015e-31;

/// Atomic mass unit (kg)
pub const AMU: f64 = 1.66053906660e-27;

/// Boltzmann constant (J/K)
pub const K_BOLTZMANN: f64 = 1.380649e-23;

/// Vacuum permittivity (F/m)
pub const EPS0: f64 = 8.8541878128e-12;

/// Bohr radius (m)
pub const A0_BOHR: f64 = 5.29177210903e-11;

/// Hydrogen ionization potential (eV)
pub const RYDBERG_EV: f64 = 13.605693122994;

/// eV → J
pub const EV_TO_J: f64 = Q_ELECTRON;

/// Fraction-sum drift repaired without comment.
pub const FRACTION_SILENT_TOL: f64 = 1e-14;

/// Fraction-sum drift above which a renormalization is logged.
pub const FRACTION_WARN_TOL: f64 = 1e-8;

/// Heaviest element supported by the element table.
pub const MAX_Z: u8 = 30;

/// Standard atomic weight (amu) for atomic number `z`.
///
/// Tabulated for the elements that matter in astrophysical and edge
/// plasmas; everything else in 1..=MAX_Z falls back to A ≈ 2Z.
pub fn atomic_weight(z: u8) -> Option<f64> {
    let a = match z {
        1 => 1.00794,
        2 => 4.002602,
        3 => 6.941,
        4 => 9.012182,
        5 => 10.811,
        6 => 12.0107,
        7 => 14.0067,
        8 => 15.9994,
        9 => 18.998403,
        10 => 20.1797,
        11 => 22.989770,
        12 => 24.3050,
        13 => 26.981538,
        14 => 28.0855,
        16 => 32.065,
        18 => 39.948,
        20 => 40.078,
        26 => 55.845,
        z if (1..=MAX_Z).contains(&z) => 2.0 * z as f64,
        _ => return None,
    };
    Some(a)
}

/// First ionization potentials (eV) for charge state `charge` of element `z`.
///
/// Exact for H and He; other elements use a screened hydrogenic estimate
/// with effective charge (charge + 1) and principal quantum number from
/// the shell filling of the remaining bound electrons.
pub fn ionization_potential_ev(z: u8, charge: u8) -> Option<f64> {
    if charge >= z {
        return None;
    }
    let ip = match (z, charge) {
        (1, 0) => 13.598434,
        (2, 0) => 24.587387,
        (2, 1) => 54.417760,
        _ => {
            let bound = (z - charge) as f64;
            let n = principal_shell(bound);
            let z_eff = charge as f64 + 1.0;
            RYDBERG_EV * z_eff * z_eff / (n * n)
        }
    };
    Some(ip)
}

/// Bohr-scaled radius [m] of charge state `charge` of element `z`:
/// `a0·n²/(charge + 1)`. Zero for a bare nucleus.
pub fn atomic_radius(z: u8, charge: u8) -> f64 {
    if charge >= z {
        return 0.0;
    }
    let n = principal_shell((z - charge) as f64);
    A0_BOHR * n * n / (charge as f64 + 1.0)
}

/// Principal quantum number of the outermost of `bound` electrons.
fn principal_shell(bound: f64) -> f64 {
    if bound <= 2.0 {
        1.0
    } else if bound <= 10.0 {
        2.0
    } else if bound <= 28.0 {
        3.0
    } else {
        4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_weights() {
        assert!((atomic_weight(1).unwrap() - 1.00794).abs() < 1e-10);
        assert!((atomic_weight(26).unwrap() - 55.845).abs() < 1e-10);
        assert_eq!(atomic_weight(25), Some(50.0));
        assert_eq!(atomic_weight(0), None);
        assert_eq!(atomic_weight(MAX_Z + 1), None);
    }

    #[test]
    fn test_ionization_potentials() {
        assert!((ionization_potential_ev(1, 0).unwrap() - 13.598434).abs() < 1e-9);
        assert!((ionization_potential_ev(2, 1).unwrap() - 54.41776).abs() < 1e-9);
        assert!(ionization_potential_ev(1, 1).is_none());
        // Bare-ion limit: one bound electron → hydrogenic Z² scaling
        let ip = ionization_potential_ev(8, 7).unwrap();
        assert!((ip - RYDBERG_EV * 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_atomic_radius() {
        assert!((atomic_radius(1, 0) - A0_BOHR).abs() < 1e-25);
        assert!((atomic_radius(8, 0) - 4.0 * A0_BOHR).abs() < 1e-25);
        assert!(atomic_radius(8, 1) < atomic_radius(8, 0));
        assert_eq!(atomic_radius(2, 2), 0.0);
    }

    #[test]
    fn test_potentials_increase_with_charge() {
        for z in 3..=10u8 {
            let mut prev = 0.0;
            for c in 0..z {
                let ip = ionization_potential_ev(z, c).unwrap();
                assert!(ip > prev, "IP not increasing for z={z}, c={c}");
                prev = ip;
            }
        }
    }
}
