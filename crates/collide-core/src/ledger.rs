// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Energy Ledger
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deferred-energy bookkeeping.
//!
//! Each particle carries one signed entry per velocity field. Positive
//! entries are energy still to be removed from that field, negative
//! entries energy still to be returned. A scatter drains both touched
//! entries into its request and deposits whatever it could not settle.

use collide_types::state::LedgerEntry;

/// Velocity field a ledger entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Ion,
    Electron,
}

pub struct EnergyLedger;

impl EnergyLedger {
    /// Take the whole entry for `field`, leaving zero behind.
    pub fn drain(entry: &mut LedgerEntry, field: Field) -> f64 {
        let slot = Self::slot(entry, field);
        let v = *slot;
        *slot = 0.0;
        if v.is_finite() {
            v
        } else {
            log::warn!("non-finite ledger entry {v} dropped");
            0.0
        }
    }

    /// Add `amount` [J] to the entry for `field`.
    pub fn deposit(entry: &mut LedgerEntry, field: Field, amount: f64) {
        if amount.is_finite() {
            *Self::slot(entry, field) += amount;
        }
    }

    /// Split an unsettled amount between two fields in inverse mass
    /// proportion: `m2/(m1+m2)` to the first, `m1/(m1+m2)` to the second.
    pub fn split(amount: f64, m1: f64, m2: f64) -> (f64, f64) {
        let m = m1 + m2;
        if !m.is_finite() || m <= 0.0 {
            return (0.5 * amount, 0.5 * amount);
        }
        let first = amount * m2 / m;
        (first, amount - first)
    }

    fn slot(entry: &mut LedgerEntry, field: Field) -> &mut f64 {
        match field {
            Field::Ion => &mut entry.ion,
            Field::Electron => &mut entry.electron,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_and_deposit() {
        let mut e = LedgerEntry::default();
        EnergyLedger::deposit(&mut e, Field::Ion, 3.0);
        EnergyLedger::deposit(&mut e, Field::Electron, -1.0);
        EnergyLedger::deposit(&mut e, Field::Ion, f64::NAN);
        assert_eq!(e.total(), 2.0);
        assert_eq!(EnergyLedger::drain(&mut e, Field::Ion), 3.0);
        assert_eq!(e.ion, 0.0);
        assert_eq!(e.electron, -1.0);
    }

    #[test]
    fn test_split_conserves_amount() {
        let (a, b) = EnergyLedger::split(10.0, 1.0, 3.0);
        assert!((a - 7.5).abs() < 1e-15);
        assert!((b - 2.5).abs() < 1e-15);
        assert_eq!(EnergyLedger::split(4.0, 0.0, 0.0), (2.0, 2.0));
    }

    #[test]
    fn test_non_finite_entry_dropped() {
        let mut e = LedgerEntry {
            ion: f64::INFINITY,
            electron: 0.0,
        };
        assert_eq!(EnergyLedger::drain(&mut e, Field::Ion), 0.0);
        assert_eq!(e.ion, 0.0);
    }
}
