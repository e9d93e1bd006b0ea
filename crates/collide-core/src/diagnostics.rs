// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Collision Diagnostics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-step counters produced by the kernel.

use serde::Serialize;
use std::collections::BTreeMap;

/// Channel identity for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKindTag {
    NeutralNeutral,
    NeutralElectron,
    NeutralIon,
    IonElectron,
    IonIon,
    ElectronElectron,
    FreeFree,
    Excitation,
    Ionization,
    Recombination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelTally {
    pub events: u64,
    /// Energy requested by the events [J].
    pub energy: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ElementTally {
    pub ionizations: u64,
    pub recombinations: u64,
    /// Physical atoms moved up one charge state.
    pub ionized_atoms: f64,
    /// Physical atoms moved down one charge state.
    pub recombined_atoms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollisionStats {
    pub channels: BTreeMap<ChannelKindTag, ChannelTally>,
    pub elements: BTreeMap<u8, ElementTally>,
    pub cells: u64,
    pub candidates: u64,
    pub accepted: u64,
    /// Cells whose candidate count hit the configured ceiling.
    pub clamp_events: u64,
    /// Candidates whose acceptance ratio exceeded one.
    pub overflows: u64,
    /// Non-finite cross sections or energies replaced by zero.
    pub nan_repairs: u64,
    /// Energy pushed into ledgers this step [J].
    pub deferred_energy: f64,
    /// Blend residual of non-exact scatters [J].
    pub ke_delta: f64,
    /// Kinetic energy charge changes shifted between bulk and electron
    /// fields [J].
    pub carried_energy: f64,
    /// Σ ledger over all particles at the end of the step [J].
    pub ledger_total: f64,
    /// Smallest suggested timestep over all particles [s].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cooling_dt: Option<f64>,
}

impl CollisionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, tag: ChannelKindTag, energy: f64) {
        let t = self.channels.entry(tag).or_default();
        t.events += 1;
        t.energy += energy;
    }

    pub fn record_ionization(&mut self, z: u8, atoms: f64) {
        let t = self.elements.entry(z).or_default();
        t.ionizations += 1;
        t.ionized_atoms += atoms;
    }

    pub fn record_recombination(&mut self, z: u8, atoms: f64) {
        let t = self.elements.entry(z).or_default();
        t.recombinations += 1;
        t.recombined_atoms += atoms;
    }

    pub fn record_cooling_dt(&mut self, dt: f64) {
        if dt.is_finite() {
            self.min_cooling_dt = Some(self.min_cooling_dt.map_or(dt, |m| m.min(dt)));
        }
    }

    /// Events over all channels.
    pub fn total_events(&self) -> u64 {
        self.channels.values().map(|t| t.events).sum()
    }

    pub fn events(&self, tag: ChannelKindTag) -> u64 {
        self.channels.get(&tag).map_or(0, |t| t.events)
    }

    /// Combine counters from another worker.
    pub fn merge(mut self, other: CollisionStats) -> CollisionStats {
        for (tag, t) in other.channels {
            let e = self.channels.entry(tag).or_default();
            e.events += t.events;
            e.energy += t.energy;
        }
        for (z, t) in other.elements {
            let e = self.elements.entry(z).or_default();
            e.ionizations += t.ionizations;
            e.recombinations += t.recombinations;
            e.ionized_atoms += t.ionized_atoms;
            e.recombined_atoms += t.recombined_atoms;
        }
        self.cells += other.cells;
        self.candidates += other.candidates;
        self.accepted += other.accepted;
        self.clamp_events += other.clamp_events;
        self.overflows += other.overflows;
        self.nan_repairs += other.nan_repairs;
        self.deferred_energy += other.deferred_energy;
        self.ke_delta += other.ke_delta;
        self.carried_energy += other.carried_energy;
        self.ledger_total += other.ledger_total;
        if let Some(dt) = other.min_cooling_dt {
            self.record_cooling_dt(dt);
        }
        self
    }
}
