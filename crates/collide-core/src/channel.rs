// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Interaction Channels
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Interaction channels between two super-particles.
//!
//! A [`Channel`] names the two participants (which particle of the pair,
//! in which role, which element and charge state), carries the
//! occupation-weighted cross section and the relative speed it was
//! evaluated at, and an [`InteractionKind`] with the per-kind payload.

use crate::cross_section::EnergyLoss;
use crate::diagnostics::ChannelKindTag;
use serde::{Deserialize, Serialize};

/// Which particle of the candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

/// Role a participant plays in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Neutral,
    Ion,
    Electron,
}

/// One side of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub side: Side,
    pub role: Role,
    /// Index into the particle's element list; `None` for electrons.
    pub element: Option<usize>,
    pub z: u8,
    pub charge: u8,
}

impl Participant {
    pub fn heavy(side: Side, element: usize, z: u8, charge: u8) -> Self {
        Participant {
            side,
            role: if charge == 0 { Role::Neutral } else { Role::Ion },
            element: Some(element),
            z,
            charge,
        }
    }

    pub fn electron(side: Side) -> Self {
        Participant {
            side,
            role: Role::Electron,
            element: None,
            z: 0,
            charge: 1,
        }
    }
}

/// NTC throttling class. Each class has its own cached maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelClass {
    /// Atoms/ions of both particles.
    Heavy,
    /// Electrons of the first particle on the second particle's atoms,
    /// ions and electrons.
    ElectronFrom1,
    /// Electrons of the second particle on the first particle's atoms and ions.
    ElectronFrom2,
}

impl ChannelClass {
    pub const ALL: [ChannelClass; 3] = [
        ChannelClass::Heavy,
        ChannelClass::ElectronFrom1,
        ChannelClass::ElectronFrom2,
    ];

    pub fn index(self) -> usize {
        match self {
            ChannelClass::Heavy => 0,
            ChannelClass::ElectronFrom1 => 1,
            ChannelClass::ElectronFrom2 => 2,
        }
    }
}

/// Kind of interaction and its payload.
#[derive(Debug, Clone)]
pub enum InteractionKind {
    /// Hard-sphere scattering involving a neutral.
    Elastic,
    /// Coulomb scattering between two charged participants.
    Coulomb {
        /// Impact parameter for 90° deflection [m].
        b90: f64,
        /// Screening cutoff [m].
        b_max: f64,
    },
    FreeFree { loss: EnergyLoss },
    Excitation { loss: EnergyLoss },
    /// Moves the target from its charge state to the next one up.
    Ionization { loss: EnergyLoss },
    /// Moves the target from its charge state to the next one down.
    Recombination { loss: EnergyLoss },
}

impl InteractionKind {
    /// Energy-loss law of an inelastic channel.
    pub fn loss(&self) -> Option<&EnergyLoss> {
        match self {
            InteractionKind::Elastic | InteractionKind::Coulomb { .. } => None,
            InteractionKind::FreeFree { loss }
            | InteractionKind::Excitation { loss }
            | InteractionKind::Ionization { loss }
            | InteractionKind::Recombination { loss } => Some(loss),
        }
    }

    pub fn changes_charge(&self) -> bool {
        matches!(
            self,
            InteractionKind::Ionization { .. } | InteractionKind::Recombination { .. }
        )
    }
}

/// One accessible channel of a candidate pair.
#[derive(Debug, Clone)]
pub struct Channel {
    pub kind: InteractionKind,
    pub class: ChannelClass,
    /// Projectile (electron side for electron classes).
    pub projectile: Participant,
    pub target: Participant,
    /// Occupation-weighted cross section [m²].
    pub sigma: f64,
    /// Relative speed the cross section was evaluated at [m/s].
    pub speed: f64,
    /// Centre-of-mass energy per physical pair [eV].
    pub energy_ev: f64,
}

impl Channel {
    pub fn sigma_v(&self) -> f64 {
        self.sigma * self.speed
    }

    /// Diagnostic tag from the kind and the two roles.
    pub fn tag(&self) -> ChannelKindTag {
        use Role::*;
        match &self.kind {
            InteractionKind::FreeFree { .. } => ChannelKindTag::FreeFree,
            InteractionKind::Excitation { .. } => ChannelKindTag::Excitation,
            InteractionKind::Ionization { .. } => ChannelKindTag::Ionization,
            InteractionKind::Recombination { .. } => ChannelKindTag::Recombination,
            InteractionKind::Elastic | InteractionKind::Coulomb { .. } => {
                match (self.projectile.role, self.target.role) {
                    (Neutral, Neutral) => ChannelKindTag::NeutralNeutral,
                    (Neutral, Electron) | (Electron, Neutral) => ChannelKindTag::NeutralElectron,
                    (Neutral, Ion) | (Ion, Neutral) => ChannelKindTag::NeutralIon,
                    (Ion, Electron) | (Electron, Ion) => ChannelKindTag::IonElectron,
                    (Ion, Ion) => ChannelKindTag::IonIon,
                    (Electron, Electron) => ChannelKindTag::ElectronElectron,
                }
            }
        }
    }
}

/// Per-task scratch storage for channel lists, reused across pairs.
#[derive(Debug, Default)]
pub struct ChannelBuffer {
    channels: Vec<Channel>,
    cdf: Vec<f64>,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        ChannelBuffer {
            channels: Vec::with_capacity(64),
            cdf: Vec::with_capacity(64),
        }
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.cdf.clear();
    }

    pub fn push(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Σ σ·v over the buffered channels.
    pub fn total_sigma_v(&self) -> f64 {
        self.channels.iter().map(Channel::sigma_v).sum()
    }

    /// Rebuild the cumulative σ·v array and return it with the channels.
    pub fn cumulative(&mut self) -> (&[Channel], &[f64]) {
        self.cdf.clear();
        let mut acc = 0.0;
        for c in &self.channels {
            acc += c.sigma_v();
            self.cdf.push(acc);
        }
        (&self.channels, &self.cdf)
    }
}
