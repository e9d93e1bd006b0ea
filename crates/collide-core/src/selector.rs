// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Channel Selector
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Channel draw and state commit for an accepted pair.

use crate::channel::{Channel, ChannelBuffer, InteractionKind, Role, Side};
use crate::diagnostics::CollisionStats;
use collide_math::interp::cdf_index;
use collide_types::constants::EV_TO_J;
use collide_types::error::{CollideError, CollideResult};
use collide_types::state::SuperParticle;
use rand::Rng;

/// What committing a channel did to the pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Commit {
    /// Loss per physical event [eV].
    pub loss_ev: f64,
    /// Physical events the loss is charged for.
    pub energy_weight: f64,
    /// Kinetic energy to remove in the scatter [J].
    pub delta_e: f64,
    /// Occupation fraction moved by an ionization or recombination.
    pub moved: f64,
    /// Kinetic energy [J] the charge change shifted between the target's
    /// velocity fields, already booked to its ledger.
    pub carried: f64,
}

pub struct ChannelSelector;

impl ChannelSelector {
    /// Draw one channel index with probability proportional to σ·v.
    /// Returns `None` when the buffer carries no rate.
    pub fn draw<R: Rng + ?Sized>(buf: &mut ChannelBuffer, rng: &mut R) -> CollideResult<Option<usize>> {
        let (channels, cdf) = buf.cumulative();
        let total = cdf.last().copied().unwrap_or(0.0);
        if !(total > 0.0) || !total.is_finite() {
            return Ok(None);
        }
        let target = rng.gen::<f64>() * total;
        let mut index = cdf_index(cdf, target).ok_or_else(|| {
            CollideError::LogicError("channel draw on an empty cumulative table".to_string())
        })?;
        if channels[index].sigma_v() <= 0.0 {
            // round-off fallback landed on a closed trailing channel
            index = channels
                .iter()
                .rposition(|c| c.sigma_v() > 0.0)
                .ok_or_else(|| CollideError::LogicError("no open channel below positive total".to_string()))?;
        }
        log::trace!(
            "drew channel {index}/{} ({:?}) u·Σ={target:e}",
            channels.len(),
            channels[index].tag()
        );
        Ok(Some(index))
    }

    /// Apply the state change of `channel` to the pair and return the
    /// energy to remove.
    ///
    /// Ionization and recombination move `Δf = stat_weight / (W·n_e)` of
    /// the target element between adjacent levels; the loss is charged
    /// for the atoms that actually moved. A target with an electron field
    /// has it carried across the change of its electron count. Every
    /// other channel is charged for `stat_weight` events.
    pub fn commit<R: Rng + ?Sized>(
        channel: &Channel,
        first: &mut SuperParticle,
        second: &mut SuperParticle,
        stat_weight: f64,
        rng: &mut R,
        stats: &mut CollisionStats,
    ) -> CollideResult<Commit> {
        let mut loss_ev = match channel.kind.loss() {
            Some(loss) => loss.sample(rng.gen(), channel.energy_ev),
            None => 0.0,
        };
        if !loss_ev.is_finite() {
            log::warn!("non-finite energy loss for {:?} replaced by zero", channel.tag());
            stats.nan_repairs += 1;
            loss_ev = 0.0;
        }
        if loss_ev < 0.0 {
            return Err(CollideError::LogicError(format!(
                "negative energy loss {loss_ev} eV sampled for {:?}",
                channel.tag()
            )));
        }

        let mut commit = Commit {
            loss_ev,
            energy_weight: stat_weight,
            ..Commit::default()
        };

        if channel.kind.changes_charge() {
            let t = channel.target;
            if t.role == Role::Electron {
                return Err(CollideError::LogicError(
                    "charge-changing channel targets an electron".to_string(),
                ));
            }
            let target = match t.side {
                Side::First => first,
                Side::Second => second,
            };
            let element = t.element.ok_or_else(|| {
                CollideError::LogicError("charge-changing channel without target element".to_string())
            })?;
            let occupation = target.species.elements().get(element).ok_or_else(|| {
                CollideError::LogicError(format!("target element index {element} out of range"))
            })?;
            if occupation.z() != t.z {
                return Err(CollideError::LogicError(format!(
                    "channel targets z={} but element {element} is z={}",
                    t.z,
                    occupation.z()
                )));
            }
            let donor_atoms = target.weight * occupation.number_fraction();
            let delta_f = stat_weight / donor_atoms;
            let electrons_before = target.electron_count();
            let u = rng.gen::<f64>();
            let moved = match channel.kind {
                InteractionKind::Ionization { .. } => {
                    let m = target.species.ionize(element, t.charge, delta_f, u)?;
                    stats.record_ionization(t.z, m * donor_atoms);
                    m
                }
                _ => {
                    let m = target.species.recombine(element, t.charge, delta_f, u)?;
                    stats.record_recombination(t.z, m * donor_atoms);
                    m
                }
            };
            commit.moved = moved;
            commit.energy_weight = moved * donor_atoms;
            if moved > 0.0 {
                commit.carried = target.carry_electrons(electrons_before);
                if commit.carried != 0.0 {
                    log::trace!("electron field of particle {} carried {:e} J", target.id, commit.carried);
                }
            }
        }

        let delta_e = commit.loss_ev * commit.energy_weight * EV_TO_J;
        commit.delta_e = if delta_e.is_finite() {
            delta_e
        } else {
            log::warn!("non-finite event energy for {:?} replaced by zero", channel.tag());
            stats.nan_repairs += 1;
            0.0
        };
        Ok(commit)
    }
}
