// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Cell Collision Loop
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One cell, one timestep: plan candidates, accept, pick a channel,
//! commit it and scatter the touched velocity fields.

use crate::channel::{Channel, ChannelBuffer, ChannelClass, InteractionKind, Role, Side};
use crate::cross_section::CrossSectionProvider;
use crate::diagnostics::CollisionStats;
use crate::ledger::Field;
use crate::ntc::{random_pair, NtcDatabase, PairSelector};
use crate::pair_table::{CellPlasma, PairCrossSectionTable};
use crate::scatter::{ScatterAngle, ScatterBody, ScatterEngine};
use crate::selector::ChannelSelector;
use collide_types::config::{DeflectionModel, ElectronModel, KernelConfig};
use collide_types::constants::M_ELECTRON;
use collide_types::error::{CollideError, CollideResult};
use collide_types::state::{Cell, SuperParticle};
use rand::Rng;

/// Runs the collision step of a single cell.
pub struct CellCollider<'a, P: CrossSectionProvider + ?Sized> {
    config: &'a KernelConfig,
    provider: &'a P,
    ntc: &'a NtcDatabase,
    engine: ScatterEngine,
}

impl<'a, P: CrossSectionProvider + ?Sized> CellCollider<'a, P> {
    pub fn new(config: &'a KernelConfig, provider: &'a P, ntc: &'a NtcDatabase) -> Self {
        CellCollider {
            config,
            provider,
            ntc,
            engine: ScatterEngine::new(config.exact_energy),
        }
    }

    /// Collide the particles of `cell` over `dt` seconds.
    ///
    /// `buf` is scratch space reused across pairs; its contents on entry
    /// are ignored.
    pub fn collide<R: Rng + ?Sized>(
        &self,
        cell: &mut Cell,
        dt: f64,
        rng: &mut R,
        buf: &mut ChannelBuffer,
    ) -> CollideResult<CollisionStats> {
        let mut stats = CollisionStats::new();
        stats.cells = 1;
        for (i, p) in cell.particles.iter_mut().enumerate() {
            p.validate(i)?;
            p.reset_cooling();
        }

        let plasma = CellPlasma::from_cell(cell, self.config.electrons);
        let table = PairCrossSectionTable::new(self.provider, self.config, &plasma);
        let selector = PairSelector::new(self.ntc, &self.config.ntc, self.config.max_collisions_per_cell);
        let plan = selector.plan(cell, &table, buf, dt, rng, &mut stats.nan_repairs)?;
        if plan.clamped {
            stats.clamp_events += 1;
        }

        let n = cell.len();
        let mut samples: [Vec<f64>; 3] = Default::default();
        for class in ChannelClass::ALL {
            let k = class.index();
            let sv_max = plan.sigma_v_max[k];
            for _ in 0..plan.candidates[k] {
                let (i, j) = random_pair(n, rng);
                stats.candidates += 1;
                let sv = table.build_class(&cell.particles[i], &cell.particles[j], class, buf, &mut stats.nan_repairs);
                if !(sv > 0.0) {
                    continue;
                }
                samples[k].push(sv);

                let (wi, wj) = (cell.particles[i].weight, cell.particles[j].weight);
                let mut p_accept = wi.max(wj) * sv / (plan.w_max * sv_max);
                if !p_accept.is_finite() {
                    p_accept = 1.0;
                }
                if p_accept > 1.0 {
                    stats.overflows += 1;
                    log::warn!(
                        "cell {}: {class:?} acceptance ratio {p_accept:.3} > 1; clamped",
                        cell.id
                    );
                    p_accept = 1.0;
                }
                if rng.gen::<f64>() >= p_accept {
                    continue;
                }

                let Some(index) = ChannelSelector::draw(buf, rng)? else {
                    continue;
                };
                let channel = buf.channels()[index].clone();
                let stat_weight = wi.min(wj) / plan.clamp_scale;
                self.apply(cell, i, j, &channel, stat_weight, dt, rng, &mut stats)?;
                stats.accepted += 1;
            }
        }

        for class in ChannelClass::ALL {
            self.ntc.observe((cell.id, class), &samples[class.index()])?;
        }
        for p in &cell.particles {
            stats.record_cooling_dt(p.cooling_dt);
        }
        stats.ledger_total = cell.ledger_total();
        log::debug!(
            "cell {}: {} candidates, {} accepted, ready {:?}, ledger {:.3e} J",
            cell.id,
            stats.candidates,
            stats.accepted,
            plan.ready,
            stats.ledger_total
        );
        Ok(stats)
    }

    /// Commit `channel` for the pair `(i, j)` and scatter it.
    #[allow(clippy::too_many_arguments)]
    fn apply<R: Rng + ?Sized>(
        &self,
        cell: &mut Cell,
        i: usize,
        j: usize,
        channel: &Channel,
        stat_weight: f64,
        dt: f64,
        rng: &mut R,
        stats: &mut CollisionStats,
    ) -> CollideResult<()> {
        let (first, second) = pair_mut(&mut cell.particles, i, j)?;
        let commit = ChannelSelector::commit(channel, first, second, stat_weight, rng, stats)?;

        let angle = match (&channel.kind, self.config.deflection) {
            (InteractionKind::Coulomb { b90, b_max }, DeflectionModel::Rutherford) => ScatterAngle::Rutherford {
                b90: *b90,
                b_max: *b_max,
            },
            _ => ScatterAngle::Isotropic,
        };
        let (role1, role2) = if channel.projectile.side == Side::First {
            (channel.projectile.role, channel.target.role)
        } else {
            (channel.target.role, channel.projectile.role)
        };
        let electrons = self.config.electrons;
        let outcome = self.engine.scatter(
            field_body(first, role1, electrons),
            field_body(second, role2, electrons),
            commit.delta_e,
            angle,
            rng,
        )?;

        stats.record_event(channel.tag(), commit.delta_e);
        stats.deferred_energy += outcome.deferred;
        stats.ke_delta += outcome.ke_delta;
        stats.carried_energy += commit.carried;

        if commit.delta_e > 0.0 {
            let c = &self.config.cooling;
            let suggest = dt * (outcome.available / commit.delta_e).max(c.floor) * c.scale;
            first.cooling_dt = first.cooling_dt.min(suggest);
            second.cooling_dt = second.cooling_dt.min(suggest);
        }
        Ok(())
    }
}

/// Mutable references to two distinct elements of `items`.
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> CollideResult<(&mut T, &mut T)> {
    let n = items.len();
    if i == j || i >= n || j >= n {
        return Err(CollideError::LogicError(format!(
            "invalid pair ({i}, {j}) in a cell of {n} particles"
        )));
    }
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        Ok((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(i);
        Ok((&mut hi[0], &mut lo[j]))
    }
}

/// Velocity field of `p` touched by a participant of role `role`.
///
/// Electrons scatter their own field only when carried explicitly and
/// present; otherwise the bulk field stands in for them.
fn field_body(p: &mut SuperParticle, role: Role, electrons: ElectronModel) -> ScatterBody<'_> {
    let weight = p.weight;
    let electron_weight = p.electron_count();
    let atom_mass = p.atom_mass();
    match (electrons, role, p.elec_vel.as_mut()) {
        (ElectronModel::Explicit, Role::Electron, Some(ve)) if electron_weight > 0.0 => ScatterBody {
            vel: ve,
            weight: electron_weight,
            mass: M_ELECTRON,
            ledger: &mut p.ledger,
            field: Field::Electron,
        },
        _ => ScatterBody {
            vel: &mut p.vel,
            weight,
            mass: atom_mass,
            ledger: &mut p.ledger,
            field: Field::Ion,
        },
    }
}
