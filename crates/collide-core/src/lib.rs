// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Collide Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! NTC collision kernel for weighted plasma super-particles.
//!
//! Layers, leaves first: cross-section provider seam, channels and the
//! pair cross-section table, NTC candidate selection, channel selection,
//! energy ledger and scatter, then the per-cell loop and the parallel
//! kernel.

pub mod cell;
pub mod channel;
pub mod cross_section;
pub mod diagnostics;
pub mod kernel;
pub mod ledger;
pub mod ntc;
pub mod pair_table;
pub mod scatter;
pub mod selector;

pub use cross_section::{CrossSectionProvider, HydrogenicModel};
pub use diagnostics::CollisionStats;
pub use kernel::CollisionKernel;
