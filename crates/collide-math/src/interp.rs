// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Interp
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 1D interpolation, cumulative-distribution lookup, and tabulated
//! energy-loss sampling.

use collide_types::error::{CollideError, CollideResult};
use ndarray::Array1;

/// Linear interpolation of `y(x)` at `xq` on an ascending grid.
///
/// Clamps to the end values outside the grid.
pub fn interp1d(x: &Array1<f64>, y: &Array1<f64>, xq: f64) -> f64 {
    let n = x.len();
    if n == 0 {
        return 0.0;
    }
    if xq <= x[0] || n == 1 {
        return y[0];
    }
    if xq >= x[n - 1] {
        return y[n - 1];
    }
    // First index with x[i] > xq; guaranteed in 1..n
    let i = x
        .as_slice()
        .map(|s| s.partition_point(|&v| v <= xq))
        .unwrap_or_else(|| x.iter().take_while(|&&v| v <= xq).count())
        .clamp(1, n - 1);
    let span = x[i] - x[i - 1];
    if span <= 0.0 {
        return y[i];
    }
    let t = (xq - x[i - 1]) / span;
    (1.0 - t) * y[i - 1] + t * y[i]
}

/// Index of the first bin whose cumulative value exceeds `target`.
///
/// `cdf` must be non-decreasing. When round-off pushes `target` past the
/// last entry the last index is returned. Returns `None` for an empty
/// slice.
pub fn cdf_index(cdf: &[f64], target: f64) -> Option<usize> {
    if cdf.is_empty() {
        return None;
    }
    let i = cdf.partition_point(|&c| c <= target);
    Some(i.min(cdf.len() - 1))
}

/// Whether a table's energies are absolute or a fraction of the
/// projectile energy passed at sampling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossScale {
    /// Energies in eV.
    Absolute,
    /// Energies are fractions of the incoming energy.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    /// A set of discrete line energies.
    Lines,
    /// A continuous distribution, piecewise linear in the CDF.
    Continuous,
}

/// Sampling table for the energy lost in one inelastic event.
#[derive(Debug, Clone, PartialEq)]
pub struct LossTable {
    kind: TableKind,
    scale: LossScale,
    energies: Array1<f64>,
    cdf: Array1<f64>,
}

impl LossTable {
    /// Discrete lines `(energy, relative weight)`, stored by ascending energy.
    pub fn lines(lines: &[(f64, f64)], scale: LossScale) -> CollideResult<Self> {
        if lines.is_empty() {
            return Err(CollideError::ConfigError(
                "loss table needs at least one line".to_string(),
            ));
        }
        if lines
            .iter()
            .any(|&(e, w)| !e.is_finite() || e < 0.0 || !w.is_finite() || w < 0.0)
        {
            return Err(CollideError::ConfigError(
                "loss table lines must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = lines.iter().map(|l| l.1).sum();
        if total <= 0.0 {
            return Err(CollideError::ConfigError(
                "loss table line weights sum to zero".to_string(),
            ));
        }
        let mut lines = lines.to_vec();
        lines.sort_by(|a, b| a.0.total_cmp(&b.0));
        let energies = Array1::from_iter(lines.iter().map(|l| l.0));
        let mut acc = 0.0;
        let cdf = Array1::from_iter(lines.iter().map(|l| {
            acc += l.1 / total;
            acc
        }));
        Ok(LossTable {
            kind: TableKind::Lines,
            scale,
            energies,
            cdf,
        })
    }

    /// Continuous distribution with density ∝ 1/E on `[e_min, e_max]`
    /// (uniform in ln E), tabulated on `n` log-spaced nodes.
    pub fn log_uniform(e_min: f64, e_max: f64, n: usize, scale: LossScale) -> CollideResult<Self> {
        if !(e_min > 0.0 && e_max > e_min && e_max.is_finite()) {
            return Err(CollideError::ConfigError(format!(
                "log-uniform table needs 0 < e_min < e_max, got [{e_min}, {e_max}]"
            )));
        }
        if n < 2 {
            return Err(CollideError::ConfigError(
                "log-uniform table needs at least 2 nodes".to_string(),
            ));
        }
        let energies = Array1::logspace(10.0, e_min.log10(), e_max.log10(), n);
        let cdf = Array1::linspace(0.0, 1.0, n);
        Ok(LossTable {
            kind: TableKind::Continuous,
            scale,
            energies,
            cdf,
        })
    }

    /// Draw a loss for uniform `u ∈ [0, 1)` at projectile energy
    /// `reference` [eV].
    ///
    /// Relative tables are scaled by `reference`. Line tables only offer
    /// lines the projectile can pay for: lines above `reference` are
    /// closed and the open ones share the draw in proportion to their
    /// branching. Returns zero when no line is open.
    pub fn sample(&self, u: f64, reference: f64) -> f64 {
        let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
        let scale = match self.scale {
            LossScale::Absolute => 1.0,
            LossScale::Relative => reference,
        };
        match self.kind {
            TableKind::Lines => {
                let open = self
                    .energies
                    .iter()
                    .take_while(|&&e| e * scale <= reference)
                    .count();
                if open == 0 {
                    return 0.0;
                }
                let cdf = match self.cdf.as_slice() {
                    Some(c) => &c[..open],
                    None => return 0.0,
                };
                let weight = cdf[open - 1];
                if !(weight > 0.0) {
                    return 0.0;
                }
                match cdf_index(cdf, u * weight) {
                    Some(i) => self.energies[i] * scale,
                    None => 0.0,
                }
            }
            TableKind::Continuous => interp1d(&self.cdf, &self.energies, u) * scale,
        }
    }
}
