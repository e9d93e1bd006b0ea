// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Quantile
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Streaming quantile estimate in O(1) memory (P² algorithm,
//! Jain & Chlamtac 1985).
//!
//! Five markers track the minimum, p/2, p, (1+p)/2 quantiles and the
//! maximum. Marker heights are adjusted with a piecewise-parabolic
//! prediction, falling back to linear when the parabola would break
//! monotonicity.

use collide_types::error::{CollideError, CollideResult};

#[derive(Debug, Clone, PartialEq)]
pub struct P2Quantile {
    p: f64,
    count: u64,
    heights: [f64; 5],
    positions: [f64; 5],
    desired: [f64; 5],
    increments: [f64; 5],
}

impl P2Quantile {
    pub fn new(p: f64) -> CollideResult<Self> {
        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
            return Err(CollideError::ConfigError(format!(
                "quantile must be in (0, 1), got {p}"
            )));
        }
        Ok(P2Quantile {
            p,
            count: 0,
            heights: [0.0; 5],
            positions: [0.0, 1.0, 2.0, 3.0, 4.0],
            desired: [0.0, 2.0 * p, 4.0 * p, 2.0 + 2.0 * p, 4.0],
            increments: [0.0, 0.5 * p, p, 0.5 * (1.0 + p), 1.0],
        })
    }

    pub fn quantile(&self) -> f64 {
        self.p
    }

    /// Number of finite samples observed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// True once at least `min_samples` samples have been seen.
    pub fn is_ready(&self, min_samples: usize) -> bool {
        self.count >= min_samples.max(5) as u64
    }

    /// Largest sample seen so far.
    pub fn max(&self) -> Option<f64> {
        match self.count {
            0 => None,
            n if n < 5 => self.heights[..n as usize].iter().copied().reduce(f64::max),
            _ => Some(self.heights[4]),
        }
    }

    /// Feed one sample. Non-finite samples are dropped; returns whether
    /// the sample was used.
    pub fn observe(&mut self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        if self.count < 5 {
            self.heights[self.count as usize] = x;
            self.count += 1;
            if self.count == 5 {
                self.heights.sort_by(f64::total_cmp);
            }
            return true;
        }
        self.count += 1;

        let q = &mut self.heights;
        let k = if x < q[0] {
            q[0] = x;
            0
        } else if x >= q[4] {
            q[4] = x;
            3
        } else {
            let mut k = 0;
            while k < 3 && x >= q[k + 1] {
                k += 1;
            }
            k
        };

        for n in self.positions.iter_mut().skip(k + 1) {
            *n += 1.0;
        }
        for (d, inc) in self.desired.iter_mut().zip(self.increments.iter()) {
            *d += inc;
        }

        for i in 1..4 {
            let d = self.desired[i] - self.positions[i];
            let up = d >= 1.0 && self.positions[i + 1] - self.positions[i] > 1.0;
            let down = d <= -1.0 && self.positions[i - 1] - self.positions[i] < -1.0;
            if up || down {
                let s = if d > 0.0 { 1.0 } else { -1.0 };
                let qp = self.parabolic(i, s);
                self.heights[i] = if self.heights[i - 1] < qp && qp < self.heights[i + 1] {
                    qp
                } else {
                    self.linear(i, s)
                };
                self.positions[i] += s;
            }
        }
        true
    }

    /// Current estimate of the tracked quantile.
    ///
    /// Below five samples the nearest-rank quantile of the buffered
    /// samples is returned.
    pub fn estimate(&self) -> Option<f64> {
        match self.count {
            0 => None,
            n if n < 5 => {
                let mut buf: Vec<f64> = self.heights[..n as usize].to_vec();
                buf.sort_by(f64::total_cmp);
                let rank = ((self.p * n as f64).ceil() as usize).clamp(1, n as usize);
                Some(buf[rank - 1])
            }
            _ => Some(self.heights[2]),
        }
    }

    fn parabolic(&self, i: usize, s: f64) -> f64 {
        let q = &self.heights;
        let n = &self.positions;
        q[i] + s / (n[i + 1] - n[i - 1])
            * ((n[i] - n[i - 1] + s) * (q[i + 1] - q[i]) / (n[i + 1] - n[i])
                + (n[i + 1] - n[i] - s) * (q[i] - q[i - 1]) / (n[i] - n[i - 1]))
    }

    fn linear(&self, i: usize, s: f64) -> f64 {
        let j = if s > 0.0 { i + 1 } else { i - 1 };
        self.heights[i] + s * (self.heights[j] - self.heights[i]) / (self.positions[j] - self.positions[i])
    }
}
