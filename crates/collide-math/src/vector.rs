// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Vector
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fixed-size 3-vector helpers and the post-collision rotation of a
//! relative-velocity vector by a scattering angle.

use std::f64::consts::PI;

pub type Vec3 = [f64; 3];

pub const ZERO: Vec3 = [0.0; 3];

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn norm_sq(a: &Vec3) -> f64 {
    dot(a, a)
}

#[inline]
pub fn norm(a: &Vec3) -> f64 {
    norm_sq(a).sqrt()
}

#[inline]
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(s: f64, a: &Vec3) -> Vec3 {
    [s * a[0], s * a[1], s * a[2]]
}

/// `s·x + y`
#[inline]
pub fn axpy(s: f64, x: &Vec3, y: &Vec3) -> Vec3 {
    [s * x[0] + y[0], s * x[1] + y[1], s * x[2] + y[2]]
}

/// Weighted mean `(wa·a + wb·b)/(wa + wb)`; zero if both weights vanish.
pub fn weighted_mean(wa: f64, a: &Vec3, wb: f64, b: &Vec3) -> Vec3 {
    let w = wa + wb;
    if w <= 0.0 {
        return ZERO;
    }
    [
        (wa * a[0] + wb * b[0]) / w,
        (wa * a[1] + wb * b[1]) / w,
        (wa * a[2] + wb * b[2]) / w,
    ]
}

#[inline]
pub fn is_finite(a: &Vec3) -> bool {
    a.iter().all(|x| x.is_finite())
}

/// Rotate `g` by polar scattering angle χ (given as `cos_chi`) and
/// azimuth `azimuth` about its own direction. The magnitude is preserved.
///
/// Euler-angle form: θ, φ locate `g` in the lab frame, then the new
/// direction is built from (χ, azimuth) relative to it. A zero vector is
/// returned unchanged.
pub fn rotate(g: &Vec3, cos_chi: f64, azimuth: f64) -> Vec3 {
    let gm = norm(g);
    if gm == 0.0 {
        return *g;
    }
    let [gx, gy, gz] = *g;
    let theta = if gx == 0.0 {
        0.5 * PI
    } else {
        (gy * gy + gz * gz).sqrt().atan2(gx)
    };
    let phi = if gy == 0.0 {
        if gz > 0.0 {
            0.5 * PI
        } else {
            -0.5 * PI
        }
    } else {
        gz.atan2(gy)
    };

    let cc = cos_chi.clamp(-1.0, 1.0);
    let sc = (1.0 - cc * cc).max(0.0).sqrt();
    let (se, ce) = azimuth.sin_cos();
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();

    [
        gm * (ct * cc - st * sc * ce),
        gm * (st * cp * cc + ct * cp * sc * ce - sp * sc * se),
        gm * (st * sp * cc + ct * sp * sc * ce + cp * sc * se),
    ]
}
