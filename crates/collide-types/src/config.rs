// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{CollideError, CollideResult};
use serde::{Deserialize, Serialize};

/// Top-level collision kernel configuration.
/// Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub ntc: NtcConfig,
    /// Ceiling on candidate pairs per cell per step; counts above it are
    /// scaled down and the selected channels reweighted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_collisions_per_cell: Option<usize>,
    /// Solve the blend coefficient so post-scatter energy is exact.
    #[serde(default = "default_true")]
    pub exact_energy: bool,
    #[serde(default)]
    pub electrons: ElectronModel,
    #[serde(default)]
    pub coulomb: CoulombConfig,
    #[serde(default)]
    pub elastic: ElasticConfig,
    #[serde(default)]
    pub deflection: DeflectionModel,
    #[serde(default)]
    pub cooling: CoolingConfig,
    /// Worker threads; `None` uses the global rayon pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// NTC maximum estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NtcConfig {
    /// Quantile of observed σ·v tracked as the "maximum" (default: 0.95)
    #[serde(default = "default_quantile")]
    pub quantile: f64,
    /// Samples needed before the cached quantile is trusted (default: 32)
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Pairs scanned for the on-the-fly maximum while the cache is cold (default: 256)
    #[serde(default = "default_bootstrap_pairs")]
    pub bootstrap_pairs: usize,
}

/// Whether electrons carry their own velocity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectronModel {
    /// Electrons share the ion velocity; electron channels scatter the bulk fields.
    #[default]
    Implicit,
    /// Each particle carries `elec_vel`; electron channels scatter it.
    Explicit,
}

/// Maximum impact parameter used in the Coulomb logarithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoulombCutoff {
    /// Debye length, falling back to interparticle spacing when undefined.
    #[default]
    Debye,
    InterparticleSpacing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoulombConfig {
    #[serde(default)]
    pub cutoff: CoulombCutoff,
    /// Floor on ln Λ (default: 2.0)
    #[serde(default = "default_min_log")]
    pub min_log: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Multiplier on geometric atom–atom/atom–ion cross sections (default: 1.0)
    #[serde(default = "default_one")]
    pub neutral_scale: f64,
    /// Multiplier on the atom–electron elastic cross section (default: 1.0)
    #[serde(default = "default_one")]
    pub electron_scale: f64,
}

/// Scattering-angle policy for charged–charged channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeflectionModel {
    #[default]
    Isotropic,
    /// Screened Rutherford draw with impact parameter uniform in π b_max².
    Rutherford,
}

/// Timestep feedback: `dt_suggest = dt · max(floor, kE/ΔE) · scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingConfig {
    #[serde(default = "default_cooling_floor")]
    pub floor: f64,
    #[serde(default = "default_one")]
    pub scale: f64,
}

fn default_true() -> bool {
    true
}
fn default_seed() -> u64 {
    0x5eed
}
fn default_quantile() -> f64 {
    0.95
}
fn default_min_samples() -> usize {
    32
}
fn default_bootstrap_pairs() -> usize {
    256
}
fn default_min_log() -> f64 {
    2.0
}
fn default_one() -> f64 {
    1.0
}
fn default_cooling_floor() -> f64 {
    0.01
}

impl Default for NtcConfig {
    fn default() -> Self {
        NtcConfig {
            quantile: default_quantile(),
            min_samples: default_min_samples(),
            bootstrap_pairs: default_bootstrap_pairs(),
        }
    }
}

impl Default for CoulombConfig {
    fn default() -> Self {
        CoulombConfig {
            cutoff: CoulombCutoff::default(),
            min_log: default_min_log(),
        }
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        ElasticConfig {
            neutral_scale: default_one(),
            electron_scale: default_one(),
        }
    }
}

impl Default for CoolingConfig {
    fn default() -> Self {
        CoolingConfig {
            floor: default_cooling_floor(),
            scale: default_one(),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            ntc: NtcConfig::default(),
            max_collisions_per_cell: None,
            exact_energy: true,
            electrons: ElectronModel::default(),
            coulomb: CoulombConfig::default(),
            elastic: ElasticConfig::default(),
            deflection: DeflectionModel::default(),
            cooling: CoolingConfig::default(),
            threads: None,
            seed: default_seed(),
        }
    }
}

impl KernelConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> CollideResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse from a JSON string and validate.
    pub fn from_json_str(contents: &str) -> CollideResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CollideResult<()> {
        let q = self.ntc.quantile;
        if !q.is_finite() || q <= 0.0 || q >= 1.0 {
            return Err(CollideError::ConfigError(format!(
                "ntc.quantile must be in (0, 1), got {q}"
            )));
        }
        if self.ntc.min_samples < 5 {
            return Err(CollideError::ConfigError(format!(
                "ntc.min_samples must be >= 5, got {}",
                self.ntc.min_samples
            )));
        }
        if self.ntc.bootstrap_pairs == 0 {
            return Err(CollideError::ConfigError(
                "ntc.bootstrap_pairs must be > 0".to_string(),
            ));
        }
        if self.max_collisions_per_cell == Some(0) {
            return Err(CollideError::ConfigError(
                "max_collisions_per_cell must be > 0 when set".to_string(),
            ));
        }
        if !self.coulomb.min_log.is_finite() || self.coulomb.min_log <= 0.0 {
            return Err(CollideError::ConfigError(format!(
                "coulomb.min_log must be finite and > 0, got {}",
                self.coulomb.min_log
            )));
        }
        for (name, v) in [
            ("elastic.neutral_scale", self.elastic.neutral_scale),
            ("elastic.electron_scale", self.elastic.electron_scale),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(CollideError::ConfigError(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        for (name, v) in [
            ("cooling.floor", self.cooling.floor),
            ("cooling.scale", self.cooling.scale),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(CollideError::ConfigError(format!(
                    "{name} must be finite and > 0, got {v}"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(CollideError::ConfigError(
                "threads must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let cfg = KernelConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, KernelConfig::default());
        assert!((cfg.ntc.quantile - 0.95).abs() < 1e-15);
        assert_eq!(cfg.ntc.min_samples, 32);
        assert!(cfg.exact_energy);
        assert_eq!(cfg.electrons, ElectronModel::Implicit);
        assert_eq!(cfg.seed, 0x5eed);
    }

    #[test]
    fn test_load_full_config() {
        let json = r#"{
            "ntc": { "quantile": 0.9, "min_samples": 64 },
            "max_collisions_per_cell": 500,
            "exact_energy": false,
            "electrons": "explicit",
            "coulomb": { "cutoff": "interparticle_spacing", "min_log": 3.0 },
            "deflection": "rutherford",
            "cooling": { "floor": 0.1 },
            "threads": 4,
            "seed": 99
        }"#;
        let cfg = KernelConfig::from_json_str(json).unwrap();
        assert!((cfg.ntc.quantile - 0.9).abs() < 1e-15);
        assert_eq!(cfg.ntc.bootstrap_pairs, 256);
        assert_eq!(cfg.max_collisions_per_cell, Some(500));
        assert!(!cfg.exact_energy);
        assert_eq!(cfg.electrons, ElectronModel::Explicit);
        assert_eq!(cfg.coulomb.cutoff, CoulombCutoff::InterparticleSpacing);
        assert_eq!(cfg.deflection, DeflectionModel::Rutherford);
        assert!((cfg.cooling.scale - 1.0).abs() < 1e-15);
        assert_eq!(cfg.threads, Some(4));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for json in [
            r#"{"ntc": {"quantile": 1.0}}"#,
            r#"{"ntc": {"min_samples": 2}}"#,
            r#"{"max_collisions_per_cell": 0}"#,
            r#"{"coulomb": {"min_log": -1.0}}"#,
            r#"{"cooling": {"scale": 0.0}}"#,
            r#"{"threads": 0}"#,
        ] {
            let err = KernelConfig::from_json_str(json).unwrap_err();
            assert!(
                matches!(err, CollideError::ConfigError(_)),
                "expected ConfigError for {json}, got {err}"
            );
        }
    }

    #[test]
    fn test_unknown_enum_is_json_error() {
        let err = KernelConfig::from_json_str(r#"{"electrons": "quantum"}"#).unwrap_err();
        assert!(matches!(err, CollideError::Json(_)));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut cfg = KernelConfig::default();
        cfg.max_collisions_per_cell = Some(100);
        cfg.threads = Some(2);
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2 = KernelConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, cfg2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = KernelConfig::from_file("/nonexistent/collide.json").unwrap_err();
        assert!(matches!(err, CollideError::Io(_)));
    }
}
