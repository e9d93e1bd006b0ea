// ─────────────────────────────────────────────────────────────────────
// NTC Collide — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollideError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Invalid particle at index {index}: {message}")]
    InvalidParticle { index: usize, message: String },

    /// Programming defect (negative energy request, impossible selection index).
    /// Callers are expected to abort the run when they see this.
    #[error("Logic error: {0}")]
    LogicError(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CollideError {
    /// True for the error class that indicates a defect rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollideError::LogicError(_))
    }
}

pub type CollideResult<T> = Result<T, CollideError>;
