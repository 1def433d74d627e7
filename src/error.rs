//! Error types for HIP scoring
//!
//! Every error carries the identifier of what went wrong (reach id, profile
//! key, curve name or sub-basin count) so the caller can report it.

use thiserror::Error;

use crate::network::ReachId;

/// Main error type for the HIP core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HipError {
    /// Cycle, dangling parent reference or duplicate reach id. Fatal for the run.
    #[error("Invalid topology at reach {reach}: {reason}")]
    InvalidTopology { reach: ReachId, reason: String },

    /// A profile references a covariate the reach does not carry.
    #[error("Profile '{profile}' needs covariate '{covariate}' missing on reach {reach}")]
    MissingCovariate {
        profile: String,
        reach: ReachId,
        covariate: String,
    },

    #[error("Invalid curve '{curve}': {reason}")]
    InvalidCurve { curve: String, reason: String },

    /// Population statistics need at least two sub-basins.
    #[error("Not enough sub-basins for habitat complementarity: {count} (need at least 2)")]
    InsufficientSamples { count: usize },

    #[error("Profile '{profile}' not found in library")]
    UnknownProfile { profile: String },
}

/// Result type alias for HIP operations
pub type Result<T> = std::result::Result<T, HipError>;
