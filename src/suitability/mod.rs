//! Suitability Scoring
//!
//! Converts reach covariates into a per-species, per-life-stage Habitat
//! Intrinsic Potential (HIP). Behavior is fully determined by the
//! [`SpeciesProfile`] passed in.

pub mod covariate;
pub mod curve;
pub mod library;
pub mod profile;
pub mod scorer;

pub use covariate::Covariate;
pub use curve::{NullPolicy, SuitabilityCurve};
pub use profile::{
    ConnectivityCurves, CovariateCurve, LifeStage, ProfileKey, ProfileLibrary, SpeciesProfile,
};
pub use scorer::{
    connectivity_score, geometric_mean, habitat_score, score_reach, HipResult, HipScorer, HipTable,
};
