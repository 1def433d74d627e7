//! HIP scoring
//!
//! HIP = min(connectivity, habitat), clamped to [0, 1], where
//! - connectivity = geometric mean of (barrier, short-range MGD, long-range MGD)
//! - habitat = geometric mean of the profile's habitat sub-scores
//!
//! Geometric means take the absolute value of the product before the root so
//! small negative sub-scores cannot produce NaN. A product that overflows
//! against a zero factor counts as 0. Results above 1 fold to 1.
//!
//! Includes both sequential and parallel (Rayon) network scoring.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::profile::{ConnectivityCurves, ProfileKey, ProfileLibrary, SpeciesProfile};
use crate::complementarity::DEFAULT_SUITABILITY_THRESHOLD;
use crate::connectivity::ReachConnectivity;
use crate::error::{HipError, Result};
use crate::network::{NetworkModel, Reach, ReachId};

/// HIP for one reach under one profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HipResult {
    /// Final score in [0, 1]
    pub value: f64,
    /// None for profiles without connectivity curves
    pub connectivity: Option<f64>,
    pub habitat: f64,
}

/// |∏ sᵢ|^(1/n); 0 for an empty slice
pub fn geometric_mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let product: f64 = scores.iter().product();
    if product.is_nan() {
        return 0.0;
    }
    product.abs().powf(1.0 / scores.len() as f64)
}

pub fn connectivity_score(curves: &ConnectivityCurves, conn: &ReachConnectivity) -> f64 {
    let barrier = if conn.barrier_downstream { 0.0 } else { 1.0 };
    let short = curves.short_range.evaluate(Some(f64::from(conn.mgd_short_range)));
    let long = curves.long_range.evaluate(Some(f64::from(conn.mgd_long_range)));
    geometric_mean(&[barrier, short, long])
}

/// Geometric mean of the habitat sub-scores
pub fn habitat_score(profile: &SpeciesProfile, reach: &Reach) -> Result<f64> {
    let scores = profile
        .habitat
        .iter()
        .map(|h| {
            let value = h.covariate.read(reach).ok_or_else(|| HipError::MissingCovariate {
                profile: profile.key.to_string(),
                reach: reach.id,
                covariate: h.covariate.to_string(),
            })?;
            Ok(h.curve.evaluate(value))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(geometric_mean(&scores))
}

/// Score one reach
///
/// `conn` is required when the profile has connectivity curves.
pub fn score_reach(
    profile: &SpeciesProfile,
    reach: &Reach,
    conn: Option<&ReachConnectivity>,
) -> Result<HipResult> {
    let habitat = habitat_score(profile, reach)?;

    let connectivity = match &profile.connectivity {
        None => None,
        Some(curves) => {
            let conn = conn.ok_or_else(|| HipError::MissingCovariate {
                profile: profile.key.to_string(),
                reach: reach.id,
                covariate: "connectivity".to_string(),
            })?;
            Some(connectivity_score(curves, conn))
        }
    };

    let raw = match connectivity {
        Some(c) => c.min(habitat),
        None => habitat,
    };

    Ok(HipResult {
        // max/min rather than clamp: NaN maps to 0
        value: raw.max(0.0).min(1.0),
        connectivity,
        habitat,
    })
}

/// HIP results for one profile, aligned with the network's reach order
#[derive(Debug, Clone, PartialEq)]
pub struct HipTable {
    pub key: ProfileKey,
    results: Vec<HipResult>,
}

impl HipTable {
    pub fn get(&self, idx: usize) -> &HipResult {
        &self.results[idx]
    }

    pub fn as_slice(&self) -> &[HipResult] {
        &self.results
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.results.iter().map(|r| r.value)
    }

    pub fn by_id(&self, network: &NetworkModel, id: ReachId) -> Option<&HipResult> {
        network.index_of(id).map(|i| &self.results[i])
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Scores whole networks against profiles
pub struct HipScorer<'a> {
    network: &'a NetworkModel,
    connectivity: Option<&'a [ReachConnectivity]>,
    parallel: bool,
    suitability_threshold: f64,
}

impl<'a> HipScorer<'a> {
    /// `connectivity` must follow the network's reach order
    pub fn new(network: &'a NetworkModel, connectivity: Option<&'a [ReachConnectivity]>) -> Self {
        Self {
            network,
            connectivity,
            parallel: true,
            suitability_threshold: DEFAULT_SUITABILITY_THRESHOLD,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Threshold used only for the per-profile log summary
    pub fn with_suitability_threshold(mut self, threshold: f64) -> Self {
        self.suitability_threshold = threshold;
        self
    }

    fn suitable_count(&self, results: &[HipResult]) -> usize {
        results
            .iter()
            .filter(|r| r.value >= self.suitability_threshold)
            .count()
    }

    fn score_index(&self, profile: &SpeciesProfile, idx: usize) -> Result<HipResult> {
        let conn = self.connectivity.and_then(|c| c.get(idx));
        score_reach(profile, self.network.reach(idx), conn)
    }

    /// Score every reach of the network
    ///
    /// The first failing reach in network order is reported.
    pub fn score_network(&self, profile: &SpeciesProfile) -> Result<HipTable> {
        profile.validate()?;

        let n = self.network.len();
        let results: Vec<Result<HipResult>> = if self.parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.score_index(profile, i))
                .collect()
        } else {
            (0..n).map(|i| self.score_index(profile, i)).collect()
        };
        let results = results.into_iter().collect::<Result<Vec<_>>>()?;

        let suitable = self.suitable_count(&results);
        tracing::debug!(
            "Scored {} reaches for '{}' ({} with HIP >= {})",
            n,
            profile.key,
            suitable,
            self.suitability_threshold
        );

        Ok(HipTable {
            key: profile.key.clone(),
            results,
        })
    }

    /// Score several profiles; one profile failing does not affect the others
    pub fn score_all(
        &self,
        library: &ProfileLibrary,
        keys: &[ProfileKey],
    ) -> Vec<(ProfileKey, Result<HipTable>)> {
        let score_one = |key: &ProfileKey| {
            let table = library.get(key).and_then(|p| self.score_network(p));
            (key.clone(), table)
        };
        if self.parallel {
            keys.par_iter().map(score_one).collect()
        } else {
            keys.iter().map(score_one).collect()
        }
    }
}
