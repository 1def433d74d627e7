//! Habitat Complementarity
//!
//! Sub-basin classification relative to the whole run:
//! 1. Aggregate suitable spawning and rearing length (km) per sub-basin
//! 2. Mean and sample standard deviation of rearing length over every
//!    sub-basin (fan-in, needs at least two)
//! 3. Classify each sub-basin against those statistics (fan-out)
//!
//! Spawning index: 1 below the minimum habitat length, else 2.
//! Rearing index: 0 below the minimum, then 1 / 2 / 3 for at or below
//! mean − sd, at or below mean + sd, above mean + sd.
//! HCI = spawning index × rearing index (0–6).

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HipError, Result};
use crate::network::{NetworkModel, SubBasinId};
use crate::suitability::HipTable;

/// Default HIP at or above which a reach counts as suitable
pub const DEFAULT_SUITABILITY_THRESHOLD: f64 = 0.75;

/// Default minimum habitat length (km) for a sub-basin to count as having habitat
pub const DEFAULT_MIN_HABITAT_KM: f64 = 0.1;

/// Suitable habitat length in one sub-basin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitatLengths {
    pub sub_basin: SubBasinId,
    pub spawning_km: f64,
    pub rearing_km: f64,
}

/// Total length of reaches with HIP >= `threshold`, per sub-basin
///
/// Every sub-basin referenced by the network is listed (in id order), with
/// zero totals when none of its reaches is suitable. Reaches outside any
/// sub-basin are ignored.
pub fn suitable_length_by_sub_basin(
    network: &NetworkModel,
    spawning: &HipTable,
    rearing: &HipTable,
    threshold: f64,
) -> Vec<HabitatLengths> {
    let mut totals: BTreeMap<SubBasinId, (f64, f64)> = BTreeMap::new();

    for ((reach, spawn), rear) in network
        .reaches()
        .iter()
        .zip(spawning.as_slice())
        .zip(rearing.as_slice())
    {
        let Some(sub_basin) = reach.sub_basin else {
            continue;
        };
        let km = if reach.length_m.is_finite() { reach.length_m / 1000.0 } else { 0.0 };
        let entry = totals.entry(sub_basin).or_insert((0.0, 0.0));
        if spawn.value >= threshold {
            entry.0 += km;
        }
        if rear.value >= threshold {
            entry.1 += km;
        }
    }

    totals
        .into_iter()
        .map(|(sub_basin, (spawning_km, rearing_km))| HabitatLengths {
            sub_basin,
            spawning_km,
            rearing_km,
        })
        .collect()
}

/// Population statistics of rearing length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RearingStats {
    pub count: usize,
    pub mean: f64,
    /// Sample (n − 1) standard deviation
    pub std_dev: f64,
}

impl RearingStats {
    /// Single accumulation pass (Welford) over the rearing lengths
    ///
    /// Values are accumulated in sorted order so the result does not depend
    /// on sub-basin order.
    pub fn from_lengths(lengths: &[HabitatLengths]) -> Result<Self> {
        let count = lengths.len();
        if count < 2 {
            return Err(HipError::InsufficientSamples { count });
        }

        let mut values: Vec<f64> = lengths.iter().map(|l| l.rearing_km).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, &x) in values.iter().enumerate() {
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }

        Ok(RearingStats {
            count,
            mean,
            std_dev: (m2 / (count - 1) as f64).sqrt(),
        })
    }

    pub fn lower_bound(&self) -> f64 {
        self.mean - self.std_dev
    }

    pub fn upper_bound(&self) -> f64 {
        self.mean + self.std_dev
    }
}

/// Classification of one sub-basin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplementarityIndex {
    pub sub_basin: SubBasinId,
    pub spawning_km: f64,
    pub rearing_km: f64,
    pub spawning_index: u8,
    pub rearing_index: u8,
    /// Habitat complementarity index, spawning × rearing
    pub hci: u8,
}

/// Classified sub-basins plus the statistics they were classified against
#[derive(Debug, Clone, PartialEq)]
pub struct ComplementarityTable {
    pub stats: RearingStats,
    pub indices: Vec<ComplementarityIndex>,
}

impl ComplementarityTable {
    pub fn get(&self, sub_basin: SubBasinId) -> Option<&ComplementarityIndex> {
        self.indices.iter().find(|i| i.sub_basin == sub_basin)
    }
}

#[derive(Debug, Clone)]
pub struct ComplementarityClassifier {
    min_length_km: f64,
    parallel: bool,
}

impl Default for ComplementarityClassifier {
    fn default() -> Self {
        Self {
            min_length_km: DEFAULT_MIN_HABITAT_KM,
            parallel: true,
        }
    }
}

impl ComplementarityClassifier {
    pub fn new(min_length_km: f64) -> Self {
        Self {
            min_length_km,
            ..Self::default()
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn spawning_index(&self, spawning_km: f64) -> u8 {
        if spawning_km < self.min_length_km {
            1
        } else {
            2
        }
    }

    pub fn rearing_index(&self, rearing_km: f64, stats: &RearingStats) -> u8 {
        if rearing_km < self.min_length_km {
            0
        } else if rearing_km <= stats.lower_bound() {
            1
        } else if rearing_km <= stats.upper_bound() {
            2
        } else {
            3
        }
    }

    fn index(&self, lengths: &HabitatLengths, stats: &RearingStats) -> ComplementarityIndex {
        let spawning_index = self.spawning_index(lengths.spawning_km);
        let rearing_index = self.rearing_index(lengths.rearing_km, stats);
        ComplementarityIndex {
            sub_basin: lengths.sub_basin,
            spawning_km: lengths.spawning_km,
            rearing_km: lengths.rearing_km,
            spawning_index,
            rearing_index,
            hci: spawning_index * rearing_index,
        }
    }

    /// Two-pass classification. Output follows input order.
    pub fn classify(&self, lengths: &[HabitatLengths]) -> Result<ComplementarityTable> {
        // Pass 1: statistics complete before any classification starts
        let stats = RearingStats::from_lengths(lengths)?;

        // Pass 2
        let indices: Vec<ComplementarityIndex> = if self.parallel {
            lengths.par_iter().map(|l| self.index(l, &stats)).collect()
        } else {
            lengths.iter().map(|l| self.index(l, &stats)).collect()
        };

        tracing::debug!(
            "Classified {} sub-basins (rearing mean {:.3} km, sd {:.3} km)",
            stats.count,
            stats.mean,
            stats.std_dev
        );

        Ok(ComplementarityTable { stats, indices })
    }
}
