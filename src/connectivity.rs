//! Downstream Path Aggregation (connectivity)
//!
//! For every reach, determines whether a barrier lies between the reach and
//! its outlet, and the maximum gradient downstream (MGD): the largest
//! threshold in a [`GradientThresholdSet`] strictly exceeded by the slope of
//! some eligible reach on that path, the reach itself included.
//!
//! One pre-order traversal per tree carries the running barrier flag and
//! running MGD from the outlet towards the headwaters, so the cost does not
//! grow with the number of thresholds beyond a binary search per reach.
//!
//! Reaches whose mean flow exceeds the mainstem flow limit never act as
//! gradient obstacles. Reaches with a null slope or null flow pass the running
//! values through unchanged.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HipError, Result};
use crate::network::{NetworkModel, Reach, ReachId};

/// Default mainstem exclusion limit (m³/s)
pub const DEFAULT_MAINSTEM_FLOW_LIMIT: f64 = 500.0;

/// Sorted, de-duplicated gradient thresholds (percent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct GradientThresholdSet(Vec<u32>);

impl GradientThresholdSet {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        GradientThresholdSet(thresholds)
    }

    /// Every integer percentage from `low` to `high` inclusive
    pub fn from_range(low: u32, high: u32) -> Self {
        GradientThresholdSet((low..=high).collect())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest threshold strictly below `slope`, if any
    pub fn highest_exceeded(&self, slope: f64) -> Option<u32> {
        let below = self.0.partition_point(|&t| f64::from(t) < slope);
        below.checked_sub(1).map(|i| self.0[i])
    }
}

impl Default for GradientThresholdSet {
    fn default() -> Self {
        GradientThresholdSet::from_range(1, 20)
    }
}

impl From<Vec<u32>> for GradientThresholdSet {
    fn from(v: Vec<u32>) -> Self {
        GradientThresholdSet::new(v)
    }
}

impl From<GradientThresholdSet> for Vec<u32> {
    fn from(set: GradientThresholdSet) -> Self {
        set.0
    }
}

/// Parameters for path aggregation
#[derive(Debug, Clone)]
pub struct ConnectivityParams {
    pub thresholds: GradientThresholdSet,
    /// Reaches with mean flow above this limit are mainstem, never obstacles
    pub mainstem_flow_limit: f64,
}

impl Default for ConnectivityParams {
    fn default() -> Self {
        Self {
            thresholds: GradientThresholdSet::default(),
            mainstem_flow_limit: DEFAULT_MAINSTEM_FLOW_LIMIT,
        }
    }
}

/// Downstream-path aggregates for one reach at one segmentation scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityResult {
    pub barrier_downstream: bool,
    /// 0 when no eligible reach exceeds any threshold
    pub max_gradient_downstream: u32,
}

/// Results aligned with the network's reach order
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityTable {
    results: Vec<ConnectivityResult>,
}

impl ConnectivityTable {
    pub fn get(&self, idx: usize) -> &ConnectivityResult {
        &self.results[idx]
    }

    pub fn as_slice(&self) -> &[ConnectivityResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look a reach up by id
    pub fn by_id(&self, network: &NetworkModel, id: ReachId) -> Option<&ConnectivityResult> {
        network.index_of(id).map(|i| &self.results[i])
    }
}

/// Computes [`ConnectivityResult`] for every reach of a network
#[derive(Debug, Clone, Default)]
pub struct PathAggregator {
    params: ConnectivityParams,
}

impl PathAggregator {
    pub fn new(params: ConnectivityParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConnectivityParams {
        &self.params
    }

    /// Gradient obstacle contributed by the reach itself
    fn own_obstacle(&self, reach: &Reach) -> Option<u32> {
        let (slope, flow) = match (reach.slope_pct, reach.mean_flow_cms) {
            (Some(s), Some(q)) if s.is_finite() && q.is_finite() => (s, q),
            _ => return None,
        };
        if flow > self.params.mainstem_flow_limit {
            return None;
        }
        self.params.thresholds.highest_exceeded(slope)
    }

    /// Pre-order traversal of one tree. Returns (reach index, result) pairs.
    fn traverse_tree(
        &self,
        network: &NetworkModel,
        root: usize,
    ) -> Vec<(usize, ConnectivityResult)> {
        let mut out = Vec::new();
        let mut stack = vec![(root, ConnectivityResult::default())];

        while let Some((idx, inherited)) = stack.pop() {
            let reach = network.reach(idx);
            let mut running = inherited;
            running.barrier_downstream |= reach.barrier;
            if let Some(own) = self.own_obstacle(reach) {
                running.max_gradient_downstream = running.max_gradient_downstream.max(own);
            }
            out.push((idx, running));
            stack.extend(network.children(idx).iter().map(|&child| (child, running)));
        }

        out
    }

    fn assemble(
        network: &NetworkModel,
        per_tree: impl Iterator<Item = Vec<(usize, ConnectivityResult)>>,
    ) -> Result<ConnectivityTable> {
        let mut results: Vec<Option<ConnectivityResult>> = vec![None; network.len()];
        for tree in per_tree {
            for (idx, result) in tree {
                if results[idx].replace(result).is_some() {
                    return Err(HipError::InvalidTopology {
                        reach: network.reach(idx).id,
                        reason: "reach visited twice (multiple downstream paths)".to_string(),
                    });
                }
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(idx, r)| {
                r.ok_or_else(|| HipError::InvalidTopology {
                    reach: network.reach(idx).id,
                    reason: "reach not reachable from any outlet".to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(|results| ConnectivityTable { results })
    }

    /// Aggregate sequentially, one tree after another
    pub fn aggregate(&self, network: &NetworkModel) -> Result<ConnectivityTable> {
        let trees = network
            .roots()
            .iter()
            .map(|&root| self.traverse_tree(network, root));
        let table = Self::assemble(network, trees)?;
        self.log_summary(&table);
        Ok(table)
    }

    /// Aggregate with disjoint trees spread over the rayon pool
    ///
    /// Output is identical to [`PathAggregator::aggregate`].
    pub fn aggregate_parallel(&self, network: &NetworkModel) -> Result<ConnectivityTable> {
        let trees: Vec<Vec<(usize, ConnectivityResult)>> = network
            .roots()
            .par_iter()
            .map(|&root| self.traverse_tree(network, root))
            .collect();
        let table = Self::assemble(network, trees.into_iter())?;
        self.log_summary(&table);
        Ok(table)
    }

    fn log_summary(&self, table: &ConnectivityTable) {
        let blocked = table.results.iter().filter(|r| r.barrier_downstream).count();
        let steep = table
            .results
            .iter()
            .filter(|r| r.max_gradient_downstream > 0)
            .count();
        tracing::debug!(
            "Connectivity: {} reaches, {} behind barriers, {} behind gradient obstacles",
            table.len(),
            blocked,
            steep
        );
    }
}

/// Connectivity as seen by the suitability scorer: barrier presence plus
/// short-range and long-range MGD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachConnectivity {
    pub barrier_downstream: bool,
    pub mgd_short_range: u32,
    pub mgd_long_range: u32,
}

impl ReachConnectivity {
    /// Same MGD at both ranges
    pub fn single_scale(result: &ConnectivityResult) -> Self {
        Self {
            barrier_downstream: result.barrier_downstream,
            mgd_short_range: result.max_gradient_downstream,
            mgd_long_range: result.max_gradient_downstream,
        }
    }

    /// Join the fine-scale table with an optional coarse-scale table.
    ///
    /// Each fine reach reads its long-range MGD from the coarse reach named in
    /// `coarse_reach`; reaches without one fall back to the fine value.
    pub fn combine(
        network: &NetworkModel,
        fine: &ConnectivityTable,
        coarse: Option<(&NetworkModel, &ConnectivityTable)>,
    ) -> Result<Vec<ReachConnectivity>> {
        let Some((coarse_net, coarse_table)) = coarse else {
            return Ok(fine.as_slice().iter().map(Self::single_scale).collect());
        };

        let coarse_index: FxHashMap<ReachId, &ConnectivityResult> = coarse_net
            .reaches()
            .iter()
            .zip(coarse_table.as_slice())
            .map(|(r, c)| (r.id, c))
            .collect();

        network
            .reaches()
            .iter()
            .zip(fine.as_slice())
            .map(|(reach, short)| {
                let Some(coarse_id) = reach.coarse_reach else {
                    return Ok(Self::single_scale(short));
                };
                let long = coarse_index.get(&coarse_id).ok_or_else(|| HipError::InvalidTopology {
                    reach: reach.id,
                    reason: format!("coarse reach {} does not exist", coarse_id),
                })?;
                Ok(ReachConnectivity {
                    barrier_downstream: short.barrier_downstream || long.barrier_downstream,
                    mgd_short_range: short.max_gradient_downstream,
                    mgd_long_range: long.max_gradient_downstream,
                })
            })
            .collect()
    }
}
