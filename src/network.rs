//! Drainage Network Model
//!
//! The stream network as a forest of rooted trees. Each reach points at its
//! downstream parent; outlets have none. Several reaches may share a parent
//! (confluences) but a reach never has more than one.
//!
//! Topology is resolved once in [`NetworkModel::new`]: parent ids become
//! indexes, child lists are built, and duplicate ids, dangling parents and
//! cycles are rejected with `InvalidTopology`.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{HipError, Result};

/// Reach identifier (HydroID)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReachId(pub i64);

impl fmt::Display for ReachId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sub-basin identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubBasinId(pub i64);

impl fmt::Display for SubBasinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stream reach with the physical covariates measured by the geospatial
/// collaborator. Every covariate is nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reach {
    pub id: ReachId,
    /// Downstream parent (None for an outlet)
    #[serde(default)]
    pub downstream: Option<ReachId>,
    #[serde(default)]
    pub sub_basin: Option<SubBasinId>,
    /// Enclosing reach in a coarser segmentation of the same river
    #[serde(default)]
    pub coarse_reach: Option<ReachId>,
    #[serde(default)]
    pub length_m: f64,

    pub drainage_area_km2: Option<f64>,
    pub mean_flow_cms: Option<f64>,
    pub slope_pct: Option<f64>,
    pub channel_width_m: Option<f64>,
    pub depth_m: Option<f64>,
    pub velocity_ms: Option<f64>,
    pub valley_width_m: Option<f64>,
    pub vwi: Option<f64>,

    /// Documented barrier on this reach
    #[serde(default)]
    pub barrier: bool,

    /// Additional named covariates (None = measured but null)
    #[serde(default)]
    pub extra: FxHashMap<String, Option<f64>>,
}

impl Reach {
    pub fn new(id: i64) -> Self {
        Reach {
            id: ReachId(id),
            ..Default::default()
        }
    }

    /// Set the downstream parent
    pub fn flowing_to(mut self, parent: i64) -> Self {
        self.downstream = Some(ReachId(parent));
        self
    }

    pub fn is_outlet(&self) -> bool {
        self.downstream.is_none()
    }
}

/// Drainage network with resolved topology
#[derive(Debug, Clone)]
pub struct NetworkModel {
    reaches: Vec<Reach>,
    index: FxHashMap<ReachId, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<SmallVec<[usize; 4]>>,
    roots: Vec<usize>,
}

impl NetworkModel {
    /// Build the network and validate that it is a forest
    pub fn new(reaches: Vec<Reach>) -> Result<Self> {
        let n = reaches.len();

        let mut index: FxHashMap<ReachId, usize> =
            FxHashMap::with_capacity_and_hasher(n, Default::default());
        for (i, reach) in reaches.iter().enumerate() {
            if index.insert(reach.id, i).is_some() {
                return Err(HipError::InvalidTopology {
                    reach: reach.id,
                    reason: "duplicate reach id".to_string(),
                });
            }
        }

        let mut parents = Vec::with_capacity(n);
        let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
        let mut roots = Vec::new();

        for (i, reach) in reaches.iter().enumerate() {
            match reach.downstream {
                None => {
                    parents.push(None);
                    roots.push(i);
                }
                Some(parent_id) => {
                    let parent = *index.get(&parent_id).ok_or_else(|| HipError::InvalidTopology {
                        reach: reach.id,
                        reason: format!("downstream reach {} does not exist", parent_id),
                    })?;
                    if parent == i {
                        return Err(HipError::InvalidTopology {
                            reach: reach.id,
                            reason: "reach drains into itself".to_string(),
                        });
                    }
                    parents.push(Some(parent));
                    children[parent].push(i);
                }
            }
        }

        let network = NetworkModel {
            reaches,
            index,
            parents,
            children,
            roots,
        };
        network.check_acyclic()?;

        tracing::debug!(
            "Network resolved: {} reaches, {} outlets",
            network.len(),
            network.roots.len()
        );

        Ok(network)
    }

    /// Every reach must be reachable from an outlet. With one parent per
    /// reach, anything left over sits on (or above) a cycle.
    fn check_acyclic(&self) -> Result<()> {
        let mut reached = vec![false; self.reaches.len()];
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(i) = stack.pop() {
            reached[i] = true;
            stack.extend(self.children[i].iter().copied());
        }

        match reached.iter().position(|r| !r) {
            Some(i) => Err(HipError::InvalidTopology {
                reach: self.reaches[i].id,
                reason: "reach never drains to an outlet (cycle)".to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.reaches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }

    /// Reaches in input order (all result tables follow this order)
    pub fn reaches(&self) -> &[Reach] {
        &self.reaches
    }

    pub fn reach(&self, idx: usize) -> &Reach {
        &self.reaches[idx]
    }

    pub fn get(&self, id: ReachId) -> Option<&Reach> {
        self.index.get(&id).map(|&i| &self.reaches[i])
    }

    pub fn index_of(&self, id: ReachId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    /// Outlet reaches, one per tree
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// The reach itself followed by every reach down to its outlet
    pub fn path_to_outlet(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(idx), move |&i| self.parents[i])
    }

    /// Distinct sub-basins referenced by any reach
    pub fn sub_basins(&self) -> BTreeSet<SubBasinId> {
        self.reaches.iter().filter_map(|r| r.sub_basin).collect()
    }

    pub fn into_reaches(self) -> Vec<Reach> {
        self.reaches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// outlet(1) <- 2 <- {3, 4}
    fn confluence() -> Vec<Reach> {
        vec![
            Reach::new(1),
            Reach::new(2).flowing_to(1),
            Reach::new(3).flowing_to(2),
            Reach::new(4).flowing_to(2),
        ]
    }

    #[test]
    fn test_resolves_confluence() {
        let net = NetworkModel::new(confluence()).unwrap();
        assert_eq!(net.len(), 4);
        assert_eq!(net.roots(), &[0]);
        assert_eq!(net.children(1), &[2, 3]);
        assert_eq!(net.parent(3), Some(1));
        assert_eq!(net.index_of(ReachId(4)), Some(3));
        let path: Vec<usize> = net.path_to_outlet(3).collect();
        assert_eq!(path, vec![3, 1, 0]);
    }

    #[test]
    fn test_forest_has_one_root_per_tree() {
        let mut reaches = confluence();
        reaches.push(Reach::new(10));
        reaches.push(Reach::new(11).flowing_to(10));
        let net = NetworkModel::new(reaches).unwrap();
        assert_eq!(net.roots(), &[0, 4]);
    }

    #[test]
    fn test_dangling_parent_rejected() {
        let reaches = vec![Reach::new(1), Reach::new(2).flowing_to(99)];
        match NetworkModel::new(reaches) {
            Err(HipError::InvalidTopology { reach, .. }) => assert_eq!(reach, ReachId(2)),
            other => panic!("expected InvalidTopology, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let reaches = vec![Reach::new(1), Reach::new(1)];
        assert!(matches!(
            NetworkModel::new(reaches),
            Err(HipError::InvalidTopology { reach: ReachId(1), .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let reaches = vec![
            Reach::new(1),
            Reach::new(2).flowing_to(3),
            Reach::new(3).flowing_to(2),
        ];
        match NetworkModel::new(reaches) {
            Err(HipError::InvalidTopology { reach, reason }) => {
                assert_eq!(reach, ReachId(2));
                assert!(reason.contains("cycle"));
            }
            other => panic!("expected InvalidTopology, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_rejected() {
        let reaches = vec![Reach::new(7).flowing_to(7)];
        assert!(matches!(
            NetworkModel::new(reaches),
            Err(HipError::InvalidTopology { reach: ReachId(7), .. })
        ));
    }

    #[test]
    fn test_sub_basins_are_distinct() {
        let mut reaches = confluence();
        reaches[0].sub_basin = Some(SubBasinId(2));
        reaches[1].sub_basin = Some(SubBasinId(1));
        reaches[2].sub_basin = Some(SubBasinId(2));
        let net = NetworkModel::new(reaches).unwrap();
        let ids: Vec<SubBasinId> = net.sub_basins().into_iter().collect();
        assert_eq!(ids, vec![SubBasinId(1), SubBasinId(2)]);
    }

    #[test]
    fn test_reach_deserializes_with_defaults() {
        let json = r#"{"id": 5, "downstream": 4, "slope_pct": 3.5, "mean_flow_cms": null}"#;
        let reach: Reach = serde_json::from_str(json).unwrap();
        assert_eq!(reach.id, ReachId(5));
        assert_eq!(reach.downstream, Some(ReachId(4)));
        assert_eq!(reach.slope_pct, Some(3.5));
        assert_eq!(reach.mean_flow_cms, None);
        assert!(!reach.barrier);
        assert!(reach.extra.is_empty());
    }
}
