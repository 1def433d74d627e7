//! HIP pipeline - runs every stage for one network
//!
//! NetworkModel → PathAggregator → HipScorer → ComplementarityClassifier
//!
//! Topology errors abort the run. Profile errors (`MissingCovariate`,
//! `InvalidCurve`, `UnknownProfile`) fail that profile only, and
//! `InsufficientSamples` fails complementarity for that species only. Every
//! isolated failure is logged and kept in the [`RunReport`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use crate::complementarity::{
    suitable_length_by_sub_basin, ComplementarityClassifier, ComplementarityTable,
};
use crate::config::RunConfig;
use crate::connectivity::{ConnectivityTable, PathAggregator, ReachConnectivity};
use crate::error::{HipError, Result};
use crate::network::NetworkModel;
use crate::suitability::{HipScorer, HipTable, LifeStage, ProfileKey, ProfileLibrary};

/// What an isolated failure affected
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureScope {
    Profile(ProfileKey),
    Complementarity(String),
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScope::Profile(key) => write!(f, "profile '{}'", key),
            FailureScope::Complementarity(species) => {
                write!(f, "complementarity for '{}'", species)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    pub scope: FailureScope,
    pub error: HipError,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Network as scored (hydraulics derived when configured)
    pub network: NetworkModel,
    pub connectivity: ConnectivityTable,
    pub coarse_connectivity: Option<ConnectivityTable>,
    /// Scoring input per reach, in network order
    pub reach_connectivity: Vec<ReachConnectivity>,
    pub hip: BTreeMap<ProfileKey, HipTable>,
    pub complementarity: BTreeMap<String, ComplementarityTable>,
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn hip_for(&self, key: &ProfileKey) -> Option<&HipTable> {
        self.hip.get(key)
    }
}

pub struct HipPipeline {
    config: RunConfig,
    library: ProfileLibrary,
}

impl HipPipeline {
    pub fn new(config: RunConfig, library: ProfileLibrary) -> Self {
        Self { config, library }
    }

    /// Pipeline with the configured profile library (built-ins plus the
    /// configured library file, resolved against `base_dir`)
    pub fn from_config(config: RunConfig, base_dir: Option<&Path>) -> anyhow::Result<Self> {
        let library = config.profile_library(base_dir)?;
        Ok(Self::new(config, library))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn library(&self) -> &ProfileLibrary {
        &self.library
    }

    fn aggregate(
        &self,
        aggregator: &PathAggregator,
        network: &NetworkModel,
    ) -> Result<ConnectivityTable> {
        if self.config.parallel {
            aggregator.aggregate_parallel(network)
        } else {
            aggregator.aggregate(network)
        }
    }

    /// Run every stage
    ///
    /// `coarse` is an optional coarser segmentation of the same river, used for
    /// long-range gradient obstacles.
    pub fn run(&self, network: NetworkModel, coarse: Option<&NetworkModel>) -> Result<RunReport> {
        let start = Instant::now();
        tracing::info!("HIP run: {} reaches, {} outlets", network.len(), network.roots().len());

        let network = match &self.config.hydraulics {
            Some(params) => network.with_derived_hydraulics(params)?,
            None => network,
        };

        // Stage 1: connectivity (fatal on topology errors)
        let aggregator = PathAggregator::new(self.config.connectivity_params());
        let connectivity = self.aggregate(&aggregator, &network)?;
        let coarse_connectivity = coarse
            .map(|c| self.aggregate(&aggregator, c))
            .transpose()?;
        let reach_connectivity = ReachConnectivity::combine(
            &network,
            &connectivity,
            coarse.zip(coarse_connectivity.as_ref()),
        )?;

        // Stage 2: HIP per profile
        let mut failures = Vec::new();
        let mut hip = BTreeMap::new();
        let keys = self.config.selected_profiles(&self.library);
        let scorer = HipScorer::new(&network, Some(reach_connectivity.as_slice()))
            .with_parallel(self.config.parallel)
            .with_suitability_threshold(self.config.suitability_threshold);
        for (key, result) in scorer.score_all(&self.library, &keys) {
            match result {
                Ok(table) => {
                    hip.insert(key, table);
                }
                Err(error) => {
                    tracing::warn!("Skipping profile '{}': {}", key, error);
                    failures.push(RunFailure {
                        scope: FailureScope::Profile(key),
                        error,
                    });
                }
            }
        }

        // Stage 3: complementarity per species
        let classifier = ComplementarityClassifier::new(self.config.min_habitat_km)
            .with_parallel(self.config.parallel);
        let mut complementarity = BTreeMap::new();
        for species in &self.config.complementarity_species {
            match self.classify_species(species, &network, &hip, &classifier, &failures) {
                Ok(Some(table)) => {
                    complementarity.insert(species.clone(), table);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!("Skipping complementarity for '{}': {}", species, error);
                    failures.push(RunFailure {
                        scope: FailureScope::Complementarity(species.clone()),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            "HIP run finished in {:.3}s: {} profiles scored, {} species classified, {} failures",
            start.elapsed().as_secs_f64(),
            hip.len(),
            complementarity.len(),
            failures.len()
        );

        Ok(RunReport {
            network,
            connectivity,
            coarse_connectivity,
            reach_connectivity,
            hip,
            complementarity,
            failures,
        })
    }

    /// Ok(None) when a stage profile already failed (reported there)
    fn classify_species(
        &self,
        species: &str,
        network: &NetworkModel,
        hip: &BTreeMap<ProfileKey, HipTable>,
        classifier: &ComplementarityClassifier,
        failures: &[RunFailure],
    ) -> Result<Option<ComplementarityTable>> {
        let spawning_key = ProfileKey::new(species, LifeStage::Spawning);
        let rearing_key = ProfileKey::new(species, LifeStage::Rearing);

        let (spawning, rearing) = match (hip.get(&spawning_key), hip.get(&rearing_key)) {
            (Some(s), Some(r)) => (s, r),
            (s, _) => {
                let missing = if s.is_none() { spawning_key } else { rearing_key };
                let already_failed = failures
                    .iter()
                    .any(|f| f.scope == FailureScope::Profile(missing.clone()));
                if already_failed {
                    tracing::warn!(
                        "No complementarity for '{}': profile '{}' failed",
                        species,
                        missing
                    );
                    return Ok(None);
                }
                return Err(HipError::UnknownProfile {
                    profile: missing.to_string(),
                });
            }
        };

        let lengths = suitable_length_by_sub_basin(
            network,
            spawning,
            rearing,
            self.config.suitability_threshold,
        );
        classifier.classify(&lengths).map(Some)
    }
}
