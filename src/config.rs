//! Run configuration
//!
//! JSON document with every field optional:
//!
//! ```json
//! {
//!   "gradient_thresholds": [1, 2, 3, 5, 8, 13],
//!   "mainstem_flow_limit": 500.0,
//!   "suitability_threshold": 0.75,
//!   "min_habitat_km": 0.1,
//!   "profiles": ["Coho salmon - Spawning", "Coho salmon - Rearing"],
//!   "complementarity_species": ["Coho salmon"],
//!   "profile_library": "profiles.json",
//!   "parallel": true
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::complementarity::{DEFAULT_MIN_HABITAT_KM, DEFAULT_SUITABILITY_THRESHOLD};
use crate::connectivity::{ConnectivityParams, GradientThresholdSet, DEFAULT_MAINSTEM_FLOW_LIMIT};
use crate::hydraulics::HydraulicsParams;
use crate::suitability::library::{CHINOOK, COHO};
use crate::suitability::{ProfileKey, ProfileLibrary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub gradient_thresholds: GradientThresholdSet,
    /// m³/s
    pub mainstem_flow_limit: f64,
    /// HIP at or above which a reach counts as suitable habitat
    pub suitability_threshold: f64,
    pub min_habitat_km: f64,
    /// Profiles to score; empty scores every profile in the library
    pub profiles: Vec<ProfileKey>,
    /// Species classified for habitat complementarity (need spawning and rearing profiles)
    pub complementarity_species: Vec<String>,
    /// Extra profiles, replacing built-ins with the same key
    pub profile_library: Option<PathBuf>,
    /// Derive null hydraulic covariates before scoring
    pub hydraulics: Option<HydraulicsParams>,
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gradient_thresholds: GradientThresholdSet::default(),
            mainstem_flow_limit: DEFAULT_MAINSTEM_FLOW_LIMIT,
            suitability_threshold: DEFAULT_SUITABILITY_THRESHOLD,
            min_habitat_km: DEFAULT_MIN_HABITAT_KM,
            profiles: Vec::new(),
            complementarity_species: vec![COHO.to_string(), CHINOOK.to_string()],
            profile_library: None,
            hydraulics: None,
            parallel: true,
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config: {:?}", path))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("Invalid run config: {:?}", path))?;
        tracing::info!("Loaded run config from {:?}", path);
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig =
            serde_json::from_str(json).context("Failed to parse run config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.mainstem_flow_limit.is_finite() && self.mainstem_flow_limit >= 0.0) {
            anyhow::bail!(
                "mainstem_flow_limit must be a non-negative number, got {}",
                self.mainstem_flow_limit
            );
        }
        if !(0.0..=1.0).contains(&self.suitability_threshold) {
            anyhow::bail!(
                "suitability_threshold must be within [0, 1], got {}",
                self.suitability_threshold
            );
        }
        if !(self.min_habitat_km.is_finite() && self.min_habitat_km >= 0.0) {
            anyhow::bail!(
                "min_habitat_km must be a non-negative number, got {}",
                self.min_habitat_km
            );
        }
        if self.gradient_thresholds.is_empty() {
            tracing::warn!("No gradient thresholds configured: every MGD will be 0");
        }
        Ok(())
    }

    pub fn connectivity_params(&self) -> ConnectivityParams {
        ConnectivityParams {
            thresholds: self.gradient_thresholds.clone(),
            mainstem_flow_limit: self.mainstem_flow_limit,
        }
    }

    /// Built-in profiles extended with the configured profile library file
    ///
    /// A relative library path resolves against `base_dir`.
    pub fn profile_library(&self, base_dir: Option<&Path>) -> Result<ProfileLibrary> {
        let mut library = ProfileLibrary::builtin();
        if let Some(path) = &self.profile_library {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            };
            library.extend(ProfileLibrary::load(&path)?);
        }
        Ok(library)
    }

    /// Profiles to score given the library in use
    pub fn selected_profiles(&self, library: &ProfileLibrary) -> Vec<ProfileKey> {
        if self.profiles.is_empty() {
            library.keys().cloned().collect()
        } else {
            self.profiles.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suitability::LifeStage;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(
            config.gradient_thresholds.as_slice(),
            (1..=20).collect::<Vec<u32>>().as_slice()
        );
        assert_eq!(config.mainstem_flow_limit, 500.0);
        assert_eq!(config.suitability_threshold, 0.75);
        assert_eq!(config.min_habitat_km, 0.1);
        assert!(config.parallel);
    }

    #[test]
    fn test_partial_document() {
        let config = RunConfig::from_json(
            r#"{
                "gradient_thresholds": [10, 5, 15],
                "profiles": ["Coho salmon - Spawning", "North American beaver"],
                "parallel": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.gradient_thresholds.as_slice(), &[5, 10, 15]);
        assert_eq!(config.profiles[0], ProfileKey::new(COHO, LifeStage::Spawning));
        assert_eq!(config.profiles[1].stage, LifeStage::AllStages);
        assert!(!config.parallel);
        assert_eq!(config.mainstem_flow_limit, 500.0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(RunConfig::from_json(r#"{"suitability_threshold": 1.5}"#).is_err());
        assert!(RunConfig::from_json(r#"{"mainstem_flow_limit": -1}"#).is_err());
        assert!(RunConfig::from_json(r#"{"min_habitat_km": -0.1}"#).is_err());
        assert!(RunConfig::from_json(r#"{"parallel": "yes"}"#).is_err());
    }

    #[test]
    fn test_selected_profiles_default_to_library() {
        let library = ProfileLibrary::builtin();
        let config = RunConfig::default();
        assert_eq!(config.selected_profiles(&library).len(), library.len());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = RunConfig::load(Path::new("/nonexistent/run.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read run config"));
    }
}
