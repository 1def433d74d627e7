//! Species profiles and the profile library
//!
//! A profile is pure data: which covariates are scored, through which
//! curves, and whether connectivity caps the result. Adding a species means
//! adding a profile, never code.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::covariate::Covariate;
use super::curve::SuitabilityCurve;
use crate::error::{HipError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStage {
    Spawning,
    Rearing,
    /// Species scored without life-stage distinction (e.g. beaver)
    AllStages,
}

impl fmt::Display for LifeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifeStage::Spawning => "Spawning",
            LifeStage::Rearing => "Rearing",
            LifeStage::AllStages => "All stages",
        })
    }
}

/// Species + life stage, written "Coho salmon - Spawning"
/// (or just the species name for [`LifeStage::AllStages`])
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileKey {
    pub species: String,
    pub stage: LifeStage,
}

impl ProfileKey {
    pub fn new(species: impl Into<String>, stage: LifeStage) -> Self {
        Self {
            species: species.into(),
            stage,
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            LifeStage::AllStages => write!(f, "{}", self.species),
            stage => write!(f, "{} - {}", self.species, stage),
        }
    }
}

impl FromStr for ProfileKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty profile key".to_string());
        }
        let key = match s.rsplit_once(" - ") {
            Some((species, "Spawning")) => ProfileKey::new(species.trim(), LifeStage::Spawning),
            Some((species, "Rearing")) => ProfileKey::new(species.trim(), LifeStage::Rearing),
            _ => ProfileKey::new(s, LifeStage::AllStages),
        };
        Ok(key)
    }
}

impl TryFrom<String> for ProfileKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProfileKey> for String {
    fn from(key: ProfileKey) -> Self {
        key.to_string()
    }
}

/// One habitat sub-score: a covariate scored through a curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateCurve {
    pub covariate: Covariate,
    pub curve: SuitabilityCurve,
}

/// Curves over short-range and long-range max gradient downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityCurves {
    pub short_range: SuitabilityCurve,
    pub long_range: SuitabilityCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub key: ProfileKey,
    /// None: HIP is the habitat score alone
    #[serde(default)]
    pub connectivity: Option<ConnectivityCurves>,
    pub habitat: Vec<CovariateCurve>,
}

impl SpeciesProfile {
    /// Check every curve, and that there is something to score
    pub fn validate(&self) -> Result<()> {
        if self.habitat.is_empty() {
            return Err(HipError::InvalidCurve {
                curve: self.key.to_string(),
                reason: "profile has no habitat curves".to_string(),
            });
        }
        if let Some(conn) = &self.connectivity {
            conn.short_range.validate()?;
            conn.long_range.validate()?;
        }
        self.habitat.iter().try_for_each(|h| h.curve.validate())
    }

    pub fn needs_connectivity(&self) -> bool {
        self.connectivity.is_some()
    }
}

/// All profiles available to a run, keyed by [`ProfileKey`]
#[derive(Debug, Clone, Default)]
pub struct ProfileLibrary {
    profiles: BTreeMap<ProfileKey, SpeciesProfile>,
}

impl ProfileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile. Returns the profile it replaced.
    pub fn insert(&mut self, profile: SpeciesProfile) -> Option<SpeciesProfile> {
        self.profiles.insert(profile.key.clone(), profile)
    }

    pub fn get(&self, key: &ProfileKey) -> Result<&SpeciesProfile> {
        self.profiles.get(key).ok_or_else(|| HipError::UnknownProfile {
            profile: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &ProfileKey> {
        self.profiles.keys()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &SpeciesProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Parse a JSON array of profiles
    ///
    /// Profiles are not validated here; invalid curves surface as
    /// `InvalidCurve` when the profile is scored, failing only that profile.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let profiles: Vec<SpeciesProfile> =
            serde_json::from_str(json).context("Failed to parse profile library JSON")?;
        let mut library = ProfileLibrary::new();
        for profile in profiles {
            library.insert(profile);
        }
        Ok(library)
    }

    /// Load a JSON profile library file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile library: {:?}", path))?;
        let library = Self::from_json(&contents)
            .with_context(|| format!("Invalid profile library: {:?}", path))?;
        tracing::info!("Loaded {} profiles from {:?}", library.len(), path);
        Ok(library)
    }

    /// Add every profile of `other`, replacing same-key profiles
    pub fn extend(&mut self, other: ProfileLibrary) {
        self.profiles.extend(other.profiles);
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        let profiles: Vec<&SpeciesProfile> = self.profiles.values().collect();
        serde_json::to_string_pretty(&profiles).context("Failed to serialize profile library")
    }
}
