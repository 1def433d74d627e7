//! Riverscape Habitat Intrinsic Potential (HIP)
//!
//! Connectivity and habitat-suitability scoring for stream reaches, and
//! habitat complementarity for the sub-basins that contain them.
//!
//! Module layout follows the data flow:
//! - `network`: drainage network as a validated forest of reaches
//! - `connectivity`: barrier presence and max gradient downstream per reach
//! - `suitability`: response curves, species profiles, HIP scoring
//! - `complementarity`: sub-basin habitat complementarity index
//! - `hydraulics`: bankfull geometry, Manning velocity, valley width index
//! - `pipeline`: one run over every stage, with per-profile failure isolation
//! - `config` / `frame`: JSON run configuration and DataFrame intake/export
//!
//! Parallel paths use Rayon and produce the same output as sequential ones.

pub mod complementarity;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod frame;
pub mod hydraulics;
pub mod network;
pub mod pipeline;
pub mod suitability;

// Re-export commonly used types
pub use complementarity::{
    suitable_length_by_sub_basin, ComplementarityClassifier, ComplementarityIndex,
    ComplementarityTable, HabitatLengths, RearingStats,
};
pub use config::RunConfig;
pub use connectivity::{
    ConnectivityParams, ConnectivityResult, ConnectivityTable, GradientThresholdSet, PathAggregator,
    ReachConnectivity,
};
pub use error::{HipError, Result};
pub use frame::{complementarity_frame, network_from_frame, reach_results_frame, ColumnConfig};
pub use hydraulics::{HydraulicsParams, RegionalFlowModel};
pub use network::{NetworkModel, Reach, ReachId, SubBasinId};
pub use pipeline::{FailureScope, HipPipeline, RunFailure, RunReport};
pub use suitability::{
    HipResult, HipScorer, HipTable, LifeStage, NullPolicy, ProfileKey, ProfileLibrary,
    SpeciesProfile, SuitabilityCurve,
};
