//! Built-in species profiles
//!
//! Curve shapes for Atlantic salmon, North American beaver, Coho salmon,
//! Chinook salmon and Steelhead/Rainbow trout. Knots are the documented
//! breakpoints and plateau values of each response curve; scores between
//! knots are linear.
//!
//! Null handling per curve:
//! - MGD curves: null counts as no obstacle (score 1)
//! - Coho and Chinook gradient: null scores 0
//! - Beaver channel width: null scores 0
//! - everything else: lowest bucket

use super::covariate::Covariate;
use super::curve::{NullPolicy, SuitabilityCurve};
use super::profile::{
    ConnectivityCurves, CovariateCurve, LifeStage, ProfileKey, ProfileLibrary, SpeciesProfile,
};

pub const ATLANTIC_SALMON: &str = "Atlantic salmon";
pub const BEAVER: &str = "North American beaver";
pub const COHO: &str = "Coho salmon";
pub const CHINOOK: &str = "Chinook salmon";
pub const STEELHEAD: &str = "Steelhead/Rainbow trout";

fn curve(name: &str, knots: &[(f64, f64)], null_policy: NullPolicy) -> SuitabilityCurve {
    SuitabilityCurve {
        name: name.to_string(),
        knots: knots.to_vec(),
        null_policy,
    }
}

fn habitat(
    covariate: Covariate,
    name: &str,
    knots: &[(f64, f64)],
    null_policy: NullPolicy,
) -> CovariateCurve {
    CovariateCurve {
        covariate,
        curve: curve(name, knots, null_policy),
    }
}

/// Score 1 up to `full`, falling linearly to 0 at `zero`
fn mgd_curve(name: &str, full: f64, zero: f64) -> SuitabilityCurve {
    curve(name, &[(full, 1.0), (zero, 0.0)], NullPolicy::LowestBucket)
}

fn connectivity(prefix: &str, short: (f64, f64), long: (f64, f64)) -> Option<ConnectivityCurves> {
    Some(ConnectivityCurves {
        short_range: mgd_curve(&format!("{} MGD short range", prefix), short.0, short.1),
        long_range: mgd_curve(&format!("{} MGD long range", prefix), long.0, long.1),
    })
}

const LOWEST: NullPolicy = NullPolicy::LowestBucket;
const ZERO: NullPolicy = NullPolicy::Fixed(0.0);

fn atlantic_salmon_spawning() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(ATLANTIC_SALMON, LifeStage::Spawning),
        connectivity: connectivity("Salar", (16.0, 20.0), (10.0, 14.0)),
        habitat: vec![
            habitat(
                Covariate::Depth,
                "Salar spawning depth",
                &[(0.15, 0.0), (0.3, 1.0), (0.6, 1.0), (0.9, 0.0)],
                LOWEST,
            ),
            habitat(
                Covariate::Velocity,
                "Salar spawning velocity",
                &[(0.15, 0.1), (0.4, 1.0), (1.05, 1.0), (1.35, 0.2)],
                LOWEST,
            ),
            habitat(
                Covariate::Vwi,
                "Salar spawning VWI",
                &[(4.0, 0.1), (20.0, 1.0), (40.0, 1.0), (60.0, 0.5)],
                LOWEST,
            ),
        ],
    }
}

fn beaver() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(BEAVER, LifeStage::AllStages),
        connectivity: None,
        habitat: vec![
            habitat(Covariate::Slope, "Beaver gradient", &[(3.0, 1.0), (10.0, 0.0)], LOWEST),
            habitat(
                Covariate::ChannelWidth,
                "Beaver channel width",
                &[(7.0, 1.0), (24.0, 0.0)],
                ZERO,
            ),
            habitat(
                Covariate::ValleyWidth,
                "Beaver valley width",
                &[(10.0, 0.0), (25.0, 1.0)],
                LOWEST,
            ),
        ],
    }
}

fn coho_spawning() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(COHO, LifeStage::Spawning),
        connectivity: connectivity("Coho", (12.0, 16.0), (8.0, 12.0)),
        habitat: vec![
            habitat(
                Covariate::MeanFlow,
                "Coho spawning flow",
                &[(0.01, 0.0), (0.05, 1.0), (4.5, 1.0), (9.0, 0.6)],
                LOWEST,
            ),
            habitat(Covariate::Slope, "Coho spawning gradient", &[(0.0, 1.0), (6.667, 0.0)], ZERO),
            habitat(
                Covariate::Vwi,
                "Coho spawning VWI",
                &[(2.0, 0.0), (5.0, 1.0), (21.0, 1.0), (40.0, 0.5)],
                LOWEST,
            ),
        ],
    }
}

fn coho_rearing() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(COHO, LifeStage::Rearing),
        connectivity: connectivity("Coho", (12.0, 16.0), (8.0, 12.0)),
        habitat: vec![
            habitat(
                Covariate::MeanFlow,
                "Coho rearing flow",
                &[(0.01, 0.0), (0.06, 1.0), (21.24, 1.0), (76.45, 0.5)],
                LOWEST,
            ),
            habitat(Covariate::Slope, "Coho rearing gradient", &[(0.0, 1.0), (5.0, 0.0)], ZERO),
            habitat(Covariate::Vwi, "Coho rearing VWI", &[(5.06, 0.25), (8.86, 1.0)], LOWEST),
        ],
    }
}

fn chinook_spawning() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(CHINOOK, LifeStage::Spawning),
        connectivity: connectivity("Chinook", (14.0, 18.0), (8.0, 12.0)),
        habitat: vec![
            habitat(
                Covariate::ChannelWidth,
                "Chinook spawning width",
                &[(3.7, 0.0), (5.7, 1.0)],
                LOWEST,
            ),
            habitat(Covariate::Slope, "Chinook spawning gradient", &[(2.0, 1.0), (4.0, 0.0)], ZERO),
            habitat(Covariate::Vwi, "Chinook spawning VWI", &[(1.0, 0.75), (8.87, 1.0)], LOWEST),
        ],
    }
}

fn chinook_rearing() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(CHINOOK, LifeStage::Rearing),
        connectivity: connectivity("Chinook", (14.0, 18.0), (8.0, 12.0)),
        habitat: vec![
            habitat(Covariate::MeanFlow, "Chinook rearing flow", &[(0.1, 0.0), (1.5, 1.0)], LOWEST),
            habitat(Covariate::Slope, "Chinook rearing gradient", &[(1.75, 1.0), (4.0, 0.0)], ZERO),
            habitat(Covariate::Vwi, "Chinook rearing VWI", &[(1.0, 0.8), (4.0, 1.0)], LOWEST),
        ],
    }
}

fn steelhead_spawning() -> SpeciesProfile {
    SpeciesProfile {
        key: ProfileKey::new(STEELHEAD, LifeStage::Spawning),
        connectivity: connectivity("Steelhead", (16.0, 20.0), (10.0, 14.0)),
        habitat: vec![
            habitat(
                Covariate::ChannelWidth,
                "Steelhead bankfull width",
                &[(2.2, 0.0), (3.8, 1.0), (25.0, 1.0), (50.0, 0.1)],
                LOWEST,
            ),
            habitat(
                Covariate::Slope,
                "Steelhead gradient",
                &[(0.0, 0.0), (0.5, 1.0), (4.0, 1.0), (8.0, 0.0)],
                LOWEST,
            ),
            habitat(
                Covariate::Vwi,
                "Steelhead VWI",
                &[(2.0, 0.0), (5.0, 1.0), (21.0, 1.0), (40.0, 0.5)],
                LOWEST,
            ),
        ],
    }
}

impl ProfileLibrary {
    /// Library holding every built-in profile
    pub fn builtin() -> Self {
        let mut library = ProfileLibrary::new();
        for profile in [
            atlantic_salmon_spawning(),
            beaver(),
            coho_spawning(),
            coho_rearing(),
            chinook_spawning(),
            chinook_rearing(),
            steelhead_spawning(),
        ] {
            library.insert(profile);
        }
        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn get(species: &str, stage: LifeStage) -> SpeciesProfile {
        ProfileLibrary::builtin()
            .get(&ProfileKey::new(species, stage))
            .unwrap()
            .clone()
    }

    fn habitat_curve<'a>(
        profile: &'a SpeciesProfile,
        covariate: &Covariate,
    ) -> &'a SuitabilityCurve {
        &profile
            .habitat
            .iter()
            .find(|h| &h.covariate == covariate)
            .unwrap()
            .curve
    }

    #[test]
    fn test_builtin_profiles_validate() {
        let library = ProfileLibrary::builtin();
        assert_eq!(library.len(), 7);
        for profile in library.profiles() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_endpoints_reproduced() {
        // Increasing-then-plateau shapes hit their declared endpoints exactly
        let salar = get(ATLANTIC_SALMON, LifeStage::Spawning);
        let depth = habitat_curve(&salar, &Covariate::Depth);
        assert_eq!(depth.evaluate(Some(0.15)), 0.0);
        assert_eq!(depth.evaluate(Some(0.3)), 1.0);

        let chinook = get(CHINOOK, LifeStage::Spawning);
        let width = habitat_curve(&chinook, &Covariate::ChannelWidth);
        assert_eq!(width.evaluate(Some(3.7)), 0.0);
        assert_eq!(width.evaluate(Some(5.7)), 1.0);
        assert_eq!(width.evaluate(Some(40.0)), 1.0);

        let beaver = get(BEAVER, LifeStage::AllStages);
        let valley = habitat_curve(&beaver, &Covariate::ValleyWidth);
        assert_eq!(valley.evaluate(Some(10.0)), 0.0);
        assert_eq!(valley.evaluate(Some(25.0)), 1.0);
        assert_relative_eq!(valley.evaluate(Some(17.5)), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_null_policies_per_curve() {
        let coho_r = get(COHO, LifeStage::Rearing);
        assert_eq!(habitat_curve(&coho_r, &Covariate::Slope).evaluate(None), 0.0);
        assert_eq!(habitat_curve(&coho_r, &Covariate::Vwi).evaluate(None), 0.25);

        let beaver = get(BEAVER, LifeStage::AllStages);
        assert_eq!(habitat_curve(&beaver, &Covariate::ChannelWidth).evaluate(None), 0.0);
        assert_eq!(habitat_curve(&beaver, &Covariate::Slope).evaluate(None), 1.0);

        let salar = get(ATLANTIC_SALMON, LifeStage::Spawning);
        assert_eq!(habitat_curve(&salar, &Covariate::Velocity).evaluate(None), 0.1);
        let conn = salar.connectivity.as_ref().unwrap();
        assert_eq!(conn.short_range.evaluate(None), 1.0);
        assert_eq!(conn.long_range.evaluate(None), 1.0);
    }

    #[test]
    fn test_mgd_curves() {
        let chinook = get(CHINOOK, LifeStage::Rearing);
        let conn = chinook.connectivity.unwrap();
        assert_eq!(conn.short_range.evaluate(Some(14.0)), 1.0);
        assert_relative_eq!(conn.short_range.evaluate(Some(16.0)), 0.5, epsilon = 1e-12);
        assert_eq!(conn.short_range.evaluate(Some(19.0)), 0.0);
        assert_eq!(conn.long_range.evaluate(Some(0.0)), 1.0);
        assert_relative_eq!(conn.long_range.evaluate(Some(11.0)), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_beaver_has_no_connectivity() {
        assert!(!get(BEAVER, LifeStage::AllStages).needs_connectivity());
        assert!(get(STEELHEAD, LifeStage::Spawning).needs_connectivity());
    }
}
