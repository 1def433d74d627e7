//! Hydraulic covariate derivation
//!
//! Fills covariates the geospatial collaborator left null:
//! - mean annual flow from a regional regression Q = a·A^b·P^c·S^d
//! - bankfull depth and width (Andreadis et al. 2013)
//! - Manning velocity
//! - valley width and valley width index (VWI)
//!
//! Measured values are never overwritten. A VWI that cannot be derived is
//! written as 1, a valley no wider than its channel.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::network::{NetworkModel, Reach};

/// Regional mean-annual-flow regression coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalFlowModel {
    pub a: f64,
    /// Drainage area exponent
    pub b: f64,
    /// Mean catchment precipitation exponent
    pub c: f64,
    /// Mean catchment slope exponent
    pub d: f64,
}

impl RegionalFlowModel {
    /// Mean annual flow (m³/s) from drainage area (km²), mean catchment
    /// precipitation (m) and mean catchment slope (%)
    pub fn mean_annual_flow(&self, drainage_area_km2: f64, precip_m: f64, slope_pct: f64) -> f64 {
        self.a * drainage_area_km2.powf(self.b) * precip_m.powf(self.c) * slope_pct.powf(self.d)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelGeometry {
    pub depth_m: f64,
    pub width_m: f64,
    pub velocity_ms: f64,
}

/// Manning roughness for a channel
pub fn manning_n(slope_pct: f64, width_m: f64) -> f64 {
    if slope_pct <= 8.0 {
        0.05
    } else if width_m < 30.0 {
        0.03
    } else {
        0.025
    }
}

/// Bankfull depth, width and Manning velocity for a mean annual flow
///
/// Null or non-positive flow gives an all-zero geometry. Null or negative
/// slope gives zero velocity.
pub fn bankfull_geometry(flow_cms: Option<f64>, slope_pct: Option<f64>) -> ChannelGeometry {
    let q = match flow_cms {
        Some(q) if q > 0.0 && q.is_finite() => q,
        _ => return ChannelGeometry::default(),
    };

    let depth_m = 0.27 * q.powf(0.3);
    let width_m = 7.2 * q.powf(0.5);

    let velocity_ms = match slope_pct {
        Some(s) if s >= 0.0 && s.is_finite() => {
            let hydraulic_radius = depth_m * width_m / (2.0 * depth_m + width_m);
            hydraulic_radius.powf(0.66) * (s / 100.0).sqrt() / manning_n(s, width_m)
        }
        _ => 0.0,
    };

    ChannelGeometry {
        depth_m,
        width_m,
        velocity_ms,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValleyMetrics {
    pub valley_width_m: Option<f64>,
    /// Valley width / channel width, never below 1
    pub vwi: f64,
}

/// Valley width as polygon area over reach length
pub fn valley_width_from_area(valley_area_m2: Option<f64>, length_m: f64) -> Option<f64> {
    match valley_area_m2 {
        Some(area) if length_m > 0.0 && area.is_finite() => Some(area / length_m),
        _ => None,
    }
}

/// Valley width and VWI
///
/// A missing channel width takes the valley width (VWI 1). A valley narrower
/// than the channel is widened to the channel.
pub fn valley_metrics(valley_width_m: Option<f64>, channel_width_m: Option<f64>) -> ValleyMetrics {
    let Some(valley) = valley_width_m else {
        return ValleyMetrics {
            valley_width_m: None,
            vwi: 1.0,
        };
    };

    match channel_width_m {
        Some(channel) if channel > 0.0 => ValleyMetrics {
            valley_width_m: Some(valley.max(channel)),
            vwi: (valley / channel).max(1.0),
        },
        _ => ValleyMetrics {
            valley_width_m: Some(valley),
            vwi: 1.0,
        },
    }
}

/// Where derivation inputs live on a reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicsParams {
    /// None: mean flow is never derived
    pub flow_model: Option<RegionalFlowModel>,
    /// Extra covariate holding mean catchment precipitation (m)
    pub precip_covariate: String,
    /// Extra covariate holding mean catchment slope (%)
    pub catchment_slope_covariate: String,
    /// Extra covariate holding valley polygon area (m²)
    pub valley_area_covariate: String,
}

impl Default for HydraulicsParams {
    fn default() -> Self {
        Self {
            flow_model: None,
            precip_covariate: "catchment_precip_m".to_string(),
            catchment_slope_covariate: "catchment_slope_pct".to_string(),
            valley_area_covariate: "valley_area_m2".to_string(),
        }
    }
}

impl HydraulicsParams {
    fn extra(reach: &Reach, name: &str) -> Option<f64> {
        reach.extra.get(name).copied().flatten()
    }

    /// Fill the null hydraulic covariates of one reach
    pub fn derive(&self, reach: &mut Reach) {
        if reach.mean_flow_cms.is_none() {
            if let (Some(model), Some(area), Some(precip), Some(slope)) = (
                self.flow_model,
                reach.drainage_area_km2,
                Self::extra(reach, &self.precip_covariate),
                Self::extra(reach, &self.catchment_slope_covariate),
            ) {
                reach.mean_flow_cms = Some(model.mean_annual_flow(area, precip, slope));
            }
        }

        let geometry = bankfull_geometry(reach.mean_flow_cms, reach.slope_pct);
        reach.depth_m.get_or_insert(geometry.depth_m);
        reach.channel_width_m.get_or_insert(geometry.width_m);
        reach.velocity_ms.get_or_insert(geometry.velocity_ms);

        let valley_width = reach.valley_width_m.or_else(|| {
            valley_width_from_area(Self::extra(reach, &self.valley_area_covariate), reach.length_m)
        });
        let valley = valley_metrics(valley_width, reach.channel_width_m);
        if reach.valley_width_m.is_none() {
            reach.valley_width_m = valley.valley_width_m;
        }
        reach.vwi.get_or_insert(valley.vwi);
    }
}

impl NetworkModel {
    /// Network with null hydraulic covariates derived
    pub fn with_derived_hydraulics(self, params: &HydraulicsParams) -> Result<NetworkModel> {
        let mut reaches = self.into_reaches();
        let before = count_nulls(&reaches);
        reaches.iter_mut().for_each(|r| params.derive(r));
        tracing::debug!(
            "Derived hydraulics: {} null covariates filled",
            before - count_nulls(&reaches)
        );
        NetworkModel::new(reaches)
    }
}

fn count_nulls(reaches: &[Reach]) -> usize {
    reaches
        .iter()
        .map(|r| {
            [
                r.mean_flow_cms,
                r.depth_m,
                r.channel_width_m,
                r.velocity_ms,
                r.valley_width_m,
                r.vwi,
            ]
            .iter()
            .filter(|v| v.is_none())
            .count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_regional_flow() {
        let model = RegionalFlowModel {
            a: 0.01,
            b: 1.0,
            c: 2.0,
            d: 0.5,
        };
        assert_relative_eq!(
            model.mean_annual_flow(100.0, 1.5, 4.0),
            0.01 * 100.0 * 2.25 * 2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_bankfull_geometry() {
        let g = bankfull_geometry(Some(4.0), Some(2.0));
        let depth = 0.27 * 4.0f64.powf(0.3);
        let width = 14.4;
        assert_relative_eq!(g.depth_m, depth, epsilon = 1e-12);
        assert_relative_eq!(g.width_m, width, epsilon = 1e-12);
        let r = depth * width / (2.0 * depth + width);
        assert_relative_eq!(g.velocity_ms, r.powf(0.66) * 0.02f64.sqrt() / 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_null_or_zero_flow_gives_zero_geometry() {
        assert_eq!(bankfull_geometry(None, Some(3.0)), ChannelGeometry::default());
        assert_eq!(bankfull_geometry(Some(0.0), Some(3.0)), ChannelGeometry::default());
        let g = bankfull_geometry(Some(2.0), None);
        assert!(g.depth_m > 0.0);
        assert_eq!(g.velocity_ms, 0.0);
    }

    #[test]
    fn test_manning_n() {
        assert_eq!(manning_n(8.0, 50.0), 0.05);
        assert_eq!(manning_n(9.0, 29.0), 0.03);
        assert_eq!(manning_n(9.0, 30.0), 0.025);
    }

    #[test]
    fn test_valley_metrics() {
        let m = valley_metrics(Some(60.0), Some(5.0));
        assert_eq!(m.valley_width_m, Some(60.0));
        assert_relative_eq!(m.vwi, 12.0);

        // Valley narrower than channel: widened, VWI floored at 1
        let m = valley_metrics(Some(3.0), Some(5.0));
        assert_eq!(m.valley_width_m, Some(5.0));
        assert_eq!(m.vwi, 1.0);

        // Missing channel width
        let m = valley_metrics(Some(40.0), None);
        assert_eq!(m.vwi, 1.0);

        assert_eq!(valley_width_from_area(Some(5000.0), 250.0), Some(20.0));
        assert_eq!(valley_width_from_area(Some(5000.0), 0.0), None);
    }

    #[test]
    fn test_derivation_fills_nulls_only() {
        let mut measured = Reach::new(1);
        measured.mean_flow_cms = Some(4.0);
        measured.slope_pct = Some(2.0);
        measured.channel_width_m = Some(9.0);
        measured.length_m = 100.0;
        measured.extra.insert("valley_area_m2".to_string(), Some(4500.0));

        let mut derived = Reach::new(2).flowing_to(1);
        derived.drainage_area_km2 = Some(100.0);
        derived.slope_pct = Some(1.0);
        derived.extra.insert("catchment_precip_m".to_string(), Some(1.0));
        derived.extra.insert("catchment_slope_pct".to_string(), Some(1.0));

        let params = HydraulicsParams {
            flow_model: Some(RegionalFlowModel {
                a: 0.04,
                b: 1.0,
                c: 1.0,
                d: 1.0,
            }),
            ..HydraulicsParams::default()
        };
        let net = NetworkModel::new(vec![measured, derived])
            .unwrap()
            .with_derived_hydraulics(&params)
            .unwrap();

        let r1 = net.reach(0);
        assert_eq!(r1.channel_width_m, Some(9.0));
        assert_relative_eq!(r1.depth_m.unwrap(), 0.27 * 4.0f64.powf(0.3), epsilon = 1e-12);
        assert_eq!(r1.valley_width_m, Some(45.0));
        assert_relative_eq!(r1.vwi.unwrap(), 5.0);

        let r2 = net.reach(1);
        assert_relative_eq!(r2.mean_flow_cms.unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(r2.channel_width_m.unwrap(), 14.4, epsilon = 1e-12);
        assert_eq!(r2.valley_width_m, None);
        // No valley width: VWI floors at 1
        assert_eq!(r2.vwi, Some(1.0));
    }
}
