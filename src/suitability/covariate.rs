//! Covariates a habitat curve can be keyed on

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::Reach;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariate {
    Slope,
    MeanFlow,
    DrainageArea,
    ChannelWidth,
    Depth,
    Velocity,
    ValleyWidth,
    Vwi,
    /// Named covariate from the reach's extra attributes
    Other(String),
}

impl Covariate {
    /// Read the covariate from a reach.
    ///
    /// Outer `None`: the reach does not carry the covariate at all (only
    /// possible for [`Covariate::Other`]). Inner `None`: carried but null.
    pub fn read(&self, reach: &Reach) -> Option<Option<f64>> {
        match self {
            Covariate::Slope => Some(reach.slope_pct),
            Covariate::MeanFlow => Some(reach.mean_flow_cms),
            Covariate::DrainageArea => Some(reach.drainage_area_km2),
            Covariate::ChannelWidth => Some(reach.channel_width_m),
            Covariate::Depth => Some(reach.depth_m),
            Covariate::Velocity => Some(reach.velocity_ms),
            Covariate::ValleyWidth => Some(reach.valley_width_m),
            Covariate::Vwi => Some(reach.vwi),
            Covariate::Other(name) => reach.extra.get(name).copied(),
        }
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Covariate::Slope => "slope",
            Covariate::MeanFlow => "mean_flow",
            Covariate::DrainageArea => "drainage_area",
            Covariate::ChannelWidth => "channel_width",
            Covariate::Depth => "depth",
            Covariate::Velocity => "velocity",
            Covariate::ValleyWidth => "valley_width",
            Covariate::Vwi => "vwi",
            Covariate::Other(name) => name,
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_named_and_extra() {
        let mut reach = Reach::new(1);
        reach.depth_m = Some(0.4);
        reach.extra.insert("substrate".to_string(), None);

        assert_eq!(Covariate::Depth.read(&reach), Some(Some(0.4)));
        assert_eq!(Covariate::Velocity.read(&reach), Some(None));
        assert_eq!(Covariate::Other("substrate".into()).read(&reach), Some(None));
        assert_eq!(Covariate::Other("temperature".into()).read(&reach), None);
    }

    #[test]
    fn test_json_names() {
        let c: Covariate = serde_json::from_str(r#""channel_width""#).unwrap();
        assert_eq!(c, Covariate::ChannelWidth);
        let c: Covariate = serde_json::from_str(r#"{"other": "temperature"}"#).unwrap();
        assert_eq!(c.to_string(), "temperature");
    }
}
