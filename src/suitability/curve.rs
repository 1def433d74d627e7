//! Piecewise-linear suitability curves
//!
//! Algorithm:
//! 1. Find bracketing knots [xi, xi+1] where xi <= v <= xi+1
//! 2. Linear interpolation: s = yi + fraction × (yi+1 - yi)
//! 3. Below the first knot return the first value, above the last knot the last
//!    value (plateau, no extrapolation)
//!
//! A null or NaN covariate resolves through the curve's [`NullPolicy`].

use serde::{Deserialize, Serialize};

use crate::error::{HipError, Result};

/// What a curve yields for a null covariate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Value at the first knot
    #[default]
    LowestBucket,
    Fixed(f64),
}

/// Named response curve over one covariate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityCurve {
    pub name: String,
    /// (breakpoint, score) pairs with strictly increasing breakpoints
    pub knots: Vec<(f64, f64)>,
    #[serde(default)]
    pub null_policy: NullPolicy,
}

impl SuitabilityCurve {
    /// Build and validate a curve
    pub fn new(
        name: impl Into<String>,
        knots: Vec<(f64, f64)>,
        null_policy: NullPolicy,
    ) -> Result<Self> {
        let curve = SuitabilityCurve {
            name: name.into(),
            knots,
            null_policy,
        };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| HipError::InvalidCurve {
            curve: self.name.clone(),
            reason,
        };

        if self.knots.is_empty() {
            return Err(invalid("no breakpoints".to_string()));
        }
        if let Some(&(x, y)) = self.knots.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(invalid(format!("non-finite knot ({}, {})", x, y)));
        }
        if let Some(w) = self.knots.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(invalid(format!(
                "breakpoints not strictly increasing: {} then {}",
                w[0].0, w[1].0
            )));
        }
        if let NullPolicy::Fixed(v) = self.null_policy {
            if !v.is_finite() {
                return Err(invalid("non-finite null value".to_string()));
            }
        }
        Ok(())
    }

    /// Score a covariate value
    ///
    /// Assumes a validated curve. An empty curve scores 0.
    pub fn evaluate(&self, value: Option<f64>) -> f64 {
        let v = match value {
            Some(v) if !v.is_nan() => v,
            _ => return self.null_score(),
        };

        let (first, last) = match (self.knots.first(), self.knots.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return 0.0,
        };
        if v <= first.0 {
            return first.1;
        }
        if v >= last.0 {
            return last.1;
        }

        // First knot strictly above v; its predecessor is at or below v
        let upper = self.knots.partition_point(|&(x, _)| x <= v);
        let (x0, y0) = self.knots[upper - 1];
        let (x1, y1) = self.knots[upper];
        let fraction = (v - x0) / (x1 - x0);
        y0 + fraction * (y1 - y0)
    }

    fn null_score(&self) -> f64 {
        match self.null_policy {
            NullPolicy::LowestBucket => self.knots.first().map_or(0.0, |&(_, y)| y),
            NullPolicy::Fixed(v) => v,
        }
    }

    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((self.knots.first()?.0, self.knots.last()?.0))
    }
}
