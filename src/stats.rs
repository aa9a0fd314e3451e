//! # Dispersion Estimators
//!
//! Scale estimates of sample-to-sample differences, used as adaptive jump
//! thresholds by [`crate::steps`].
//!
//! Two estimators are available:
//!
//! - **MAD**: `1.4826 × median(|d − median(d)|)`, robust to the very jumps it is
//!   used to detect.
//! - **STD**: classical sample standard deviation (N−1 denominator).
//!
//! Neither estimator fails. Empty or too-short inputs yield `0.0`, and non-finite
//! values propagate as NaN, which callers treat as "no dispersion".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Consistency constant that scales the MAD to a standard deviation for
/// normally distributed data.
pub const MAD_SCALE: f64 = 1.4826;

/// Dispersion estimator used for relative jump thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispersionMethod {
    /// Scaled median absolute deviation (default).
    #[default]
    Mad,
    /// Sample standard deviation.
    Std,
}

impl DispersionMethod {
    /// Returns all accepted method names.
    pub fn variants() -> &'static [&'static str] {
        &["MAD", "STD"]
    }
}

impl fmt::Display for DispersionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispersionMethod::Mad => write!(f, "MAD"),
            DispersionMethod::Std => write!(f, "STD"),
        }
    }
}

impl FromStr for DispersionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MAD" => Ok(DispersionMethod::Mad),
            "STD" | "SD" | "STDDEV" => Ok(DispersionMethod::Std),
            _ => Err(format!(
                "Unknown dispersion method '{}'. Valid options: {}",
                s,
                DispersionMethod::variants().join(", ")
            )),
        }
    }
}

/// Estimate the dispersion of `diffs` with the given method.
pub fn dispersion(diffs: &[f64], method: DispersionMethod) -> f64 {
    match method {
        DispersionMethod::Mad => robust_mad_sigma(diffs),
        DispersionMethod::Std => sample_std_dev(diffs),
    }
}

/// Median absolute deviation scaled by [`MAD_SCALE`]. NaN entries are ignored;
/// returns 0 for an empty input.
pub fn robust_mad_sigma(diffs: &[f64]) -> f64 {
    if diffs.is_empty() {
        return 0.0;
    }
    let center = median(diffs);
    let deviations: Vec<f64> = diffs.iter().map(|d| (d - center).abs()).collect();
    MAD_SCALE * median(&deviations)
}

/// Sample standard deviation with an N−1 denominator; returns 0 for fewer than
/// two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1.0)).sqrt()
}

/// Median of the non-NaN values, averaging the two middle values for even
/// counts. Returns NaN when no value is usable.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// First differences `v[i+1] − v[i]`.
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
