//! # Step Detection
//!
//! Finds abrupt additive discontinuities ("jumps") between adjacent samples.
//!
//! The active threshold combines an absolute criterion and a relative one scaled
//! by the dispersion of the first differences:
//!
//! ```text
//! threshold = max(abs_threshold if abs_threshold > 0 else -inf,
//!                 k * dispersion(diffs) if k > 0 and dispersion > 0 else -inf)
//! ```
//!
//! A threshold that ends up non-positive or non-finite disables detection. Index
//! `i` qualifies when `|y[i+1] - y[i]|` strictly exceeds the threshold.
//!
//! [`scan_suspect`] is the cheaper one-jump-per-sample rule used to build the
//! review list: only the largest jump is considered, and it is flagged when it
//! exceeds either criterion on its own.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::stats::{dispersion, first_differences, DispersionMethod};

/// Thresholds shared by detection and correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepThresholds {
    /// Absolute jump threshold in fluorescence units (0 disables)
    pub abs_threshold: f64,
    /// Multiplier applied to the dispersion of the differences (0 disables)
    pub k: f64,
    /// Dispersion estimator for the relative criterion
    pub method: DispersionMethod,
}

impl Default for StepThresholds {
    fn default() -> Self {
        Self {
            abs_threshold: 0.0,
            k: 6.0,
            method: DispersionMethod::Mad,
        }
    }
}

impl StepThresholds {
    /// Create thresholds
    pub fn new(abs_threshold: f64, k: f64, method: DispersionMethod) -> Self {
        Self {
            abs_threshold,
            k,
            method,
        }
    }

    /// Combined threshold for a set of first differences, or `None` when no
    /// criterion is active.
    pub fn active_threshold(&self, diffs: &[f64]) -> Option<f64> {
        let disp = dispersion(diffs, self.method);
        let relative = if self.k > 0.0 && disp > 0.0 {
            self.k * disp
        } else {
            f64::NEG_INFINITY
        };
        let absolute = if self.abs_threshold > 0.0 {
            self.abs_threshold
        } else {
            f64::NEG_INFINITY
        };
        let threshold = relative.max(absolute);
        (threshold.is_finite() && threshold > 0.0).then_some(threshold)
    }
}

/// Indices `i` where the jump between `y[i]` and `y[i+1]` exceeds the active
/// threshold, in ascending order.
pub fn find_step_indices(y: &[f64], thresholds: &StepThresholds) -> Vec<usize> {
    let diffs = first_differences(y);
    if diffs.is_empty() {
        return Vec::new();
    }
    let Some(threshold) = thresholds.active_threshold(&diffs) else {
        return Vec::new();
    };

    let indices: Vec<usize> = diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.abs() > threshold)
        .map(|(i, _)| i)
        .collect();
    if !indices.is_empty() {
        debug!("Detected {} step(s) above {:.4}: {:?}", indices.len(), threshold, indices);
    }
    indices
}

/// Largest jump of a curve, as reported by [`scan_suspect`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuspectJump {
    /// Index `i` of the jump between samples `i` and `i + 1`
    pub index: usize,
    /// Signed difference `y[i+1] - y[i]`
    pub delta: f64,
    /// Dispersion of the curve's first differences
    pub dispersion: f64,
}

/// Single-jump suspect rule: returns the largest-magnitude jump when it exceeds
/// the absolute threshold or `k` times the dispersion.
pub fn scan_suspect(y: &[f64], thresholds: &StepThresholds) -> Option<SuspectJump> {
    let diffs = first_differences(y);
    let (index, delta) = diffs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, b)) if !(d.abs() > b.abs()) => best,
            _ => Some((i, d)),
        })?;

    let disp = dispersion(&diffs, thresholds.method);
    let max_jump = delta.abs();
    let exceeds_abs = thresholds.abs_threshold > 0.0 && max_jump > thresholds.abs_threshold;
    let exceeds_rel = thresholds.k > 0.0 && disp > 0.0 && max_jump > thresholds.k * disp;

    (exceeds_abs || exceeds_rel).then_some(SuspectJump {
        index,
        delta,
        dispersion: disp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_with_jump(n: usize, at: usize, size: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let noise = if i % 3 == 0 { 0.3 } else { -0.1 };
                i as f64 + noise + if i > at { size } else { 0.0 }
            })
            .collect()
    }

    #[test]
    fn test_absolute_threshold() {
        let y = [0.0, 1.0, 2.0, 10.0, 11.0];
        let thresholds = StepThresholds::new(5.0, 0.0, DispersionMethod::Mad);
        assert_eq!(find_step_indices(&y, &thresholds), vec![2]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let y = [0.0, 5.0, 10.0];
        let thresholds = StepThresholds::new(5.0, 0.0, DispersionMethod::Mad);
        assert!(find_step_indices(&y, &thresholds).is_empty());
    }

    #[test]
    fn test_relative_threshold_mad() {
        let y = ramp_with_jump(40, 20, 50.0);
        let thresholds = StepThresholds::new(0.0, 6.0, DispersionMethod::Mad);
        assert_eq!(find_step_indices(&y, &thresholds), vec![20]);
    }

    #[test]
    fn test_max_of_both_criteria() {
        let y = ramp_with_jump(40, 20, 50.0);
        // Absolute threshold dominates and exceeds the jump
        let thresholds = StepThresholds::new(100.0, 6.0, DispersionMethod::Mad);
        assert!(find_step_indices(&y, &thresholds).is_empty());
    }

    #[test]
    fn test_no_active_criterion() {
        let y = ramp_with_jump(40, 20, 50.0);
        let thresholds = StepThresholds::new(0.0, 0.0, DispersionMethod::Std);
        assert!(find_step_indices(&y, &thresholds).is_empty());
        assert!(thresholds.active_threshold(&[1.0, 2.0]).is_none());
        assert!(find_step_indices(&[1.0], &StepThresholds::default()).is_empty());
    }

    #[test]
    fn test_zero_dispersion_disables_relative() {
        // Constant differences: MAD is zero
        let y = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(find_step_indices(&y, &StepThresholds::default()).is_empty());
    }

    #[test]
    fn test_scan_suspect() {
        let y = ramp_with_jump(40, 12, -30.0);
        let suspect = scan_suspect(&y, &StepThresholds::default()).unwrap();
        assert_eq!(suspect.index, 12);
        assert!(suspect.delta < -25.0);
        assert!(suspect.dispersion > 0.0);

        let clean = ramp_with_jump(40, 12, 0.0);
        assert!(scan_suspect(&clean, &StepThresholds::default()).is_none());
        assert!(scan_suspect(&[1.0], &StepThresholds::default()).is_none());
    }

    #[test]
    fn test_scan_suspect_absolute_only() {
        let y = [0.0, 1.0, 2.0, 10.0, 11.0];
        let thresholds = StepThresholds::new(5.0, 0.0, DispersionMethod::Std);
        assert_eq!(scan_suspect(&y, &thresholds).map(|s| s.index), Some(2));
    }
}
