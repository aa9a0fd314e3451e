//! # Melting Temperature Estimation
//!
//! Tm is the temperature at the global maximum of the *oriented* first derivative
//! of the smoothed curve:
//!
//! 1. Sort by temperature and break exact ties with a strictly increasing
//!    perturbation of at most `1e-9` °C.
//! 2. Smooth with `max(25, strength)`; peak localization on raw data is unstable.
//! 3. Differentiate with second-order central differences (first-order at the
//!    edges) on the possibly non-uniform temperature grid.
//! 4. Flip the sign of the derivative so its largest-magnitude sample is positive.
//!    Melting transitions that show up as a fluorescence drop then still yield an
//!    upward peak.
//! 5. Tm is the temperature at the maximum of the oriented derivative.
//!
//! Degenerate curves (fewer than 3 points, no finite derivative, flat signal)
//! produce an undefined Tm (`None`), never an error.
//!
//! Results are memoized in a [`TmCache`] keyed by sample id, the sample's
//! mutation counter and the effective smoothing strength.

use std::collections::HashMap;

use log::debug;

use crate::curve::MIN_ANALYZABLE_POINTS;
use crate::smoothing::smooth_signal;

/// Smoothing strength always applied before differentiation.
pub const DERIVATIVE_SMOOTHING_FLOOR: u8 = 25;

/// Total perturbation spread applied to break duplicate temperatures.
pub const TIE_BREAK_SPAN: f64 = 1e-9;

/// Relative derivative magnitude below which a curve counts as flat. Scaled by
/// the signal magnitude over the mean temperature step, so smoothing round-off
/// on a constant curve never yields a Tm.
pub const FLAT_DERIVATIVE_TOLERANCE: f64 = 1e-9;

/// Result of a Tm estimation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TmEstimate {
    /// Melting temperature in °C, `None` when undefined
    pub tm: Option<f64>,
    /// Sorted (and tie-broken) temperatures the derivative is defined on
    pub temperatures: Vec<f64>,
    /// Oriented derivative normalized by its maximum, for display
    pub derivative: Option<Vec<f64>>,
}

impl TmEstimate {
    fn undefined(temperatures: Vec<f64>) -> Self {
        Self {
            tm: None,
            temperatures,
            derivative: None,
        }
    }
}

/// Effective derivative smoothing: the floor when display smoothing is off,
/// otherwise the larger of the floor and the display strength.
pub fn derivative_strength(smoothing_enabled: bool, strength: u8) -> u8 {
    if smoothing_enabled {
        DERIVATIVE_SMOOTHING_FLOOR.max(strength)
    } else {
        DERIVATIVE_SMOOTHING_FLOOR
    }
}

/// Estimate Tm for one curve.
///
/// `smoothing_strength` is raised to [`DERIVATIVE_SMOOTHING_FLOOR`] if lower.
pub fn estimate_tm(temperatures: &[f64], fluorescence: &[f64], smoothing_strength: u8) -> TmEstimate {
    let n = temperatures.len();
    if n < MIN_ANALYZABLE_POINTS || fluorescence.len() != n {
        return TmEstimate::undefined(temperatures.to_vec());
    }

    let (x, y) = sorted_with_tie_break(temperatures, fluorescence);

    let strength = smoothing_strength.max(DERIVATIVE_SMOOTHING_FLOOR);
    let smoothed = smooth_signal(&y, strength);
    let d = gradient(&smoothed, &x);

    let Some(i_dom) = nan_argmax(d.iter().map(|v| v.abs())) else {
        return TmEstimate::undefined(x);
    };
    let max_abs = d[i_dom].abs();
    if !max_abs.is_finite() || max_abs <= flat_derivative_limit(&x, &smoothed) {
        return TmEstimate::undefined(x);
    }

    let orient = if d[i_dom] > 0.0 { 1.0 } else { -1.0 };
    let oriented: Vec<f64> = d.iter().map(|v| v * orient).collect();

    let tm = nan_argmax(oriented.iter().copied())
        .filter(|&i| oriented[i].is_finite())
        .map(|i| x[i]);

    let max_positive = nan_argmax(oriented.iter().copied())
        .map(|i| oriented[i])
        .unwrap_or(0.0);
    let derivative = if max_positive > 0.0 {
        oriented.iter().map(|v| v / max_positive).collect()
    } else {
        oriented
    };

    debug!(
        "Tm estimate: n={}, strength={}, orient={}, tm={:?}",
        n, strength, orient, tm
    );

    TmEstimate {
        tm,
        temperatures: x,
        derivative: Some(derivative),
    }
}

/// Sort by temperature (stable) and, if any adjacent temperatures are exactly
/// equal, add `TIE_BREAK_SPAN * i / (n - 1)` to the i-th temperature.
fn sorted_with_tie_break(temperatures: &[f64], fluorescence: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut order: Vec<usize> = (0..temperatures.len()).collect();
    order.sort_by(|&a, &b| temperatures[a].total_cmp(&temperatures[b]));

    let mut x: Vec<f64> = order.iter().map(|&i| temperatures[i]).collect();
    let y: Vec<f64> = order.iter().map(|&i| fluorescence[i]).collect();

    if x.windows(2).any(|w| w[0] == w[1]) {
        let step = TIE_BREAK_SPAN / (x.len() - 1) as f64;
        for (i, value) in x.iter_mut().enumerate() {
            *value += step * i as f64;
        }
    }
    (x, y)
}

/// Largest |dy/dx| still treated as zero for this curve.
fn flat_derivative_limit(x: &[f64], y: &[f64]) -> f64 {
    let scale = y
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let (Some(first), Some(last)) = (x.first(), x.last()) else {
        return 0.0;
    };
    let intervals = x.len().saturating_sub(1).max(1) as f64;
    let mean_step = ((last - first) / intervals).max(f64::MIN_POSITIVE);
    let limit = FLAT_DERIVATIVE_TOLERANCE * scale / mean_step;
    if limit.is_finite() {
        limit
    } else {
        0.0
    }
}

/// Discrete derivative dy/dx on a non-uniform grid: second-order accurate
/// central differences in the interior, one-sided differences at both ends.
pub fn gradient(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n < 2 || x.len() != n {
        return Vec::new();
    }

    let mut d = vec![0.0; n];
    d[0] = (y[1] - y[0]) / (x[1] - x[0]);
    d[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let h1 = x[i] - x[i - 1];
        let h2 = x[i + 1] - x[i];
        let a = -h2 / (h1 * (h1 + h2));
        let b = (h2 - h1) / (h1 * h2);
        let c = h1 / (h2 * (h1 + h2));
        d[i] = a * y[i - 1] + b * y[i] + c * y[i + 1];
    }
    d
}

/// Index of the first maximum, ignoring NaN. `None` if every value is NaN.
fn nan_argmax<I: Iterator<Item = f64>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Cache key: sample id, mutation counter and effective smoothing strength.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmCacheKey {
    /// Sample identifier
    pub sample_id: String,
    /// Sample mutation counter at estimation time
    pub version: u64,
    /// Effective derivative smoothing strength
    pub strength: u8,
}

/// Memoized Tm estimates.
#[derive(Debug, Default)]
pub struct TmCache {
    entries: HashMap<TmCacheKey, TmEstimate>,
}

impl TmCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached estimate for `key`, if present.
    pub fn get(&self, key: &TmCacheKey) -> Option<&TmEstimate> {
        self.entries.get(key)
    }

    /// Return the cached estimate for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: TmCacheKey, compute: F) -> &TmEstimate
    where
        F: FnOnce() -> TmEstimate,
    {
        self.entries.entry(key).or_insert_with(compute)
    }

    /// Drop every entry belonging to `sample_id`.
    pub fn invalidate_sample(&mut self, sample_id: &str) {
        self.entries.retain(|key, _| key.sample_id != sample_id);
    }

    /// Drop every entry computed with a strength other than `strength`.
    pub fn retain_strength(&mut self, strength: u8) {
        self.entries.retain(|key, _| key.strength == strength);
    }

    /// Number of cached estimates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigmoid_curve(n: usize, center: f64) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| 25.0 + i as f64).collect();
        let y = x
            .iter()
            .map(|t| 100.0 + 4900.0 / (1.0 + (-(t - center) / 2.0).exp()))
            .collect();
        (x, y)
    }

    #[test]
    fn test_gradient_linear_nonuniform() {
        let x = [0.0, 1.0, 3.0, 3.5, 6.0];
        let y: Vec<f64> = x.iter().map(|t| 2.0 * t + 1.0).collect();
        for v in gradient(&y, &x) {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gradient_quadratic_interior_exact() {
        let x = [0.0, 1.0, 3.0, 3.5, 6.0];
        let y: Vec<f64> = x.iter().map(|t| t * t).collect();
        let d = gradient(&y, &x);
        for i in 1..4 {
            assert!((d[i] - 2.0 * x[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tm_on_sigmoid() {
        let (x, y) = sigmoid_curve(50, 50.0);
        let estimate = estimate_tm(&x, &y, 0);
        assert_eq!(estimate.tm, Some(50.0));
        let derivative = estimate.derivative.unwrap();
        assert_eq!(derivative.len(), 50);
        let max = derivative.iter().cloned().fold(f64::MIN, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tm_orientation_invariance() {
        let (x, y) = sigmoid_curve(50, 47.0);
        let negated: Vec<f64> = y.iter().map(|v| -v).collect();
        assert_eq!(estimate_tm(&x, &y, 30).tm, estimate_tm(&x, &negated, 30).tm);
    }

    #[test]
    fn test_tm_unsorted_input() {
        let (mut x, mut y) = sigmoid_curve(50, 50.0);
        x.reverse();
        y.reverse();
        let estimate = estimate_tm(&x, &y, 0);
        assert_eq!(estimate.tm, Some(50.0));
        assert!(estimate.temperatures.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_tm_short_or_flat_curve_is_undefined() {
        assert_eq!(estimate_tm(&[1.0, 2.0], &[1.0, 2.0], 0).tm, None);
        let flat = estimate_tm(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[7.0; 6], 0);
        assert_eq!(flat.tm, None);
        assert!(flat.derivative.is_none());
        let nan = estimate_tm(&[1.0, 2.0, 3.0], &[f64::NAN; 3], 0);
        assert_eq!(nan.tm, None);
    }

    #[test]
    fn test_tm_flat_curve_with_offset_is_undefined() {
        let x: Vec<f64> = (0..40).map(|i| 25.0 + 0.5 * i as f64).collect();
        for level in [0.0, 1e-3, 1234.5678, 1e7] {
            let estimate = estimate_tm(&x, &vec![level; 40], 50);
            assert_eq!(estimate.tm, None, "level {}", level);
        }
        let (x, y) = sigmoid_curve(50, 50.0);
        assert!(estimate_tm(&x, &y, 0).tm.is_some());
    }

    #[test]
    fn test_duplicate_temperatures_are_perturbed() {
        let x = [25.0, 26.0, 26.0, 27.0, 28.0, 29.0, 30.0];
        let y = [1.0, 2.0, 3.0, 5.0, 9.0, 10.0, 10.5];
        let estimate = estimate_tm(&x, &y, 0);
        assert!(estimate.temperatures.windows(2).all(|w| w[0] < w[1]));
        assert!(estimate.tm.is_some());
        let shift = estimate.temperatures[6] - 30.0;
        assert!(shift > 0.0 && shift <= TIE_BREAK_SPAN * 1.0001);
    }

    #[test]
    fn test_derivative_strength() {
        assert_eq!(derivative_strength(false, 80), 25);
        assert_eq!(derivative_strength(true, 10), 25);
        assert_eq!(derivative_strength(true, 60), 60);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let (x, y) = sigmoid_curve(64, 52.3);
        assert_eq!(estimate_tm(&x, &y, 40), estimate_tm(&x, &y, 40));
    }

    #[test]
    fn test_cache_invalidation() {
        let mut cache = TmCache::new();
        let key = |id: &str, version| TmCacheKey {
            sample_id: id.to_string(),
            version,
            strength: 25,
        };
        cache.get_or_insert_with(key("A1", 0), TmEstimate::default);
        cache.get_or_insert_with(key("A2", 0), TmEstimate::default);
        assert_eq!(cache.len(), 2);

        // A hit does not recompute
        let hit = cache.get_or_insert_with(key("A1", 0), || panic!("should be cached"));
        assert_eq!(hit.tm, None);

        cache.invalidate_sample("A1");
        assert!(cache.get(&key("A1", 0)).is_none());
        assert!(cache.get(&key("A2", 0)).is_some());

        cache.retain_strength(40);
        assert!(cache.is_empty());
    }
}
