//! # Curve Data Model
//!
//! A [`Curve`] is the ordered (temperature, fluorescence) trace of one sample.
//! Curves are stored sorted by ascending temperature and are never patched in
//! place: every correction, trim, undo or redo produces a new curve that replaces
//! the previous one wholesale.
//!
//! An [`AnalysisRange`] is an inclusive temperature sub-window that restricts which
//! samples of a curve take part in Tm computation and export. It is a filter, the
//! underlying data is never removed.

use serde::{Deserialize, Serialize};

/// Minimum number of samples a curve needs to be analyzable.
pub const MIN_ANALYZABLE_POINTS: usize = 3;

/// Errors raised while building curves or ranges
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Temperature and fluorescence arrays differ in length
    #[error("Array length mismatch: temperature array has {temperatures} elements, fluorescence array has {fluorescence} elements")]
    LengthMismatch {
        /// Number of temperature values
        temperatures: usize,
        /// Number of fluorescence values
        fluorescence: usize,
    },

    /// Range bounds are not finite or not strictly increasing
    #[error("Invalid analysis range [{min}, {max}]")]
    InvalidRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

/// One sample's fluorescence-vs-temperature trace, sorted by temperature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    temperatures: Vec<f64>,
    fluorescence: Vec<f64>,
}

impl Curve {
    /// Create a curve from parallel arrays. Points are stably sorted by ascending
    /// temperature, so duplicate temperatures keep their input order.
    pub fn new(temperatures: Vec<f64>, fluorescence: Vec<f64>) -> Result<Self, CurveError> {
        if temperatures.len() != fluorescence.len() {
            return Err(CurveError::LengthMismatch {
                temperatures: temperatures.len(),
                fluorescence: fluorescence.len(),
            });
        }

        if temperatures.windows(2).all(|w| w[0] <= w[1]) {
            return Ok(Self {
                temperatures,
                fluorescence,
            });
        }

        let mut order: Vec<usize> = (0..temperatures.len()).collect();
        order.sort_by(|&a, &b| temperatures[a].total_cmp(&temperatures[b]));
        Ok(Self {
            temperatures: order.iter().map(|&i| temperatures[i]).collect(),
            fluorescence: order.iter().map(|&i| fluorescence[i]).collect(),
        })
    }

    /// Create a curve from (temperature, fluorescence) pairs.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (temperatures, fluorescence): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        // Both halves come from the same iterator, so lengths always agree.
        Self::new(temperatures, fluorescence).unwrap_or_default()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    /// Whether the curve has no samples.
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Temperatures in ascending order.
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Fluorescence values aligned with [`Curve::temperatures`].
    pub fn fluorescence(&self) -> &[f64] {
        &self.fluorescence
    }

    /// Iterate over (temperature, fluorescence) pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.temperatures
            .iter()
            .copied()
            .zip(self.fluorescence.iter().copied())
    }

    /// Lowest and highest temperature, if any.
    pub fn temperature_bounds(&self) -> Option<(f64, f64)> {
        Some((*self.temperatures.first()?, *self.temperatures.last()?))
    }

    /// A new curve with the same temperatures and replaced fluorescence.
    pub fn with_fluorescence(&self, fluorescence: Vec<f64>) -> Result<Self, CurveError> {
        if fluorescence.len() != self.len() {
            return Err(CurveError::LengthMismatch {
                temperatures: self.len(),
                fluorescence: fluorescence.len(),
            });
        }
        Ok(Self {
            temperatures: self.temperatures.clone(),
            fluorescence,
        })
    }

    /// Sub-curve over the index range `start..=end` (clamped to the curve).
    pub fn slice(&self, start: usize, end: usize) -> Self {
        if self.is_empty() || start > end || start >= self.len() {
            return Self::default();
        }
        let end = end.min(self.len() - 1);
        Self {
            temperatures: self.temperatures[start..=end].to_vec(),
            fluorescence: self.fluorescence[start..=end].to_vec(),
        }
    }

    /// Indices of the samples inside `range`, in curve order.
    pub fn indices_in(&self, range: &AnalysisRange) -> Vec<usize> {
        self.temperatures
            .iter()
            .enumerate()
            .filter(|(_, &t)| range.contains(t))
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of samples inside `range`.
    pub fn count_in(&self, range: &AnalysisRange) -> usize {
        self.temperatures.iter().filter(|&&t| range.contains(t)).count()
    }

    /// The samples inside `range`, or `None` when fewer than three remain.
    pub fn restrict(&self, range: &AnalysisRange) -> Option<Self> {
        let (temperatures, fluorescence): (Vec<f64>, Vec<f64>) =
            self.points().filter(|(t, _)| range.contains(*t)).unzip();
        (temperatures.len() >= MIN_ANALYZABLE_POINTS).then_some(Self {
            temperatures,
            fluorescence,
        })
    }

    /// Bit-for-bit equality, distinguishing `0.0` from `-0.0` and matching NaNs.
    pub fn bit_identical(&self, other: &Curve) -> bool {
        fn same(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        same(&self.temperatures, &other.temperatures) && same(&self.fluorescence, &other.fluorescence)
    }
}

/// Inclusive temperature window restricting analysis and export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRange {
    /// Lower bound in °C (inclusive)
    pub min: f64,
    /// Upper bound in °C (inclusive)
    pub max: f64,
}

impl AnalysisRange {
    /// Create a range; bounds must be finite with `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, CurveError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(CurveError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Whether `temperature` lies inside the range.
    pub fn contains(&self, temperature: f64) -> bool {
        self.min <= temperature && temperature <= self.max
    }

    /// Clamp both bounds into `[lo, hi]`, swapping them if they cross.
    pub fn clamped_to(&self, lo: f64, hi: f64) -> Self {
        let min = self.min.clamp(lo, hi);
        let max = self.max.clamp(lo, hi);
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Curve {
        Curve::new(vec![25.0, 26.0, 27.0, 28.0, 29.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
    }

    #[test]
    fn test_curve_creation_sorts_by_temperature() {
        let curve = Curve::new(vec![30.0, 25.0, 27.5], vec![3.0, 1.0, 2.0]).unwrap();
        assert_eq!(curve.temperatures(), &[25.0, 27.5, 30.0]);
        assert_eq!(curve.fluorescence(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_duplicate_temperatures_keep_input_order() {
        let curve = Curve::new(vec![26.0, 25.0, 26.0], vec![10.0, 1.0, 20.0]).unwrap();
        assert_eq!(curve.fluorescence(), &[1.0, 10.0, 20.0]);
    }

    #[test]
    fn test_curve_array_mismatch() {
        let result = Curve::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0]);
        assert!(matches!(result, Err(CurveError::LengthMismatch { .. })));
    }

    #[test]
    fn test_restrict() {
        let curve = curve();
        let range = AnalysisRange::new(26.0, 28.0).unwrap();
        let restricted = curve.restrict(&range).unwrap();
        assert_eq!(restricted.temperatures(), &[26.0, 27.0, 28.0]);
        assert_eq!(curve.count_in(&range), 3);
        assert_eq!(curve.indices_in(&range), vec![1, 2, 3]);

        let narrow = AnalysisRange::new(26.0, 27.0).unwrap();
        assert!(curve.restrict(&narrow).is_none());
    }

    #[test]
    fn test_invalid_range() {
        assert!(AnalysisRange::new(30.0, 30.0).is_err());
        assert!(AnalysisRange::new(f64::NAN, 30.0).is_err());
        assert!(AnalysisRange::new(31.0, 30.0).is_err());
    }

    #[test]
    fn test_range_clamp() {
        let range = AnalysisRange { min: 10.0, max: 40.0 }.clamped_to(25.0, 29.0);
        assert_eq!(range, AnalysisRange { min: 25.0, max: 29.0 });
    }

    #[test]
    fn test_slice_and_bounds() {
        let curve = curve();
        let slice = curve.slice(1, 3);
        assert_eq!(slice.temperature_bounds(), Some((26.0, 28.0)));
        assert!(curve.slice(3, 1).is_empty());
        assert_eq!(curve.slice(3, 99).len(), 2);
    }

    #[test]
    fn test_bit_identical() {
        let a = curve();
        let b = a.with_fluorescence(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(a.bit_identical(&b));
        let c = a.with_fluorescence(vec![1.0, 2.0, 3.0, 4.0, 5.000001]).unwrap();
        assert!(!a.bit_identical(&c));
        assert!(a.with_fluorescence(vec![1.0]).is_err());
    }
}
