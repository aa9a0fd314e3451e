//! # Auto-Trim Search
//!
//! Greedy bidirectional search for a temperature sub-window whose Tm falls inside
//! an expected window `[lo, hi]`.
//!
//! Starting from the full curve, one point at a time is dropped from the low end
//! while Tm is below `lo`, or from the high end while Tm is above `hi`, and Tm is
//! re-estimated on the remaining slice. The search stops at the first slice whose
//! Tm is inside the window, or fails when fewer than three points would remain or
//! Tm becomes undefined.
//!
//! The search is a local one-point-per-step walk and is not guaranteed to find the
//! minimal-removal window on curves with several derivative peaks. Proposals are
//! pure values; applying one is up to the caller.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::curve::{AnalysisRange, Curve, MIN_ANALYZABLE_POINTS};
use crate::tm::estimate_tm;

/// Expected Tm window, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TmWindow {
    /// Lower bound in °C
    pub lo: f64,
    /// Upper bound in °C
    pub hi: f64,
}

impl TmWindow {
    /// Create a window; both ends must be finite with `lo < hi`.
    pub fn new(lo: f64, hi: f64) -> Option<Self> {
        (lo.is_finite() && hi.is_finite() && lo < hi).then_some(Self { lo, hi })
    }

    /// Whether `tm` lies inside the window.
    pub fn contains(&self, tm: f64) -> bool {
        self.lo <= tm && tm <= self.hi
    }
}

/// Outcome of a successful trim search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimProposal {
    /// Tm on the untrimmed curve
    pub tm_before: f64,
    /// Tm on the proposed slice
    pub tm_after: f64,
    /// Points dropped from the low-temperature end
    pub removed_low: usize,
    /// Points dropped from the high-temperature end
    pub removed_high: usize,
    /// Lowest temperature kept
    pub new_min: f64,
    /// Highest temperature kept
    pub new_max: f64,
    /// Degrees trimmed from the low end
    pub degrees_low: f64,
    /// Degrees trimmed from the high end
    pub degrees_high: f64,
}

impl TrimProposal {
    /// Total number of points dropped.
    pub fn removed_total(&self) -> usize {
        self.removed_low + self.removed_high
    }

    /// Analysis range covering the kept slice.
    pub fn range(&self) -> AnalysisRange {
        AnalysisRange {
            min: self.new_min,
            max: self.new_max,
        }
    }
}

/// Search for a slice of `curve` whose Tm (estimated with `strength`) lies in
/// `window`.
///
/// Returns `None` when Tm is undefined, already inside the window, or no slice
/// with at least three points brings it inside.
pub fn search_trim(curve: &Curve, window: &TmWindow, strength: u8) -> Option<TrimProposal> {
    let x = curve.temperatures();
    let y = curve.fluorescence();
    let n = x.len();
    if n < MIN_ANALYZABLE_POINTS {
        return None;
    }

    let tm_before = estimate_tm(x, y, strength).tm.filter(|t| t.is_finite())?;
    if window.contains(tm_before) {
        return None;
    }

    let (mut left, mut right) = (0usize, n - 1);
    let (mut removed_low, mut removed_high) = (0usize, 0usize);
    let max_remove = n - MIN_ANALYZABLE_POINTS;
    let mut tm_current = tm_before;
    let mut found = None;

    while removed_low + removed_high < max_remove {
        if tm_current < window.lo {
            if left >= right {
                break;
            }
            left += 1;
            removed_low += 1;
        } else if tm_current > window.hi {
            if right <= left {
                break;
            }
            right -= 1;
            removed_high += 1;
        } else {
            break;
        }

        if right - left + 1 < MIN_ANALYZABLE_POINTS {
            break;
        }

        let Some(tm) = estimate_tm(&x[left..=right], &y[left..=right], strength)
            .tm
            .filter(|t| t.is_finite())
        else {
            break;
        };
        debug!(
            "Trim step: slice [{}, {}] ({:.2}-{:.2} °C) -> Tm {:.2}",
            left, right, x[left], x[right], tm
        );
        tm_current = tm;

        if window.contains(tm) {
            found = Some(tm);
            break;
        }
    }

    let tm_after = found?;
    let (new_min, new_max) = (x[left], x[right]);
    Some(TrimProposal {
        tm_before,
        tm_after,
        removed_low,
        removed_high,
        new_min,
        new_max,
        degrees_low: (new_min - x[0]).max(0.0),
        degrees_high: (x[n - 1] - new_max).max(0.0),
    })
}
