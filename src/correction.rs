//! # Jump Correction
//!
//! Removes additive discontinuities by shifting every sample after a breakpoint
//! by a constant offset (a *suffix shift*). Corrections return a new signal; the
//! input is never modified.
//!
//! - [`correct_single_jump`] shifts the suffix after one chosen breakpoint.
//! - [`correct_multi_jump`] detects every qualifying breakpoint with
//!   [`find_step_indices`] and removes them all in one pass by accumulating the
//!   per-breakpoint offsets with a cumulative sum. In iterative mode the
//!   detect/correct cycle repeats until nothing qualifies or the iteration cap
//!   is reached.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::steps::{find_step_indices, StepThresholds};

/// Default cap on detect/correct passes in iterative multi-jump mode.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Direction of a single-jump correction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpDirection {
    /// Translate the later segment so it meets the earlier one (default)
    #[default]
    Auto,
    /// Add the jump delta to the later segment
    Add,
    /// Subtract the jump delta from the later segment
    #[serde(rename = "sub", alias = "subtract")]
    Subtract,
}

impl JumpDirection {
    /// Offset applied to the suffix for a jump of size `delta`.
    pub fn offset(&self, delta: f64) -> f64 {
        match self {
            JumpDirection::Auto | JumpDirection::Subtract => -delta,
            JumpDirection::Add => delta,
        }
    }

    /// Returns all accepted direction names.
    pub fn variants() -> &'static [&'static str] {
        &["auto", "add", "sub"]
    }
}

impl fmt::Display for JumpDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JumpDirection::Auto => write!(f, "auto"),
            JumpDirection::Add => write!(f, "add"),
            JumpDirection::Subtract => write!(f, "sub"),
        }
    }
}

impl FromStr for JumpDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(JumpDirection::Auto),
            "add" => Ok(JumpDirection::Add),
            "sub" | "subtract" => Ok(JumpDirection::Subtract),
            _ => Err(format!(
                "Unknown jump direction '{}'. Valid options: {}",
                s,
                JumpDirection::variants().join(", ")
            )),
        }
    }
}

/// Shift every sample after `index` by the offset for the jump between
/// `y[index]` and `y[index + 1]`. Returns `None` if `index + 1` is out of bounds.
pub fn correct_single_jump(y: &[f64], index: usize, direction: JumpDirection) -> Option<Vec<f64>> {
    if index >= y.len().saturating_sub(1) {
        return None;
    }
    let delta = y[index + 1] - y[index];
    let offset = direction.offset(delta);
    debug!("Single-jump correction at {}: delta={:.4}, offset={:.4}", index, delta, offset);

    let mut corrected = y.to_vec();
    for value in &mut corrected[index + 1..] {
        *value += offset;
    }
    Some(corrected)
}

/// Result of a multi-jump correction.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiJumpOutcome {
    /// Corrected signal
    pub values: Vec<f64>,
    /// Number of passes that changed the signal
    pub passes: usize,
    /// Breakpoints corrected in each pass
    pub corrected_indices: Vec<Vec<usize>>,
    /// Whether detection finds no further jumps in the result
    pub converged: bool,
}

impl MultiJumpOutcome {
    /// Whether any breakpoint was corrected.
    pub fn changed(&self) -> bool {
        self.passes > 0
    }
}

/// Remove all jumps detected under `thresholds`.
///
/// With `iterative` the cycle repeats up to `max_iterations` passes; otherwise a
/// single pass is made. A warning is logged when iterative mode stops at the cap
/// with jumps still present.
pub fn correct_multi_jump(
    y: &[f64],
    thresholds: &StepThresholds,
    iterative: bool,
    max_iterations: usize,
) -> MultiJumpOutcome {
    let max_passes = if iterative { max_iterations.max(1) } else { 1 };
    let mut values = y.to_vec();
    let mut corrected_indices = Vec::new();

    for _ in 0..max_passes {
        let indices = find_step_indices(&values, thresholds);
        if indices.is_empty() {
            break;
        }
        values = remove_steps(&values, &indices);
        corrected_indices.push(indices);
    }

    let passes = corrected_indices.len();
    let converged = find_step_indices(&values, thresholds).is_empty();
    if iterative && !converged {
        warn!(
            "Multi-jump correction stopped after {} passes without converging; jumps remain",
            passes
        );
    }

    MultiJumpOutcome {
        values,
        passes,
        corrected_indices,
        converged,
    }
}

/// Apply `-diff[i]` at position `i + 1` for every breakpoint and propagate the
/// offsets forward with a cumulative sum.
fn remove_steps(y: &[f64], indices: &[usize]) -> Vec<f64> {
    let mut adjust = vec![0.0; y.len()];
    for &i in indices {
        if i + 1 < y.len() {
            adjust[i + 1] -= y[i + 1] - y[i];
        }
    }
    let mut offset = 0.0;
    y.iter()
        .zip(adjust)
        .map(|(v, a)| {
            offset += a;
            v + offset
        })
        .collect()
}
