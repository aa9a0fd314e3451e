use serde::Serialize;

use crate::trim::TrimProposal;

/// Tm of one non-deleted sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmEntry {
    /// Sample identifier
    pub sample_id: String,
    /// Tm in °C, `None` when undefined
    pub tm: Option<f64>,
}

/// Sample whose Tm deviates from the reference by at least the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmOutlier {
    /// Sample identifier
    pub sample_id: String,
    /// Tm in °C
    pub tm: f64,
    /// Absolute deviation from the reference
    pub deviation: f64,
}

/// Where the outlier reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    /// Explicit value from the configuration
    Fixed,
    /// Mean of the finite Tms (0 when there are none)
    Mean,
}

/// Plate-wide Tm statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmSummary {
    /// Per-sample Tm in plate order
    pub entries: Vec<TmEntry>,
    /// Mean of the finite Tms
    pub mean: Option<f64>,
    /// Number of finite Tms
    pub valid_count: usize,
    /// Reference Tm used for outlier detection
    pub reference: f64,
    /// Origin of the reference
    pub reference_source: ReferenceSource,
    /// Outlier threshold in °C
    pub threshold: f64,
    /// Outliers in plate order
    pub outliers: Vec<TmOutlier>,
}

impl TmSummary {
    /// Whether `sample_id` is listed as an outlier.
    pub fn is_outlier(&self, sample_id: &str) -> bool {
        self.outliers.iter().any(|o| o.sample_id == sample_id)
    }
}

/// One row of the Tm table export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmTableRow {
    /// Sample identifier
    pub sample_id: String,
    /// Tm of the visible curve
    pub tm_corrected: Option<f64>,
    /// Tm of the visible curve after pre-smoothing
    pub tm_smoothed: Option<f64>,
    /// Pre-smoothing strength
    pub smooth_strength: u8,
}

/// Auto-trim proposal for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimCandidate {
    /// Sample identifier
    pub sample_id: String,
    /// Proposed trim
    pub proposal: TrimProposal,
}

/// Result of a batch correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchCorrection {
    /// Samples changed by this batch, in plate order
    pub corrected: Vec<String>,
    /// Suspects left after the rescan
    pub remaining_suspects: usize,
}
