use crate::curve::CurveError;

/// Errors that can occur during plate operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlateError {
    /// No sample with this identifier is loaded
    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    /// The sample is logically deleted and cannot be modified
    #[error("Sample {0} is deleted")]
    DeletedSample(String),

    /// Breakpoint index outside the curve
    #[error("Index {index} out of range for sample {sample} with {len} points")]
    IndexOutOfRange {
        /// Sample identifier
        sample: String,
        /// Requested breakpoint index
        index: usize,
        /// Number of points in the working curve
        len: usize,
    },

    /// Requested analysis range is empty after clamping to the data
    #[error("Invalid analysis range [{min}, {max}] for sample {sample}")]
    InvalidRange {
        /// Sample identifier
        sample: String,
        /// Lower bound after clamping
        min: f64,
        /// Upper bound after clamping
        max: f64,
    },

    /// Requested analysis range would keep fewer than three points
    #[error("Range would leave {count} point(s) in sample {sample}; at least 3 are required")]
    TooFewPoints {
        /// Sample identifier
        sample: String,
        /// Points inside the requested range
        count: usize,
    },

    /// Error from the curve data model
    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),
}
