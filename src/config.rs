//! # Analysis Configuration
//!
//! Immutable parameter structs passed into every plate operation. Nothing in the
//! algorithmic core reads ambient state; callers build an [`AnalysisConfig`],
//! validate it once at the boundary and hand it down.
//!
//! Settings can be loaded from a TOML file, where any subset of the tables may be
//! given:
//!
//! ```toml
//! # dsf.toml
//! [jump]
//! abs_threshold = 0.0
//! k = 6.0
//! method = "MAD"
//! iterative = true
//! multi_jump = true
//! max_iterations = 20
//! direction = "auto"
//!
//! [smoothing]
//! enabled = true
//! strength = 35
//!
//! [tm]
//! outlier_threshold = 20.0
//! reference = 52.0
//! expected_window = { lo = 55.0, hi = 65.0 }
//! ```
//!
//! The `parse_*` helpers implement the lenient text rules of interactive entry
//! fields: malformed numbers never fail, they fall back to a neutral value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::correction::{JumpDirection, DEFAULT_MAX_ITERATIONS};
use crate::smoothing::MAX_STRENGTH;
use crate::stats::DispersionMethod;
use crate::steps::StepThresholds;
use crate::tm::derivative_strength;
use crate::trim::TmWindow;

/// Default Tm outlier threshold in °C.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 20.0;

/// Smallest accepted Tm outlier threshold in °C.
pub const MIN_OUTLIER_THRESHOLD: f64 = 0.1;

/// Default display smoothing strength.
pub const DEFAULT_SMOOTHING_STRENGTH: u8 = 35;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its accepted range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Jump detection and correction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Absolute jump threshold (0 disables)
    pub abs_threshold: f64,
    /// Dispersion multiplier (0 disables)
    pub k: f64,
    /// Dispersion estimator
    pub method: DispersionMethod,
    /// Repeat multi-jump detection until convergence
    pub iterative: bool,
    /// Correct every detected jump at once instead of the largest one
    pub multi_jump: bool,
    /// Pass cap for iterative correction
    pub max_iterations: usize,
    /// Direction used by single-jump correction
    pub direction: JumpDirection,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            abs_threshold: 0.0,
            k: 6.0,
            method: DispersionMethod::Mad,
            iterative: false,
            multi_jump: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            direction: JumpDirection::Auto,
        }
    }
}

impl JumpConfig {
    /// Detection thresholds derived from this configuration.
    pub fn thresholds(&self) -> StepThresholds {
        StepThresholds::new(self.abs_threshold, self.k, self.method)
    }

    /// Number of correction passes allowed.
    pub fn pass_limit(&self) -> usize {
        if self.iterative {
            self.max_iterations
        } else {
            1
        }
    }
}

/// Display smoothing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Whether display smoothing is on
    pub enabled: bool,
    /// Strength in `0..=100`
    pub strength: u8,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: DEFAULT_SMOOTHING_STRENGTH,
        }
    }
}

impl SmoothingConfig {
    /// Strength used before differentiation.
    pub fn derivative_strength(&self) -> u8 {
        derivative_strength(self.enabled, self.strength)
    }
}

/// Tm outlier and auto-trim settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmConfig {
    /// Outlier threshold in °C
    pub outlier_threshold: f64,
    /// Fixed reference Tm; the mean of computed Tms when absent
    pub reference: Option<f64>,
    /// Expected Tm window for auto-trim
    pub expected_window: Option<TmWindow>,
}

impl Default for TmConfig {
    fn default() -> Self {
        Self {
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            reference: None,
            expected_window: None,
        }
    }
}

/// Complete parameter set for plate operations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Jump detection and correction
    pub jump: JumpConfig,
    /// Display smoothing
    pub smoothing: SmoothingConfig,
    /// Tm outliers and auto-trim
    pub tm: TmConfig,
}

impl AnalysisConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| ConfigError::InvalidValue {
            field,
            reason: reason.to_string(),
        };

        if !self.jump.abs_threshold.is_finite() || self.jump.abs_threshold < 0.0 {
            return Err(invalid("jump.abs_threshold", "must be finite and >= 0"));
        }
        if !self.jump.k.is_finite() || self.jump.k < 0.0 {
            return Err(invalid("jump.k", "must be finite and >= 0"));
        }
        if self.jump.max_iterations == 0 {
            return Err(invalid("jump.max_iterations", "must be at least 1"));
        }
        if self.smoothing.strength > MAX_STRENGTH {
            return Err(invalid("smoothing.strength", "must be between 0 and 100"));
        }
        if !self.tm.outlier_threshold.is_finite() || self.tm.outlier_threshold <= 0.0 {
            return Err(invalid("tm.outlier_threshold", "must be finite and > 0"));
        }
        if self.tm.reference.is_some_and(|r| !r.is_finite()) {
            return Err(invalid("tm.reference", "must be finite"));
        }
        if let Some(window) = self.tm.expected_window {
            if TmWindow::new(window.lo, window.hi).is_none() {
                return Err(invalid("tm.expected_window", "needs finite bounds with lo < hi"));
            }
        }
        Ok(())
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Jump threshold from free text: invalid or negative input gives 0.
pub fn parse_threshold(text: &str) -> f64 {
    match parse_float(text) {
        Some(v) if v.is_finite() => v.max(0.0),
        _ => 0.0,
    }
}

/// Outlier threshold from free text: invalid input gives the default, values
/// below the minimum are raised to it.
pub fn parse_outlier_threshold(text: &str) -> f64 {
    match parse_float(text) {
        Some(v) if v.is_finite() => v.max(MIN_OUTLIER_THRESHOLD),
        _ => DEFAULT_OUTLIER_THRESHOLD,
    }
}

/// Smoothing strength from free text, clamped to `0..=100`; invalid gives 0.
pub fn parse_strength(text: &str) -> u8 {
    match parse_float(text) {
        Some(v) if v.is_finite() => v.round().clamp(0.0, f64::from(MAX_STRENGTH)) as u8,
        _ => 0,
    }
}

/// Expected Tm window from two free-text bounds; both are required.
pub fn parse_tm_window(lo: &str, hi: &str) -> Option<TmWindow> {
    TmWindow::new(parse_float(lo)?, parse_float(hi)?)
}

/// Reference Tm from free text; blank or invalid means "use the mean".
pub fn parse_tm_reference(text: &str) -> Option<f64> {
    parse_float(text).filter(|v| v.is_finite())
}
