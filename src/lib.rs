//! # DSF Harmonizer - Jump Correction and Tm Estimation for DSF Curves
//!
//! `dsf_harmonizer` cleans up Differential Scanning Fluorimetry (thermal shift)
//! melt curves and estimates each sample's melting temperature (Tm).
//!
//! Instrument artifacts often show up as abrupt additive steps ("jumps") in the
//! fluorescence signal. They distort the first derivative and therefore the Tm.
//! This crate detects such steps with robust statistics, removes them by
//! shifting the later part of the curve, and estimates the Tm from the peak of
//! the smoothed derivative.
//!
//! ## Key Features
//!
//! - **Robust step detection**: absolute and MAD/STD-relative thresholds on the
//!   first differences.
//!
//! - **Jump correction**: single jumps with a chosen direction, or every detected
//!   jump at once, optionally iterated until none remain.
//!
//! - **Derivative Tm**: Savitzky–Golay smoothing, orientation-independent
//!   derivative peak, cached per sample state.
//!
//! - **Auto-trim**: greedy slice search that moves a sample's Tm into an
//!   expected window.
//!
//! - **Per-sample history**: every edit can be undone and redone.
//!
//! - **GDSF import/export**: the flat 3-column tab-separated format plus a Tm
//!   table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dsf_harmonizer::prelude::*;
//!
//! let mut plate = read_gdsf("plate.gdsf")?;
//! let config = AnalysisConfig::default();
//!
//! // Flag and correct suspect samples
//! plate.scan_suspects(&config.jump);
//! let batch = plate.correct_all_suspects(&config.jump);
//! println!("corrected: {:?}", batch.corrected);
//!
//! // Tm statistics and outliers
//! let summary = plate.tm_summary(&config);
//! for outlier in &summary.outliers {
//!     println!("{} deviates by {:.2} °C", outlier.sample_id, outlier.deviation);
//! }
//!
//! write_corrected(&plate, "plate_corrected.gdsf")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`stats`]: dispersion estimators (scaled MAD, sample standard deviation)
//! - [`smoothing`]: strength-controlled Savitzky–Golay smoothing
//! - [`tm`]: derivative-peak Tm estimation and its cache
//! - [`steps`]: step detection and the suspect rule
//! - [`correction`]: single- and multi-jump correction
//! - [`trim`]: auto-trim search for an expected Tm window
//! - [`history`]: undo/redo stacks
//! - [`curve`]: curve and analysis range types
//! - [`plate`]: per-sample state and plate-level workflow
//! - [`config`]: analysis parameters and TOML loading
//! - [`gdsf`]: file import and export
//! - [`report`]: plain and colorized plate reports

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod correction;
pub mod curve;
pub mod gdsf;
pub mod history;
pub mod plate;
pub mod report;
pub mod smoothing;
pub mod stats;
pub mod steps;
pub mod tm;
pub mod trim;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{AnalysisConfig, ConfigError, JumpConfig, SmoothingConfig, TmConfig};
    pub use crate::correction::{correct_multi_jump, correct_single_jump, JumpDirection, MultiJumpOutcome};
    pub use crate::curve::{AnalysisRange, Curve, CurveError};
    pub use crate::gdsf::{
        read_curves, read_gdsf, write_corrected, write_corrected_smoothed, write_tm_table_file,
        GdsfError,
    };
    pub use crate::plate::{
        BatchCorrection, Plate, PlateError, Sample, TmSummary, TmTableRow, Transition,
        TrimCandidate,
    };
    pub use crate::report::PlateReport;
    pub use crate::smoothing::smooth_signal;
    pub use crate::stats::DispersionMethod;
    pub use crate::steps::{find_step_indices, scan_suspect, StepThresholds, SuspectJump};
    pub use crate::tm::{estimate_tm, TmEstimate};
    pub use crate::trim::{search_trim, TmWindow, TrimProposal};
}
