//! # Plate
//!
//! A [`Plate`] owns every loaded [`Sample`] together with the shared Tm cache and
//! orchestrates the correction workflow:
//!
//! - suspect scanning and batch correction
//! - single- and multi-jump correction of one sample
//! - manual analysis ranges and auto-trim proposals
//! - per-sample undo/redo
//! - logical deletion and recovery
//! - Tm summaries, outliers and display labels
//!
//! Every mutating call records a history snapshot first, increments the sample's
//! version counter and drops its cached Tm estimates. Configuration is always
//! passed in explicitly; the plate holds no analysis parameters of its own.
//!
//! ## Usage
//!
//! ```rust
//! use dsf_harmonizer::prelude::*;
//!
//! let curve = Curve::from_points((0..40).map(|i| {
//!     let t = 30.0 + i as f64;
//!     (t, 100.0 + 4900.0 / (1.0 + (-(t - 50.0) / 2.0).exp()))
//! }));
//! let mut plate = Plate::from_curves(vec![("A1".to_string(), curve)]);
//! let config = AnalysisConfig::default();
//!
//! plate.scan_suspects(&config.jump);
//! let tm = plate.tm("A1", &config.smoothing)?;
//! assert_eq!(tm, Some(50.0));
//! # Ok::<(), PlateError>(())
//! ```

mod error;
mod sample;
mod summary;
mod transition;

#[cfg(test)]
mod tests;

pub use error::PlateError;
pub use sample::Sample;
pub use summary::{
    BatchCorrection, ReferenceSource, TmEntry, TmOutlier, TmSummary, TmTableRow, TrimCandidate,
};
pub use transition::Transition;

use std::borrow::Cow;

use log::{debug, info, warn};

use crate::config::{AnalysisConfig, JumpConfig, SmoothingConfig};
use crate::correction::{correct_multi_jump, correct_single_jump, JumpDirection};
use crate::curve::{AnalysisRange, Curve, MIN_ANALYZABLE_POINTS};
use crate::history::Snapshot;
use crate::smoothing::smooth_signal;
use crate::steps::{scan_suspect, SuspectJump};
use crate::tm::{estimate_tm, TmCache, TmCacheKey, TmEstimate, DERIVATIVE_SMOOTHING_FLOOR};
use crate::trim::{search_trim, TmWindow};

/// Trim marker appended to labels of samples with an analysis range.
pub const TRIM_MARKER: &str = "✂";

/// Upper-case and trim a raw sample identifier.
pub fn normalize_sample_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Plate ordering key: row letter, then column number. Identifiers without a
/// column number sort last in their row; empty identifiers sort last overall.
pub fn well_sort_key(id: &str) -> (char, u32) {
    let id = normalize_sample_id(id);
    let mut chars = id.chars();
    let Some(row) = chars.next() else {
        return ('Z', 999);
    };
    let digits: String = chars.filter(|c| c.is_ascii_digit()).collect();
    (row, digits.parse().unwrap_or(999))
}

#[derive(Debug, Clone, Copy)]
enum HistoryStep {
    Undo,
    Redo,
}

/// Collection of samples in plate order, with a shared Tm cache.
#[derive(Debug, Default)]
pub struct Plate {
    samples: Vec<Sample>,
    cache: TmCache,
    cache_strength: Option<u8>,
}

impl Plate {
    /// Build a plate from `(id, curve)` pairs.
    ///
    /// Identifiers are normalized, samples whose fluorescence is zero (or empty)
    /// everywhere are skipped, and the rest are ordered by [`well_sort_key`]. A
    /// repeated identifier replaces the earlier curve.
    pub fn from_curves<I>(curves: I) -> Self
    where
        I: IntoIterator<Item = (String, Curve)>,
    {
        let mut samples: Vec<Sample> = Vec::new();
        let mut skipped = 0usize;
        for (raw_id, curve) in curves {
            let id = normalize_sample_id(&raw_id);
            if !curve.fluorescence().iter().any(|&f| f != 0.0) {
                skipped += 1;
                continue;
            }
            if let Some(existing) = samples.iter_mut().find(|s| s.id == id) {
                warn!("Duplicate sample {}; keeping the last curve", id);
                *existing = Sample::new(id, curve);
            } else {
                samples.push(Sample::new(id, curve));
            }
        }
        samples.sort_by(|a, b| {
            well_sort_key(&a.id)
                .cmp(&well_sort_key(&b.id))
                .then_with(|| a.id.cmp(&b.id))
        });

        info!(
            "Loaded {} sample(s) with data ({} without signal skipped)",
            samples.len(),
            skipped
        );
        Self {
            samples,
            cache: TmCache::new(),
            cache_strength: None,
        }
    }

    /// Number of samples, deleted ones included.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the plate has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in plate order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Non-deleted samples in plate order.
    pub fn active_samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| !s.deleted)
    }

    /// Look up a sample.
    pub fn sample(&self, id: &str) -> Option<&Sample> {
        let id = normalize_sample_id(id);
        self.samples.iter().find(|s| s.id == id)
    }

    /// Identifiers in the corrected set, in plate order.
    pub fn corrected_ids(&self) -> Vec<&str> {
        self.samples
            .iter()
            .filter(|s| s.corrected && !s.deleted)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Flagged suspects in plate order.
    pub fn suspects(&self) -> Vec<(&str, SuspectJump)> {
        self.samples
            .iter()
            .filter(|s| !s.deleted)
            .filter_map(|s| s.suspect.map(|jump| (s.id.as_str(), jump)))
            .collect()
    }

    /// Identifiers of deleted samples, in plate order.
    pub fn deleted_ids(&self) -> Vec<&str> {
        self.samples
            .iter()
            .filter(|s| s.deleted)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Visible curves of all non-deleted samples, for export.
    pub fn visible_curves(&self) -> impl Iterator<Item = (&str, Cow<'_, Curve>)> {
        self.active_samples().map(|s| (s.id.as_str(), s.visible_curve()))
    }

    fn active_indices(&self) -> Vec<usize> {
        (0..self.samples.len())
            .filter(|&i| !self.samples[i].deleted)
            .collect()
    }

    fn position(&self, id: &str) -> Result<usize, PlateError> {
        let id = normalize_sample_id(id);
        self.samples
            .iter()
            .position(|s| s.id == id)
            .ok_or(PlateError::UnknownSample(id))
    }

    fn editable(&self, id: &str) -> Result<usize, PlateError> {
        let idx = self.position(id)?;
        if self.samples[idx].deleted {
            return Err(PlateError::DeletedSample(self.samples[idx].id.clone()));
        }
        Ok(idx)
    }

    // ------------------------------------------------------------------
    // Tm
    // ------------------------------------------------------------------

    fn estimate_at(&mut self, idx: usize, strength: u8) -> TmEstimate {
        if self.cache_strength != Some(strength) {
            self.cache.retain_strength(strength);
            self.cache_strength = Some(strength);
        }
        let sample = &self.samples[idx];
        if sample.deleted {
            return TmEstimate::default();
        }
        let key = TmCacheKey {
            sample_id: sample.id.clone(),
            version: sample.version,
            strength,
        };
        self.cache
            .get_or_insert_with(key, || {
                let visible = sample.visible_curve();
                estimate_tm(visible.temperatures(), visible.fluorescence(), strength)
            })
            .clone()
    }

    /// Full Tm estimate (with derivative) of a sample's visible curve. Deleted
    /// samples yield an undefined estimate.
    pub fn tm_estimate(
        &mut self,
        id: &str,
        smoothing: &SmoothingConfig,
    ) -> Result<TmEstimate, PlateError> {
        let idx = self.position(id)?;
        Ok(self.estimate_at(idx, smoothing.derivative_strength()))
    }

    /// Tm of a sample's visible curve.
    pub fn tm(&mut self, id: &str, smoothing: &SmoothingConfig) -> Result<Option<f64>, PlateError> {
        Ok(self.tm_estimate(id, smoothing)?.tm)
    }

    /// Tm of every non-deleted sample, with mean, reference and outliers.
    pub fn tm_summary(&mut self, config: &AnalysisConfig) -> TmSummary {
        let strength = config.smoothing.derivative_strength();
        let active = self.active_indices();
        let entries: Vec<TmEntry> = active
            .into_iter()
            .map(|i| TmEntry {
                sample_id: self.samples[i].id.clone(),
                tm: self.estimate_at(i, strength).tm.filter(|t| t.is_finite()),
            })
            .collect();

        let valid: Vec<f64> = entries.iter().filter_map(|e| e.tm).collect();
        let mean = (!valid.is_empty()).then(|| valid.iter().sum::<f64>() / valid.len() as f64);
        let (reference, reference_source) = match config.tm.reference {
            Some(r) => (r, ReferenceSource::Fixed),
            None => (mean.unwrap_or(0.0), ReferenceSource::Mean),
        };
        let threshold = config.tm.outlier_threshold;

        let outliers = entries
            .iter()
            .filter_map(|e| {
                let tm = e.tm?;
                let deviation = (tm - reference).abs();
                (deviation >= threshold).then(|| TmOutlier {
                    sample_id: e.sample_id.clone(),
                    tm,
                    deviation,
                })
            })
            .collect();

        TmSummary {
            valid_count: valid.len(),
            entries,
            mean,
            reference,
            reference_source,
            threshold,
            outliers,
        }
    }

    /// Rows of the Tm table export: Tm of the visible curve, and Tm after
    /// pre-smoothing with `max(25, strength)`.
    pub fn tm_table(&mut self, smoothing: &SmoothingConfig) -> Vec<TmTableRow> {
        let derivative = smoothing.derivative_strength();
        let pre_smoothing = DERIVATIVE_SMOOTHING_FLOOR.max(smoothing.strength);
        self.active_indices()
            .into_iter()
            .map(|i| {
                let tm_corrected = self.estimate_at(i, derivative).tm;
                let visible = self.samples[i].visible_curve();
                let smoothed = smooth_signal(visible.fluorescence(), pre_smoothing);
                let tm_smoothed = estimate_tm(visible.temperatures(), &smoothed, derivative).tm;
                TmTableRow {
                    sample_id: self.samples[i].id.clone(),
                    tm_corrected,
                    tm_smoothed,
                    smooth_strength: pre_smoothing,
                }
            })
            .collect()
    }

    /// Display label: id, Tm when defined, deletion and trim markers.
    pub fn label(&mut self, id: &str, smoothing: &SmoothingConfig) -> Result<String, PlateError> {
        let idx = self.position(id)?;
        let tm = self.estimate_at(idx, smoothing.derivative_strength()).tm;
        let sample = &self.samples[idx];
        if sample.deleted {
            return Ok(format!("{} [DELETED]", sample.id));
        }
        let mut label = match tm.filter(|t| t.is_finite()) {
            Some(tm) => format!("{} — Tm={:.2} °C", sample.id, tm),
            None => sample.id.clone(),
        };
        if sample.is_trimmed() {
            label.push(' ');
            label.push_str(TRIM_MARKER);
        }
        Ok(label)
    }

    // ------------------------------------------------------------------
    // Detection and correction
    // ------------------------------------------------------------------

    /// Flag every non-deleted, not yet corrected sample whose largest visible
    /// jump exceeds the thresholds. Returns the number of suspects.
    pub fn scan_suspects(&mut self, jump: &JumpConfig) -> usize {
        let thresholds = jump.thresholds();
        let mut count = 0;
        for sample in &mut self.samples {
            sample.suspect = if sample.deleted || sample.corrected {
                None
            } else {
                scan_suspect(sample.visible_curve().fluorescence(), &thresholds)
            };
            if let Some(suspect) = sample.suspect {
                debug!(
                    "Suspect {}: jump {:.3} at index {}",
                    sample.id, suspect.delta, suspect.index
                );
                count += 1;
            }
        }
        info!(
            "Suspect scan (method={}, abs>{}, k={}): {} sample(s)",
            thresholds.method, thresholds.abs_threshold, thresholds.k, count
        );
        count
    }

    /// Replace the working fluorescence of sample `idx`, recording history and
    /// updating flags. Returns the transition, or `None` if nothing changed.
    fn replace_working(
        &mut self,
        idx: usize,
        fluorescence: Vec<f64>,
    ) -> Result<Option<Transition>, PlateError> {
        let sample = &mut self.samples[idx];
        let updated = sample.working.with_fluorescence(fluorescence)?;
        if updated.bit_identical(&sample.working) {
            return Ok(None);
        }

        sample.record();
        let transition = Transition::new(
            sample.working.temperatures().to_vec(),
            sample.working.fluorescence().to_vec(),
            updated.fluorescence().to_vec(),
        );
        sample.working = updated;
        sample.corrected = true;
        sample.suspect = None;
        sample.touch();
        let id = sample.id.clone();
        self.cache.invalidate_sample(&id);
        Ok(transition)
    }

    /// Remove every detected jump of one sample's working curve.
    ///
    /// Returns `None` when no jump qualified.
    pub fn correct_multi_jump(
        &mut self,
        id: &str,
        jump: &JumpConfig,
    ) -> Result<Option<Transition>, PlateError> {
        let idx = self.editable(id)?;
        let outcome = correct_multi_jump(
            self.samples[idx].working.fluorescence(),
            &jump.thresholds(),
            jump.iterative,
            jump.max_iterations,
        );
        if !outcome.changed() {
            debug!("{}: no jumps above threshold", self.samples[idx].id);
            return Ok(None);
        }
        info!(
            "{}: multi-jump correction in {} pass(es)",
            self.samples[idx].id, outcome.passes
        );
        self.replace_working(idx, outcome.values)
    }

    /// Shift the working curve after breakpoint `index` (between `index` and
    /// `index + 1` of the full working curve).
    pub fn correct_single_jump(
        &mut self,
        id: &str,
        index: usize,
        direction: JumpDirection,
    ) -> Result<Option<Transition>, PlateError> {
        let idx = self.editable(id)?;
        let working = &self.samples[idx].working;
        let Some(values) = correct_single_jump(working.fluorescence(), index, direction) else {
            return Err(PlateError::IndexOutOfRange {
                sample: self.samples[idx].id.clone(),
                index,
                len: working.len(),
            });
        };
        info!("{}: single-jump correction at index {} ({})", self.samples[idx].id, index, direction);
        self.replace_working(idx, values)
    }

    /// Correct one sample with the configured strategy: multi-jump when enabled,
    /// otherwise a single jump at `index`.
    pub fn correct_sample(
        &mut self,
        id: &str,
        index: usize,
        jump: &JumpConfig,
    ) -> Result<Option<Transition>, PlateError> {
        if jump.multi_jump {
            self.correct_multi_jump(id, jump)
        } else {
            self.correct_single_jump(id, index, jump.direction)
        }
    }

    /// Correct every suspect, scanning first when the suspect list is empty, and
    /// rescan afterwards.
    ///
    /// Without multi-jump, the largest visible jump is corrected repeatedly while
    /// the sample is still suspect, up to the pass limit.
    pub fn correct_all_suspects(&mut self, jump: &JumpConfig) -> BatchCorrection {
        let has_suspects = self.samples.iter().any(|s| s.suspect.is_some() && !s.deleted);
        if !has_suspects && self.scan_suspects(jump) == 0 {
            return BatchCorrection::default();
        }

        let targets: Vec<usize> = self
            .active_indices()
            .into_iter()
            .filter(|&i| self.samples[i].suspect.is_some())
            .collect();

        let mut corrected = Vec::new();
        for idx in targets {
            let changed = if jump.multi_jump {
                let id = self.samples[idx].id.clone();
                matches!(self.correct_multi_jump(&id, jump), Ok(Some(_)))
            } else {
                self.correct_largest_jumps(idx, jump)
            };
            if changed {
                corrected.push(self.samples[idx].id.clone());
            }
        }

        let remaining_suspects = self.scan_suspects(jump);
        info!(
            "Corrected {} sample(s); remaining suspects: {}",
            corrected.len(),
            remaining_suspects
        );
        BatchCorrection {
            corrected,
            remaining_suspects,
        }
    }

    fn correct_largest_jumps(&mut self, idx: usize, jump: &JumpConfig) -> bool {
        let thresholds = jump.thresholds();
        let mut changed = false;
        for _ in 0..jump.pass_limit() {
            let values = {
                let sample = &self.samples[idx];
                let visible = sample.visible_curve();
                let Some(suspect) = scan_suspect(visible.fluorescence(), &thresholds) else {
                    break;
                };
                let full_index = match sample.visible_indices() {
                    Some(indices) => match indices.get(suspect.index) {
                        Some(&i) => i,
                        None => break,
                    },
                    None => suspect.index,
                };
                match correct_single_jump(sample.working.fluorescence(), full_index, jump.direction) {
                    Some(values) => values,
                    None => break,
                }
            };
            match self.replace_working(idx, values) {
                Ok(Some(_)) => changed = true,
                _ => break,
            }
        }
        changed
    }

    // ------------------------------------------------------------------
    // Analysis ranges and auto-trim
    // ------------------------------------------------------------------

    /// Restrict a sample to `range`, clamped to its data. Rejected when fewer
    /// than three points would remain; the sample is then left unchanged.
    pub fn set_analysis_range(&mut self, id: &str, range: AnalysisRange) -> Result<(), PlateError> {
        let idx = self.editable(id)?;
        let sample = &mut self.samples[idx];
        let Some((lo, hi)) = sample.working.temperature_bounds() else {
            return Err(PlateError::TooFewPoints {
                sample: sample.id.clone(),
                count: 0,
            });
        };
        let clamped = range.clamped_to(lo, hi);
        if clamped.min >= clamped.max {
            warn!("{}: rejected empty range [{}, {}]", sample.id, clamped.min, clamped.max);
            return Err(PlateError::InvalidRange {
                sample: sample.id.clone(),
                min: clamped.min,
                max: clamped.max,
            });
        }
        let count = sample.working.count_in(&clamped);
        if count < MIN_ANALYZABLE_POINTS {
            warn!("{}: range would leave {} point(s)", sample.id, count);
            return Err(PlateError::TooFewPoints {
                sample: sample.id.clone(),
                count,
            });
        }

        sample.record();
        sample.range = Some(clamped);
        sample.auto_trimmed = false;
        sample.touch();
        info!(
            "{}: analysis restricted to [{:.2}, {:.2}] °C",
            sample.id, clamped.min, clamped.max
        );
        let id = sample.id.clone();
        self.cache.invalidate_sample(&id);
        Ok(())
    }

    /// Remove a sample's analysis range. Returns `false` if it had none.
    pub fn clear_analysis_range(&mut self, id: &str) -> Result<bool, PlateError> {
        let idx = self.editable(id)?;
        let sample = &mut self.samples[idx];
        if !sample.is_trimmed() {
            return Ok(false);
        }
        sample.record();
        sample.range = None;
        sample.auto_trimmed = false;
        sample.touch();
        let id = sample.id.clone();
        self.cache.invalidate_sample(&id);
        Ok(true)
    }

    /// Auto-trim proposals for every non-deleted sample whose Tm lies outside
    /// `window`. Nothing is modified.
    pub fn propose_auto_trims(
        &self,
        window: &TmWindow,
        smoothing: &SmoothingConfig,
    ) -> Vec<TrimCandidate> {
        let strength = smoothing.derivative_strength();
        let candidates: Vec<TrimCandidate> = self
            .active_samples()
            .filter_map(|s| {
                let proposal = search_trim(&s.visible_curve(), window, strength)?;
                Some(TrimCandidate {
                    sample_id: s.id.clone(),
                    proposal,
                })
            })
            .collect();
        info!(
            "Auto-trim to [{:.2}, {:.2}] °C: {} proposal(s)",
            window.lo,
            window.hi,
            candidates.len()
        );
        candidates
    }

    /// Apply selected proposals. Each is re-checked against the current working
    /// curve; proposals for unknown or deleted samples, or that would keep fewer
    /// than three points, are skipped. Returns the number applied.
    pub fn apply_trim_proposals(&mut self, candidates: &[TrimCandidate]) -> usize {
        let mut applied = 0;
        for candidate in candidates {
            let Ok(idx) = self.editable(&candidate.sample_id) else {
                warn!("Skipping trim for unavailable sample {}", candidate.sample_id);
                continue;
            };
            let range = candidate.proposal.range();
            let sample = &mut self.samples[idx];
            let count = sample.working.count_in(&range);
            if count < MIN_ANALYZABLE_POINTS {
                warn!("{}: trim would leave {} point(s); skipped", sample.id, count);
                continue;
            }

            sample.record();
            sample.range = Some(range);
            sample.auto_trimmed = true;
            sample.corrected = true;
            sample.touch();
            debug!(
                "{}: auto-trim to [{:.2}, {:.2}] °C",
                sample.id, range.min, range.max
            );
            let id = sample.id.clone();
            self.cache.invalidate_sample(&id);
            applied += 1;
        }
        info!("Auto-trim applied to {} sample(s)", applied);
        applied
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Whether a sample has an undo step.
    pub fn can_undo(&self, id: &str) -> bool {
        self.sample(id).is_some_and(|s| s.history.can_undo())
    }

    /// Whether a sample has a redo step.
    pub fn can_redo(&self, id: &str) -> bool {
        self.sample(id).is_some_and(|s| s.history.can_redo())
    }

    /// Undo the last change of a sample. A no-op when there is nothing to undo.
    ///
    /// Returns the transition between the two working curves when a step was
    /// undone and both curves have the same length.
    pub fn undo(&mut self, id: &str) -> Result<Option<Transition>, PlateError> {
        let idx = self.position(id)?;
        let sample = &mut self.samples[idx];
        let current = sample.snapshot();
        let Some(previous) = sample.history.undo(current) else {
            return Ok(None);
        };
        Ok(self.restore(idx, previous, HistoryStep::Undo))
    }

    /// Redo the last undone change of a sample. A no-op when there is nothing
    /// to redo.
    pub fn redo(&mut self, id: &str) -> Result<Option<Transition>, PlateError> {
        let idx = self.position(id)?;
        let sample = &mut self.samples[idx];
        let current = sample.snapshot();
        let Some(next) = sample.history.redo(current) else {
            return Ok(None);
        };
        Ok(self.restore(idx, next, HistoryStep::Redo))
    }

    fn restore(&mut self, idx: usize, snapshot: Snapshot, step: HistoryStep) -> Option<Transition> {
        let sample = &mut self.samples[idx];
        let transition = Transition::new(
            sample.working.temperatures().to_vec(),
            sample.working.fluorescence().to_vec(),
            snapshot.curve.fluorescence().to_vec(),
        );
        sample.restore(snapshot);
        // Undo only ever leaves the corrected set; redo re-enters it.
        match step {
            HistoryStep::Undo => sample.corrected &= sample.is_modified(),
            HistoryStep::Redo => sample.corrected = sample.is_modified(),
        }
        let id = sample.id.clone();
        self.cache.invalidate_sample(&id);
        debug!("{}: history step restored (version {})", id, self.samples[idx].version);
        transition
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Mark a sample as deleted. Returns `false` if it already was.
    pub fn delete_sample(&mut self, id: &str) -> Result<bool, PlateError> {
        let idx = self.position(id)?;
        let sample = &mut self.samples[idx];
        if sample.deleted {
            return Ok(false);
        }
        sample.deleted = true;
        sample.suspect = None;
        info!("{}: deleted (excluded from Tm and export)", sample.id);
        Ok(true)
    }

    /// Recover a deleted sample. Returns `false` if it was not deleted.
    pub fn recover_sample(&mut self, id: &str) -> Result<bool, PlateError> {
        let idx = self.position(id)?;
        let sample = &mut self.samples[idx];
        if !sample.deleted {
            return Ok(false);
        }
        sample.deleted = false;
        info!("{}: recovered", sample.id);
        Ok(true)
    }
}
