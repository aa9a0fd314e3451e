use std::borrow::Cow;

use crate::curve::{AnalysisRange, Curve, MIN_ANALYZABLE_POINTS};
use crate::history::{CurveHistory, Snapshot};
use crate::steps::SuspectJump;

/// Per-sample state: immutable original curve, working curve, analysis range,
/// flags and undo/redo history.
#[derive(Debug, Clone)]
pub struct Sample {
    pub(super) id: String,
    pub(super) original: Curve,
    pub(super) working: Curve,
    pub(super) range: Option<AnalysisRange>,
    pub(super) auto_trimmed: bool,
    pub(super) deleted: bool,
    pub(super) corrected: bool,
    pub(super) suspect: Option<SuspectJump>,
    pub(super) version: u64,
    pub(super) history: CurveHistory,
}

impl Sample {
    /// Create a sample whose working curve starts as a copy of `curve`.
    pub fn new(id: impl Into<String>, curve: Curve) -> Self {
        Self {
            id: id.into(),
            working: curve.clone(),
            original: curve,
            range: None,
            auto_trimmed: false,
            deleted: false,
            corrected: false,
            suspect: None,
            version: 0,
            history: CurveHistory::new(),
        }
    }

    /// Sample identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Curve as loaded
    pub fn original(&self) -> &Curve {
        &self.original
    }

    /// Current, possibly corrected, curve
    pub fn working(&self) -> &Curve {
        &self.working
    }

    /// Active analysis range
    pub fn range(&self) -> Option<AnalysisRange> {
        self.range
    }

    /// Whether the range came from the automatic trim search
    pub fn is_auto_trimmed(&self) -> bool {
        self.auto_trimmed
    }

    /// Whether any range restricts the sample
    pub fn is_trimmed(&self) -> bool {
        self.range.is_some() || self.auto_trimmed
    }

    /// Whether the sample is logically deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether the sample is in the corrected set
    pub fn is_corrected(&self) -> bool {
        self.corrected
    }

    /// Largest jump found by the last suspect scan, if flagged
    pub fn suspect(&self) -> Option<SuspectJump> {
        self.suspect
    }

    /// Mutation counter, incremented on every change of curve or range
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Undo/redo stacks
    pub fn history(&self) -> &CurveHistory {
        &self.history
    }

    /// Whether the working curve differs from the original bit for bit.
    pub fn is_modified(&self) -> bool {
        !self.working.bit_identical(&self.original)
    }

    /// The working curve restricted to the analysis range. Falls back to the
    /// full working curve when no range is set or fewer than three points would
    /// remain.
    pub fn visible_curve(&self) -> Cow<'_, Curve> {
        match self.range.and_then(|range| self.working.restrict(&range)) {
            Some(restricted) => Cow::Owned(restricted),
            None => Cow::Borrowed(&self.working),
        }
    }

    /// Working-curve indices of the visible samples, or `None` when the full
    /// curve is visible.
    pub fn visible_indices(&self) -> Option<Vec<usize>> {
        let indices = self.working.indices_in(&self.range?);
        (indices.len() >= MIN_ANALYZABLE_POINTS).then_some(indices)
    }

    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot {
            curve: self.working.clone(),
            range: self.range,
            auto_trimmed: self.auto_trimmed,
        }
    }

    pub(super) fn record(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    pub(super) fn restore(&mut self, snapshot: Snapshot) {
        self.working = snapshot.curve;
        self.range = snapshot.range;
        self.auto_trimmed = snapshot.auto_trimmed;
        self.version += 1;
    }

    pub(super) fn touch(&mut self) {
        self.version += 1;
    }
}
