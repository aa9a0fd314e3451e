//! # Undo/Redo History
//!
//! Linear per-sample history over [`Snapshot`]s of the mutable sample state.
//! Pushing a new snapshot discards the redo stack.

use crate::curve::{AnalysisRange, Curve};

/// Mutable state of one sample at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Working curve
    pub curve: Curve,
    /// Analysis range, if any
    pub range: Option<AnalysisRange>,
    /// Whether the range came from the automatic trim search
    pub auto_trimmed: bool,
}

/// Undo and redo stacks for one sample.
#[derive(Debug, Clone, Default)]
pub struct CurveHistory {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl CurveHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state before a mutation and clear the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo.push(snapshot);
        self.redo.clear();
    }

    /// Step back: `current` moves to the redo stack and the previous snapshot is
    /// returned. `None` (and no change) when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: inverse of [`CurveHistory::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Depth of the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Depth of the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
