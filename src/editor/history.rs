//! Bounded undo/redo snapshots of the chart.
//!
//! Three stacks: `past` (older snapshots), `present` (the live chart) and
//! `future` (snapshots undone away). Only structural action kinds ever push
//! onto `past`; cosmetic kinds (selection flips, resize observations) still
//! update `present` so the stacks never drift from the live state.
//! Because the reducer allocates a fresh chart on every call, snapshot
//! worthiness is gated by a structural equality check, never by identity.

use std::collections::VecDeque;

use crate::model::Chart;

/// Action kinds whose resulting chart is eligible for the undo stack.
pub const HISTORY_ACTIONS: [&str; 6] = [
    "onNodeAdded",
    "onUpdateNode",
    "onDeleteNodes",
    "onEndConnection",
    "onDeleteLink",
    "onDragNodeStop",
];

/// Default bound on retained snapshots.
pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone)]
pub struct UndoRedoManager {
    past: VecDeque<Chart>,
    present: Chart,
    future: Vec<Chart>,
    max_len: usize,
}

impl UndoRedoManager {
    /// Create a manager seeded with the initial chart. `max_len` bounds the
    /// `past` stack; the oldest snapshot is evicted once it is exceeded.
    pub fn new(initial: Chart, max_len: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: Vec::new(),
            max_len,
        }
    }

    pub fn present(&self) -> &Chart {
        &self.present
    }

    /// Record the chart produced by one reducer step.
    ///
    /// A history-worthy `action_kind` together with an actual structural
    /// change pushes the old present onto `past` and clears `future`.
    /// Anything else just replaces `present`.
    pub fn save(&mut self, chart: Chart, action_kind: &str) {
        let worthy = HISTORY_ACTIONS.contains(&action_kind) && chart != self.present;
        if worthy {
            self.past.push_back(std::mem::replace(&mut self.present, chart));
            if self.past.len() > self.max_len {
                self.past.pop_front();
            }
            self.future.clear();
        } else {
            self.present = chart;
        }
    }

    /// Step back one snapshot and return the new present. With an empty
    /// `past` this is a no-op returning the current present.
    pub fn undo(&mut self) -> &Chart {
        if let Some(previous) = self.past.pop_back() {
            let current = std::mem::replace(&mut self.present, previous);
            self.future.push(current);
        }
        &self.present
    }

    /// Step forward one snapshot; symmetric to [`Self::undo`].
    pub fn redo(&mut self) -> &Chart {
        if let Some(next) = self.future.pop() {
            let current = std::mem::replace(&mut self.present, next);
            self.past.push_back(current);
        }
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drop all snapshots and adopt a new present, e.g. after loading a
    /// different chart.
    pub fn reset(&mut self, chart: Chart) {
        self.past.clear();
        self.future.clear();
        self.present = chart;
    }
}
