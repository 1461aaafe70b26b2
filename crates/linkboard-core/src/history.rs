//! Undo/redo transaction log.
//!
//! Entries are whole-graph before-snapshots. Repeated mutations with the
//! same label inside the coalescing window (e.g. per-event drags of one
//! object) merge into a single entry, so the undo grain matches discrete
//! user intents. The stack is bounded: the oldest entry is evicted first.
//!
//! All time-dependent calls take an explicit `Instant` so the session drives
//! the clock and tests stay deterministic.

use crate::graph::GraphSnapshot;
use log::debug;
use std::time::{Duration, Instant};

/// Maximum number of undo entries kept by default.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Default inactivity window for coalescing repeated mutations.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(300);

/// One coalesced reversible user action.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Logical mutation label, e.g. `move:<id>`. Entries coalesce only while
    /// the label repeats.
    pub label: String,
    snapshot: GraphSnapshot,
}

#[derive(Debug)]
struct Pending {
    label: String,
    before: GraphSnapshot,
    last_touch: Instant,
}

/// Undo/redo stacks plus the in-flight coalescing slot.
#[derive(Debug)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    pending: Option<Pending>,
    limit: usize,
    window: Duration,
    replaying: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            pending: None,
            limit: MAX_UNDO_HISTORY,
            window: COALESCE_WINDOW,
            replaying: false,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::new()
        }
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Re-entrancy guard: while a replay is in progress, mutations triggered
    /// by applying a snapshot must not record new entries.
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Record a qualifying mutation. `before` is the graph state captured
    /// immediately before the mutation ran; it is kept only if this record
    /// opens a new entry. A record with the same label inside the window
    /// extends the pending entry instead.
    pub fn record(&mut self, label: &str, before: GraphSnapshot, now: Instant) {
        if self.replaying {
            return;
        }
        match &mut self.pending {
            Some(pending)
                if pending.label == label
                    && now.duration_since(pending.last_touch) <= self.window =>
            {
                pending.last_touch = now;
            }
            _ => {
                self.flush();
                self.pending = Some(Pending {
                    label: label.to_string(),
                    before,
                    last_touch: now,
                });
            }
        }
    }

    /// Close the pending entry if its inactivity window has elapsed.
    pub fn tick(&mut self, now: Instant) {
        let elapsed = self
            .pending
            .as_ref()
            .is_some_and(|p| now.duration_since(p.last_touch) > self.window);
        if elapsed {
            self.flush();
        }
    }

    /// Close the pending entry unconditionally.
    pub fn commit(&mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("history commit '{}'", pending.label);
            self.undo.push(HistoryEntry {
                label: pending.label,
                snapshot: pending.before,
            });
            self.redo.clear();
            if self.undo.len() > self.limit {
                self.undo.remove(0);
            }
        }
    }

    /// Pop the last action. `current` is the live graph state; it becomes
    /// the redo target. Returns the snapshot to restore, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self, current: GraphSnapshot) -> Option<GraphSnapshot> {
        self.flush();
        let entry = self.undo.pop()?;
        self.redo.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Symmetric to [`History::undo`].
    pub fn redo(&mut self, current: GraphSnapshot) -> Option<GraphSnapshot> {
        self.flush();
        let entry = self.redo.pop()?;
        self.undo.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Run `apply` with the re-entrancy guard held.
    pub fn replay<R>(&mut self, apply: impl FnOnce() -> R) -> R {
        self.replaying = true;
        let result = apply();
        self.replaying = false;
        result
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() || self.pending.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SceneGraph;
    use std::time::Duration;

    fn snap(graph: &SceneGraph) -> GraphSnapshot {
        graph.snapshot()
    }

    #[test]
    fn rapid_moves_coalesce_into_one_entry() {
        let mut history = History::new();
        let graph = SceneGraph::new();
        let t0 = Instant::now();

        for i in 0..20 {
            history.record("move:a", snap(&graph), t0 + Duration::from_millis(i * 10));
        }
        history.commit();

        assert_eq!(history.len(), 1);
    }

    #[test]
    fn window_expiry_splits_entries() {
        let mut history = History::new();
        let graph = SceneGraph::new();
        let t0 = Instant::now();

        history.record("move:a", snap(&graph), t0);
        history.record("move:a", snap(&graph), t0 + Duration::from_millis(500));
        history.commit();

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn different_labels_never_coalesce() {
        let mut history = History::new();
        let graph = SceneGraph::new();
        let t0 = Instant::now();

        history.record("move:a", snap(&graph), t0);
        history.record("move:b", snap(&graph), t0 + Duration::from_millis(10));
        history.commit();

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn commit_clears_redo() {
        let mut history = History::new();
        let graph = SceneGraph::new();
        let t0 = Instant::now();

        history.record("a", snap(&graph), t0);
        history.commit();
        assert!(history.undo(snap(&graph)).is_some());
        assert!(history.can_redo());

        history.record("b", snap(&graph), t0 + Duration::from_secs(1));
        history.commit();
        assert!(!history.can_redo());
    }

    #[test]
    fn stack_is_capped_fifo() {
        let mut history = History::with_limit(3);
        let graph = SceneGraph::new();
        let t0 = Instant::now();

        for i in 0..5 {
            history.record(&format!("op{i}"), snap(&graph), t0 + Duration::from_secs(i));
        }
        history.commit();

        assert_eq!(history.len(), 3);
        // Oldest entries were evicted.
        assert!(history.undo.iter().all(|e| e.label != "op0" && e.label != "op1"));
    }

    #[test]
    fn record_is_ignored_during_replay() {
        let mut history = History::new();
        let graph = SceneGraph::new();

        history.replay(|| {});
        history.replaying = true;
        history.record("a", snap(&graph), Instant::now());
        history.replaying = false;
        history.commit();

        assert!(history.is_empty());
    }

    #[test]
    fn empty_stacks_return_none() {
        let mut history = History::new();
        let graph = SceneGraph::new();
        assert!(history.undo(snap(&graph)).is_none());
        assert!(history.redo(snap(&graph)).is_none());
    }
}
