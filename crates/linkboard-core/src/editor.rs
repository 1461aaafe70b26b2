//! Editor session: the single mutation path over one scene graph.
//!
//! Every structural change flows through here so the transaction log sees a
//! before-snapshot for each one, observers get a drained event queue instead
//! of callbacks, and replaying a snapshot can never record itself. Time is
//! passed in explicitly; the embedding loop drives [`Editor::tick`].

use crate::descriptor::Descriptor;
use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::history::History;
use crate::objects::{ObjectId, RoutingKind};
use crate::serialize::{self, ImportReport, ObjectRecord};
use kurbo::Point;
use log::debug;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Inactivity window before dirty objects are announced as modified.
pub const MODIFIED_DEBOUNCE: Duration = Duration::from_millis(100);

pub const MIN_ZOOM: f64 = 0.3;
pub const MAX_ZOOM: f64 = 5.0;

/// Session notifications, drained by the embedder via [`Editor::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Added(ObjectId),
    /// Ids removed by one operation, cascades included.
    Removed(Vec<ObjectId>),
    Selected(Vec<ObjectId>),
    /// Debounced batch of objects whose geometry or properties changed.
    Modified(Vec<ObjectId>),
    Zoomed(f64),
    /// Undo/redo availability changed.
    Transaction { can_undo: bool, can_redo: bool },
}

/// Work postponed until the next tick. At most one effect per kind is held;
/// a newer effect of the same kind supersedes the pending one.
#[derive(Debug, Clone)]
pub enum DeferredEffect {
    /// Replace the graph contents with these records.
    Import(Vec<ObjectRecord>),
    /// Re-derive all port positions and reroute all links.
    SyncAll,
}

impl DeferredEffect {
    fn kind(&self) -> u8 {
        match self {
            Self::Import(_) => 0,
            Self::SyncAll => 1,
        }
    }
}

pub struct Editor {
    pub graph: SceneGraph,
    history: History,
    events: VecDeque<SceneEvent>,
    deferred: Vec<DeferredEffect>,
    dirty: Vec<ObjectId>,
    dirty_since: Option<Instant>,
    zoom: f64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            history: History::new(),
            events: VecDeque::new(),
            deferred: Vec::new(),
            dirty: Vec::new(),
            dirty_since: None,
            zoom: 1.0,
        }
    }

    pub fn with_graph(graph: SceneGraph) -> Self {
        Self {
            graph,
            ..Self::new()
        }
    }

    // ---- mutation path -------------------------------------------------

    /// Snapshot the graph before a mutation. Rejected while a snapshot is
    /// being applied, so replay effects cannot mutate the live session.
    fn begin(&self) -> SceneResult<crate::graph::GraphSnapshot> {
        if self.history.is_replaying() {
            return Err(SceneError::ConcurrencyGuard);
        }
        Ok(self.graph.snapshot())
    }

    fn finish(&mut self, label: &str, before: crate::graph::GraphSnapshot, now: Instant) {
        self.history.record(label, before, now);
        self.push_transaction();
    }

    pub fn add(
        &mut self,
        descriptor: &Descriptor,
        position: Point,
        centered: bool,
        now: Instant,
    ) -> SceneResult<ObjectId> {
        let before = self.begin()?;
        let id = self.graph.add(descriptor, position, centered)?;
        self.finish(&format!("add:{}", descriptor.name), before, now);
        self.events.push_back(SceneEvent::Added(id));
        Ok(id)
    }

    pub fn connect(
        &mut self,
        from_port: ObjectId,
        to_port: ObjectId,
        routing: RoutingKind,
        now: Instant,
    ) -> SceneResult<ObjectId> {
        let before = self.begin()?;
        let id = self.graph.connect(from_port, to_port, routing)?;
        self.finish("connect", before, now);
        self.events.push_back(SceneEvent::Added(id));
        Ok(id)
    }

    pub fn remove(&mut self, id: ObjectId, now: Instant) -> SceneResult<Vec<ObjectId>> {
        let before = self.begin()?;
        let removed = self.graph.remove(id)?;
        self.finish(&format!("remove:{id}"), before, now);
        self.events.push_back(SceneEvent::Removed(removed.clone()));
        Ok(removed)
    }

    pub fn duplicate(&mut self, id: ObjectId, now: Instant) -> SceneResult<ObjectId> {
        let before = self.begin()?;
        let copy = self.graph.duplicate(id)?;
        self.finish(&format!("duplicate:{id}"), before, now);
        self.events.push_back(SceneEvent::Added(copy));
        Ok(copy)
    }

    pub fn set(&mut self, id: ObjectId, key: &str, value: &Value, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        self.graph.set(id, key, value)?;
        self.finish(&format!("set:{key}:{id}"), before, now);
        self.mark_dirty(id, now);
        Ok(())
    }

    pub fn move_by(&mut self, id: ObjectId, dx: f64, dy: f64, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        self.graph.move_by(id, dx, dy)?;
        self.finish(&format!("move:{id}"), before, now);
        self.mark_dirty(id, now);
        Ok(())
    }

    pub fn move_selection(&mut self, dx: f64, dy: f64, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        let moved: Vec<ObjectId> = self.graph.selection().to_vec();
        self.graph.move_selection(dx, dy)?;
        self.finish("move:selection", before, now);
        for id in moved {
            self.mark_dirty(id, now);
        }
        Ok(())
    }

    pub fn set_on_selection(&mut self, key: &str, value: &Value, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        let touched: Vec<ObjectId> = self.graph.selection().to_vec();
        self.graph.set_on_selection(key, value)?;
        self.finish(&format!("set:{key}:selection"), before, now);
        for id in touched {
            self.mark_dirty(id, now);
        }
        Ok(())
    }

    pub fn bring_to_front(&mut self, id: ObjectId, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        self.graph.bring_to_front(id);
        self.finish(&format!("order:{id}"), before, now);
        self.mark_dirty(id, now);
        Ok(())
    }

    pub fn send_to_back(&mut self, id: ObjectId, now: Instant) -> SceneResult<()> {
        let before = self.begin()?;
        self.graph.send_to_back(id);
        self.finish(&format!("order:{id}"), before, now);
        self.mark_dirty(id, now);
        Ok(())
    }

    // ---- selection (not part of the transaction log) -------------------

    pub fn select(&mut self, id: ObjectId) {
        self.graph.select(id);
        self.events
            .push_back(SceneEvent::Selected(self.graph.selection().to_vec()));
    }

    pub fn add_to_selection(&mut self, id: ObjectId) {
        self.graph.add_to_selection(id);
        self.events
            .push_back(SceneEvent::Selected(self.graph.selection().to_vec()));
    }

    pub fn clear_selection(&mut self) {
        self.graph.clear_selection();
        self.events.push_back(SceneEvent::Selected(Vec::new()));
    }

    pub fn select_all(&mut self) {
        self.graph.select_all();
        self.events
            .push_back(SceneEvent::Selected(self.graph.selection().to_vec()));
    }

    // ---- transactions --------------------------------------------------

    /// Close the in-flight coalescing slot. Call at gesture end, e.g. on
    /// pointer release after a drag.
    pub fn commit(&mut self) {
        self.history.commit();
        self.push_transaction();
    }

    pub fn undo(&mut self) -> bool {
        let current = self.graph.snapshot();
        match self.history.undo(current) {
            Some(snapshot) => {
                let graph = &mut self.graph;
                self.history.replay(|| graph.restore(snapshot));
                self.push_transaction();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.graph.snapshot();
        match self.history.redo(current) {
            Some(snapshot) => {
                let graph = &mut self.graph;
                self.history.replay(|| graph.restore(snapshot));
                self.push_transaction();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn push_transaction(&mut self) {
        self.events.push_back(SceneEvent::Transaction {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // ---- deferred effects ----------------------------------------------

    /// Queue an effect for the next tick. A pending effect of the same
    /// kind is superseded, so e.g. only the latest import ever runs.
    pub fn defer(&mut self, effect: DeferredEffect) {
        self.deferred.retain(|e| e.kind() != effect.kind());
        self.deferred.push(effect);
    }

    fn run_deferred(&mut self, now: Instant) -> SceneResult<ImportReport> {
        let mut report = ImportReport::default();
        for effect in std::mem::take(&mut self.deferred) {
            match effect {
                DeferredEffect::Import(records) => {
                    debug!("applying deferred import of {} records", records.len());
                    let before = self.begin()?;
                    let mut graph = SceneGraph::new();
                    graph.grid = self.graph.grid.clone();
                    self.graph = graph;
                    report = serialize::import_into(&mut self.graph, &records);
                    self.finish("import", before, now);
                }
                DeferredEffect::SyncAll => {
                    let ids: Vec<ObjectId> =
                        self.graph.objects().map(|o| o.id()).collect();
                    for id in ids {
                        self.graph.sync_node(id);
                    }
                }
            }
        }
        Ok(report)
    }

    // ---- clock ---------------------------------------------------------

    /// Advance session timers: closes expired coalescing slots, applies
    /// queued effects, and flushes the debounced modification batch.
    pub fn tick(&mut self, now: Instant) -> SceneResult<ImportReport> {
        self.history.tick(now);
        let report = self.run_deferred(now)?;
        let expired = self
            .dirty_since
            .is_some_and(|since| now.duration_since(since) > MODIFIED_DEBOUNCE);
        if expired && !self.dirty.is_empty() {
            let batch = std::mem::take(&mut self.dirty);
            self.dirty_since = None;
            self.events.push_back(SceneEvent::Modified(batch));
        }
        Ok(report)
    }

    fn mark_dirty(&mut self, id: ObjectId, now: Instant) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
        self.dirty_since = Some(now);
    }

    // ---- events --------------------------------------------------------

    /// Drain all queued notifications.
    pub fn poll_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    // ---- zoom ----------------------------------------------------------

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let clamped = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (clamped - self.zoom).abs() > f64::EPSILON {
            self.zoom = clamped;
            self.events.push_back(SceneEvent::Zoomed(clamped));
        }
    }
}
