//! Project and page containers.
//!
//! A project is an ordered sequence of pages plus global metadata owned by
//! collaborators (animations, styles, data sources) that the core only
//! round-trips. Each page holds one scene graph and exactly one workarea.

use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::grid::GridConfig;
use crate::serialize::{
    self, ImportReport, ObjectRecord, PageFile, ProjectFile,
};
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use crate::objects::ObjectId;

/// One-shot readiness signal resolved by the presentation layer when its
/// rendering surface is attached. Replaces timer-based mount polling.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountSignal {
    ready: bool,
}

impl MountSignal {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Resolve the signal. Returns `true` the first time only.
    pub fn notify(&mut self) -> bool {
        !std::mem::replace(&mut self.ready, true)
    }
}

/// One page: a scene graph plus mount state, optionally seeded from a
/// source page when it was created by duplication.
#[derive(Debug)]
pub struct Page {
    pub id: ObjectId,
    pub graph: SceneGraph,
    /// Source page this one was duplicated from, if any.
    pub duplicated_from: Option<ObjectId>,
    /// Initial object snapshot applied on mount (duplicated pages only).
    seed: Option<Vec<ObjectRecord>>,
    mount: MountSignal,
}

impl Page {
    pub fn new(grid: GridConfig) -> Self {
        let mut graph = SceneGraph::new();
        graph.grid = grid;
        Self {
            id: Uuid::new_v4(),
            graph,
            duplicated_from: None,
            seed: None,
            mount: MountSignal::default(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_ready()
    }

    /// Called by the presentation layer once its surface is attached.
    /// Applies the seed snapshot for duplicated pages; later calls are
    /// no-ops.
    pub fn notify_mounted(&mut self) -> ImportReport {
        if !self.mount.notify() {
            return ImportReport::default();
        }
        match self.seed.take() {
            Some(records) => {
                debug!("seeding page {} with {} records", self.id, records.len());
                serialize::import_into(&mut self.graph, &records)
            }
            None => ImportReport::default(),
        }
    }
}

/// Ordered pages plus global metadata.
#[derive(Debug)]
pub struct Project {
    pub name: String,
    pages: Vec<Page>,
    pub animations: Vec<Value>,
    pub styles: Vec<Value>,
    pub data_sources: Vec<Value>,
}

impl Project {
    /// Create a project with one empty, already-mounted page.
    pub fn new(name: impl Into<String>) -> Self {
        let mut page = Page::new(GridConfig::default());
        page.notify_mounted();
        Self {
            name: name.into(),
            pages: vec![page],
            animations: Vec::new(),
            styles: Vec::new(),
            data_sources: Vec::new(),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: ObjectId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_mut(&mut self, id: ObjectId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub fn page_at(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_at_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a fresh page inheriting the first page's grid configuration.
    pub fn add_page(&mut self) -> ObjectId {
        let grid = self
            .pages
            .first()
            .map(|p| p.graph.grid.clone())
            .unwrap_or_default();
        let mut page = Page::new(grid);
        page.notify_mounted();
        let id = page.id;
        self.pages.push(page);
        id
    }

    /// Remove a page. The last remaining page cannot be removed.
    pub fn remove_page(&mut self, id: ObjectId) -> SceneResult<()> {
        if self.pages.len() == 1 {
            return Err(SceneError::validation("page", "a project needs at least one page"));
        }
        let before = self.pages.len();
        self.pages.retain(|p| p.id != id);
        if self.pages.len() == before {
            return Err(SceneError::Structural(format!("unknown page {id}")));
        }
        Ok(())
    }

    /// Duplicate a page. The clone carries a remapped snapshot of the
    /// source's objects and seeds its graph when the presentation layer
    /// signals mount, so every id stays unique across the project.
    pub fn duplicate_page(&mut self, id: ObjectId) -> SceneResult<ObjectId> {
        let source = self
            .page(id)
            .ok_or_else(|| SceneError::Structural(format!("unknown page {id}")))?;
        let mut records = serialize::export_records(&source.graph);
        serialize::remap_ids(&mut records);

        let mut page = Page::new(source.graph.grid.clone());
        page.duplicated_from = Some(id);
        page.seed = Some(records);
        let new_id = page.id;
        let index = self.pages.iter().position(|p| p.id == id).unwrap_or(0);
        self.pages.insert(index + 1, page);
        Ok(new_id)
    }

    // ---- persisted document -------------------------------------------

    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            name: self.name.clone(),
            pages: self
                .pages
                .iter()
                .map(|p| PageFile {
                    id: p.id,
                    objects: serialize::export_records(&p.graph),
                })
                .collect(),
            animations: self.animations.clone(),
            styles: self.styles.clone(),
            data_sources: self.data_sources.clone(),
        }
    }

    /// Rebuild a project from its persisted document. Unresolvable records
    /// are dropped per page and merged into one report.
    pub fn from_file(file: &ProjectFile) -> (Self, ImportReport) {
        let mut report = ImportReport::default();
        let mut pages = Vec::with_capacity(file.pages.len());
        for page_file in &file.pages {
            let (graph, page_report) = serialize::import_records(&page_file.objects);
            report.dropped.extend(page_report.dropped);
            let mut page = Page::new(GridConfig::default());
            page.id = page_file.id;
            page.graph = graph;
            page.notify_mounted();
            pages.push(page);
        }
        let mut project = Self::new(&file.name);
        project.pages = pages;
        project.animations = file.animations.clone();
        project.styles = file.styles.clone();
        project.data_sources = file.data_sources.clone();
        if project.pages.is_empty() {
            project.add_page();
        }
        (project, report)
    }

    /// Every id across all pages, for uniqueness checks.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        for page in &self.pages {
            ids.push(page.id);
            ids.push(page.graph.workarea().common.id);
            for object in page.graph.objects() {
                ids.push(object.id());
                if let Some(node) = object.as_node() {
                    ids.extend(node.ports().map(|p| p.id));
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use crate::objects::RoutingKind;
    use kurbo::Point;
    use std::collections::HashSet;

    fn project_with_flow() -> (Project, ObjectId) {
        let mut project = Project::new("demo");
        let page_id = project.pages()[0].id;
        let graph = &mut project.page_mut(page_id).unwrap().graph;
        let a = graph
            .add(&Descriptor::node("A", 0, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        let b = graph
            .add(&Descriptor::node("B", 1, 0), Point::new(300.0, 200.0), false)
            .unwrap();
        let out = graph.get(a).unwrap().as_node().unwrap().out_ports[0].id;
        let inp = graph.get(b).unwrap().as_node().unwrap().in_ports[0].id;
        graph.connect(out, inp, RoutingKind::Straight).unwrap();
        (project, page_id)
    }

    #[test]
    fn duplicated_page_seeds_on_mount() {
        let (mut project, page_id) = project_with_flow();
        let copy_id = project.duplicate_page(page_id).unwrap();

        let copy = project.page(copy_id).unwrap();
        assert!(!copy.is_mounted());
        assert!(copy.graph.is_empty());
        assert_eq!(copy.duplicated_from, Some(page_id));

        let report = project.page_mut(copy_id).unwrap().notify_mounted();
        assert!(report.is_clean());
        let copy = project.page(copy_id).unwrap();
        assert_eq!(copy.graph.len(), 3);
        // Second notification is a no-op.
        assert!(project.page_mut(copy_id).unwrap().notify_mounted().is_clean());
    }

    #[test]
    fn ids_stay_unique_across_pages() {
        let (mut project, page_id) = project_with_flow();
        let copy_id = project.duplicate_page(page_id).unwrap();
        project.page_mut(copy_id).unwrap().notify_mounted();

        let ids = project.all_ids();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn last_page_cannot_be_removed() {
        let mut project = Project::new("demo");
        let only = project.pages()[0].id;
        assert!(project.remove_page(only).is_err());

        let second = project.add_page();
        assert!(project.remove_page(only).is_ok());
        assert_eq!(project.pages()[0].id, second);
    }

    #[test]
    fn project_file_round_trip() {
        let (project, _) = project_with_flow();
        let file = project.to_file();

        let (restored, report) = Project::from_file(&file);
        assert!(report.is_clean());
        assert_eq!(restored.to_file(), file);
    }

    #[test]
    fn mount_signal_fires_once() {
        let mut signal = MountSignal::default();
        assert!(!signal.is_ready());
        assert!(signal.notify());
        assert!(!signal.notify());
        assert!(signal.is_ready());
    }
}
