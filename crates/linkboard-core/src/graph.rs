//! Scene graph: object ownership and structural mutation primitives.
//!
//! All invariants settle inside this module: port positions are re-derived
//! after every geometry change, removals cascade node -> ports -> links, and
//! anything left dangling is pruned rather than surfaced as a fatal fault.

use crate::descriptor::{Descriptor, DescriptorKind};
use crate::error::{SceneError, SceneResult};
use crate::grid::{self, GridConfig};
use crate::objects::{
    Frame, Image, Link, Node, ObjectId, RoutingKind, SceneObject, Shape, Text, Workarea,
};
use crate::routing::{self, Anchor};
use kurbo::{Point, Rect};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;

/// Offset applied to duplicated objects.
const DUPLICATE_OFFSET: f64 = 10.0;

/// Structural state captured for undo/redo.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    objects: HashMap<ObjectId, SceneObject>,
    z_order: Vec<ObjectId>,
    workarea: Workarea,
}

/// One page's worth of addressable objects plus its workarea background.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    objects: HashMap<ObjectId, SceneObject>,
    /// Back-to-front draw order.
    z_order: Vec<ObjectId>,
    workarea: Workarea,
    pub grid: GridConfig,
    selection: Vec<ObjectId>,
    selection_locked: bool,
    /// port id -> owning node id.
    port_owner: HashMap<ObjectId, ObjectId>,
    /// port id -> links referencing it.
    links_by_port: HashMap<ObjectId, Vec<ObjectId>>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_workarea(Workarea::default())
    }

    pub fn with_workarea(workarea: Workarea) -> Self {
        Self {
            objects: HashMap::new(),
            z_order: Vec::new(),
            workarea,
            grid: GridConfig::default(),
            selection: Vec::new(),
            selection_locked: false,
            port_owner: HashMap::new(),
            links_by_port: HashMap::new(),
        }
    }

    // ---- queries ------------------------------------------------------

    pub fn workarea(&self) -> &Workarea {
        &self.workarea
    }

    pub fn workarea_mut(&mut self) -> &mut Workarea {
        &mut self.workarea
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Objects in z-order (back to front).
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// The node owning a port, if both still exist.
    pub fn port_owner(&self, port: ObjectId) -> Option<ObjectId> {
        self.port_owner.get(&port).copied()
    }

    /// Absolute position of a port, derived from its owner at read time.
    pub fn port_position(&self, port: ObjectId) -> Option<Point> {
        let node = self.objects.get(self.port_owner.get(&port)?)?.as_node()?;
        let p = node.port(port)?;
        let center = node.common.frame.center();
        Some(Point::new(center.x + p.left_diff, center.y + p.top_diff))
    }

    fn anchor(&self, port: ObjectId) -> Option<Anchor> {
        let node = self.objects.get(self.port_owner.get(&port)?)?.as_node()?;
        let p = node.port(port)?;
        Some(Anchor {
            position: p.position(),
            left_diff: p.left_diff,
            top_diff: p.top_diff,
            half_width: node.common.frame.width / 2.0,
            half_height: node.common.frame.height / 2.0,
        })
    }

    // ---- structural mutation ------------------------------------------

    /// Instantiate a descriptor at `position` and insert the result. Node
    /// descriptors create the node and all its ports atomically.
    pub fn add(&mut self, descriptor: &Descriptor, position: Point, centered: bool) -> SceneResult<ObjectId> {
        let (width, height) = descriptor.default_size();
        let (left, top) = if centered {
            (position.x - width / 2.0, position.y - height / 2.0)
        } else {
            (position.x, position.y)
        };
        let frame = Frame::new(left, top, width, height);

        let object = match descriptor.kind {
            DescriptorKind::Node => {
                let mut node = Node::with_ports(
                    descriptor.name.clone(),
                    frame,
                    descriptor.in_ports,
                    descriptor.out_ports,
                );
                node.descriptor = descriptor.name.clone();
                SceneObject::Node(node)
            }
            DescriptorKind::Text => {
                let text = descriptor
                    .option
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or(&descriptor.name)
                    .to_string();
                SceneObject::Text(Text::new(descriptor.name.clone(), frame, text))
            }
            DescriptorKind::Image => {
                let src = descriptor
                    .option
                    .get("src")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                SceneObject::Image(Image::new(descriptor.name.clone(), frame, src))
            }
            kind => {
                let shape_kind = kind
                    .shape_kind()
                    .ok_or_else(|| SceneError::validation("kind", "descriptor kind has no shape"))?;
                SceneObject::Shape(Shape::new(shape_kind, descriptor.name.clone(), frame))
            }
        };

        let id = object.id();
        self.insert(object);
        self.set_coords(id)?;
        debug!("add '{}' -> {id}", descriptor.name);
        Ok(id)
    }

    /// Low-level insert of a ready-made object, used by `add`, duplication
    /// and import. Keeps the port/link indexes current.
    pub fn insert(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id();
        match &object {
            SceneObject::Node(node) => {
                for port in node.ports() {
                    self.port_owner.insert(port.id, id);
                }
            }
            SceneObject::Link(link) => {
                self.links_by_port.entry(link.from_port).or_default().push(id);
                self.links_by_port.entry(link.to_port).or_default().push(id);
            }
            _ => {}
        }
        self.z_order.push(id);
        self.objects.insert(id, object);
        id
    }

    /// Connect two ports with a link. Permissive about roles and self-loops:
    /// both endpoints may belong to the same node.
    pub fn connect(&mut self, from_port: ObjectId, to_port: ObjectId, routing: RoutingKind) -> SceneResult<ObjectId> {
        if self.anchor(from_port).is_none() {
            return Err(SceneError::Structural(format!("unknown source port {from_port}")));
        }
        if self.anchor(to_port).is_none() {
            return Err(SceneError::Structural(format!("unknown target port {to_port}")));
        }
        let id = self.insert(SceneObject::Link(Link::new(from_port, to_port, routing)));
        self.reroute(id);
        Ok(id)
    }

    /// Remove an object, cascading: a node takes its ports and every link
    /// referencing them along.
    pub fn remove(&mut self, id: ObjectId) -> SceneResult<Vec<ObjectId>> {
        if id == self.workarea.common.id {
            return Err(SceneError::validation("id", "the workarea cannot be removed"));
        }
        let Some(object) = self.objects.get(&id) else {
            return Err(SceneError::Structural(format!("unknown object {id}")));
        };

        let ports: Vec<ObjectId> = object
            .as_node()
            .map(|n| n.ports().map(|p| p.id).collect())
            .unwrap_or_default();
        let mut links: Vec<ObjectId> = ports
            .iter()
            .filter_map(|p| self.links_by_port.get(p))
            .flatten()
            .copied()
            .collect();
        links.sort_unstable();
        links.dedup();

        let mut removed = Vec::new();
        for link in links {
            self.remove_object(link);
            removed.push(link);
        }
        self.remove_object(id);
        removed.push(id);
        debug!("remove {id} ({} objects)", removed.len());
        Ok(removed)
    }

    /// Explicit-id removal, the context-menu form of [`SceneGraph::remove`].
    pub fn remove_by_id(&mut self, id: ObjectId) -> SceneResult<Vec<ObjectId>> {
        self.remove(id)
    }

    fn remove_object(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.remove(&id) {
            match &object {
                SceneObject::Node(node) => {
                    for port in node.ports() {
                        self.port_owner.remove(&port.id);
                    }
                }
                SceneObject::Link(link) => {
                    for port in [link.from_port, link.to_port] {
                        if let Some(links) = self.links_by_port.get_mut(&port) {
                            links.retain(|l| *l != id);
                            if links.is_empty() {
                                self.links_by_port.remove(&port);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        self.z_order.retain(|z| *z != id);
        self.selection.retain(|s| *s != id);
    }

    /// Clone an object: fresh id, geometry offset, name suffixed `_clone`.
    /// A duplicated node gets fresh ports and no incident links.
    pub fn duplicate(&mut self, id: ObjectId) -> SceneResult<ObjectId> {
        if id == self.workarea.common.id {
            return Err(SceneError::validation("id", "the workarea cannot be duplicated"));
        }
        let Some(source) = self.objects.get(&id) else {
            return Err(SceneError::Structural(format!("unknown object {id}")));
        };
        let mut clone = source.clone();
        clone.regenerate_id();
        {
            let common = clone.common_mut();
            common.name = format!("{}_clone", common.name);
            common.frame.translate(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        }
        if let Some(node) = clone.as_node_mut() {
            node.sync_ports();
        }
        let new_id = self.insert(clone);
        if self.objects.get(&new_id).is_some_and(SceneObject::is_link) {
            self.reroute(new_id);
        }
        Ok(new_id)
    }

    /// Explicit-id duplication, the context-menu form of
    /// [`SceneGraph::duplicate`].
    pub fn duplicate_by_id(&mut self, id: ObjectId) -> SceneResult<ObjectId> {
        self.duplicate(id)
    }

    // ---- properties ---------------------------------------------------

    /// Set one property on one object. Geometry keys re-trigger coordinate
    /// commit (grid snap, port sync, link rerouting). Invalid values are
    /// rejected and the prior value kept.
    pub fn set(&mut self, id: ObjectId, key: &str, value: &Value) -> SceneResult<()> {
        let is_workarea = id == self.workarea.common.id;
        if !is_workarea && !self.objects.contains_key(&id) {
            return Err(SceneError::Structural(format!("unknown object {id}")));
        }

        match key {
            "left" | "top" => {
                let v = number(key, value)?;
                if is_workarea {
                    set_frame_field(&mut self.workarea.common.frame, key, v);
                    return Ok(());
                }
                set_frame_field(self.object_frame_mut(id)?, key, v);
                self.set_coords(id)?;
            }
            "width" | "height" => {
                let v = number(key, value)?;
                if !(v > 0.0) {
                    return Err(SceneError::validation(key, "size must be positive"));
                }
                if is_workarea {
                    set_frame_field(&mut self.workarea.common.frame, key, v);
                    if key == "width" {
                        self.workarea.workarea_width = v;
                    } else {
                        self.workarea.workarea_height = v;
                    }
                    return Ok(());
                }
                set_frame_field(self.object_frame_mut(id)?, key, v);
                self.set_coords(id)?;
            }
            "angle" => {
                let v = number(key, value)?;
                if is_workarea {
                    self.workarea.common.frame.angle = v;
                } else {
                    self.object_frame_mut(id)?.angle = v;
                }
            }
            "scaleX" | "scaleY" => {
                let v = number(key, value)?;
                if !(v.is_finite() && v != 0.0) {
                    return Err(SceneError::validation(key, "scale must be finite and non-zero"));
                }
                let frame = if is_workarea {
                    &mut self.workarea.common.frame
                } else {
                    self.object_frame_mut(id)?
                };
                if key == "scaleX" {
                    frame.scale_x = v;
                } else {
                    frame.scale_y = v;
                }
            }
            "locked" => {
                let v = boolean(key, value)?;
                self.common_mut(id, is_workarea)?.locked = v;
            }
            "name" => {
                let v = string(key, value)?;
                self.common_mut(id, is_workarea)?.name = v;
            }
            "fill" => self.common_mut(id, is_workarea)?.fill = opt_string(key, value)?,
            "stroke" => self.common_mut(id, is_workarea)?.stroke = opt_string(key, value)?,
            "link" => self.common_mut(id, is_workarea)?.link = non_null(value),
            "tooltip" => self.common_mut(id, is_workarea)?.tooltip = non_null(value),
            "animation" => self.common_mut(id, is_workarea)?.animation = non_null(value),
            "trigger" => self.common_mut(id, is_workarea)?.trigger = non_null(value),
            "userProperty" => self.common_mut(id, is_workarea)?.user_property = non_null(value),
            "text" => {
                let v = string(key, value)?;
                match self.objects.get_mut(&id) {
                    Some(SceneObject::Text(t)) => t.text = v,
                    _ => return Err(SceneError::validation(key, "object has no text")),
                }
            }
            "fontSize" => {
                let v = number(key, value)?;
                if !(v > 0.0) {
                    return Err(SceneError::validation(key, "font size must be positive"));
                }
                match self.objects.get_mut(&id) {
                    Some(SceneObject::Text(t)) => t.font_size = v,
                    _ => return Err(SceneError::validation(key, "object has no text")),
                }
            }
            "src" => {
                let v = opt_string(key, value)?;
                if is_workarea {
                    self.workarea.src = v;
                    return Ok(());
                }
                match self.objects.get_mut(&id) {
                    Some(SceneObject::Image(i)) => i.src = v,
                    _ => return Err(SceneError::validation(key, "object has no source")),
                }
            }
            "routingKind" => {
                let routing: RoutingKind = serde_json::from_value(value.clone())
                    .map_err(|e| SceneError::validation(key, e.to_string()))?;
                match self.objects.get_mut(&id) {
                    Some(SceneObject::Link(l)) => l.routing = routing,
                    _ => return Err(SceneError::validation(key, "object is not a link")),
                }
                self.reroute(id);
            }
            other => {
                return Err(SceneError::validation(other, "unknown property"));
            }
        }
        Ok(())
    }

    fn object_frame_mut(&mut self, id: ObjectId) -> SceneResult<&mut Frame> {
        self.objects
            .get_mut(&id)
            .map(SceneObject::frame_mut)
            .ok_or_else(|| SceneError::Structural(format!("unknown object {id}")))
    }

    fn common_mut(&mut self, id: ObjectId, is_workarea: bool) -> SceneResult<&mut crate::objects::Common> {
        if is_workarea {
            Ok(&mut self.workarea.common)
        } else {
            self.objects
                .get_mut(&id)
                .map(SceneObject::common_mut)
                .ok_or_else(|| SceneError::Structural(format!("unknown object {id}")))
        }
    }

    // ---- selection ----------------------------------------------------

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn select(&mut self, id: ObjectId) {
        self.clear_selection();
        self.add_to_selection(id);
    }

    pub fn add_to_selection(&mut self, id: ObjectId) {
        if self.objects.contains_key(&id) && !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selection_locked = false;
    }

    pub fn select_all(&mut self) {
        self.selection = self.z_order.clone();
    }

    /// Whether interaction affordances for the current selection are
    /// disabled.
    pub fn selection_locked(&self) -> bool {
        self.selection_locked
    }

    /// Broadcast a property to every selected object. `locked` is
    /// selection-only: it is applied per member and additionally toggles the
    /// selection's interaction affordances.
    pub fn set_on_selection(&mut self, key: &str, value: &Value) -> SceneResult<()> {
        if key == "locked" {
            self.selection_locked = boolean(key, value)?;
        }
        for id in self.selection.clone() {
            self.set(id, key, value)?;
        }
        Ok(())
    }

    // ---- geometry commit ----------------------------------------------

    /// Translate an object and commit its coordinates. Locked objects are
    /// skipped.
    pub fn move_by(&mut self, id: ObjectId, dx: f64, dy: f64) -> SceneResult<()> {
        let Some(object) = self.objects.get_mut(&id) else {
            return Err(SceneError::Structural(format!("unknown object {id}")));
        };
        if object.common().locked {
            debug!("move_by skipped, {id} is locked");
            return Ok(());
        }
        object.frame_mut().translate(dx, dy);
        self.set_coords(id)
    }

    /// Commit an object's coordinates: quantize to the grid when snapping is
    /// enabled, then re-derive port positions and reroute incident links.
    pub fn set_coords(&mut self, id: ObjectId) -> SceneResult<()> {
        let snaps = self.grid.snaps();
        let cell = self.grid.cell_size;
        let Some(object) = self.objects.get_mut(&id) else {
            return Err(SceneError::Structural(format!("unknown object {id}")));
        };
        if snaps {
            let frame = object.frame_mut();
            frame.left = grid::snap_value(frame.left, cell);
            frame.top = grid::snap_value(frame.top, cell);
        }
        let (is_node, is_link) = (object.is_node(), object.is_link());
        if is_node {
            self.sync_node(id);
        } else if is_link {
            self.reroute(id);
        }
        Ok(())
    }

    /// Move the whole selection and snap its bounding anchor once: members
    /// keep their relative offsets, only the selection origin quantizes.
    pub fn move_selection(&mut self, dx: f64, dy: f64) -> SceneResult<()> {
        if self.selection_locked {
            return Ok(());
        }
        let members: Vec<ObjectId> = self
            .selection
            .iter()
            .copied()
            .filter(|id| {
                self.objects
                    .get(id)
                    .is_some_and(|o| !o.common().locked && !o.is_link())
            })
            .collect();
        if members.is_empty() {
            return Ok(());
        }

        let (mut snap_dx, mut snap_dy) = (0.0, 0.0);
        if self.grid.snaps() {
            let bounds = self.bounds_of(&members);
            let origin = Point::new(bounds.x0 + dx, bounds.y0 + dy);
            let snapped = grid::snap_point(origin, self.grid.cell_size);
            snap_dx = snapped.x - origin.x;
            snap_dy = snapped.y - origin.y;
        }
        for id in &members {
            if let Some(object) = self.objects.get_mut(id) {
                object.frame_mut().translate(dx + snap_dx, dy + snap_dy);
            }
        }
        for id in members {
            if self.objects.get(&id).is_some_and(SceneObject::is_node) {
                self.sync_node(id);
            }
        }
        Ok(())
    }

    fn bounds_of(&self, ids: &[ObjectId]) -> Rect {
        let mut bounds: Option<Rect> = None;
        for id in ids {
            if let Some(object) = self.objects.get(id) {
                let b = object.frame().bounds();
                bounds = Some(match bounds {
                    Some(r) => r.union(b),
                    None => b,
                });
            }
        }
        bounds.unwrap_or(Rect::ZERO)
    }

    /// Re-derive every port of a node and reroute the links that touch
    /// them. No-op per port if the port has already been pruned.
    pub fn sync_node(&mut self, id: ObjectId) {
        let Some(node) = self.objects.get_mut(&id).and_then(SceneObject::as_node_mut) else {
            return;
        };
        node.sync_ports();
        let ports: Vec<ObjectId> = node.ports().map(|p| p.id).collect();
        let mut links: Vec<ObjectId> = ports
            .iter()
            .filter_map(|p| self.links_by_port.get(p))
            .flatten()
            .copied()
            .collect();
        links.sort_unstable();
        links.dedup();
        for link in links {
            self.reroute(link);
        }
    }

    /// Recompute one link's path from its endpoint anchors. Touches only the
    /// link and its two endpoints.
    pub fn reroute(&mut self, id: ObjectId) {
        let Some(link) = self.objects.get(&id).and_then(SceneObject::as_link) else {
            return;
        };
        let (from, to) = (self.anchor(link.from_port), self.anchor(link.to_port));
        let (Some(from), Some(to)) = (from, to) else {
            return;
        };
        let routing = link.routing;
        if let Some(link) = self.objects.get_mut(&id).and_then(SceneObject::as_link_mut) {
            link.path = routing::route(routing, &from, &to);
        }
    }

    // ---- z-order ------------------------------------------------------

    pub fn z_order(&self) -> &[ObjectId] {
        &self.z_order
    }

    pub fn bring_to_front(&mut self, id: ObjectId) {
        if self.objects.contains_key(&id) {
            self.z_order.retain(|z| *z != id);
            self.z_order.push(id);
        }
    }

    pub fn send_to_back(&mut self, id: ObjectId) {
        if self.objects.contains_key(&id) {
            self.z_order.retain(|z| *z != id);
            self.z_order.insert(0, id);
        }
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        if let Some(pos) = self.z_order.iter().position(|z| *z == id) {
            if pos < self.z_order.len() - 1 {
                self.z_order.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        if let Some(pos) = self.z_order.iter().position(|z| *z == id) {
            if pos > 0 {
                self.z_order.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    // ---- invariant enforcement & history support ----------------------

    /// Prune links whose endpoints no longer resolve. Returns the pruned
    /// ids. Called after import and snapshot restore; structural
    /// inconsistency is healed here rather than escalated.
    pub fn heal(&mut self) -> Vec<ObjectId> {
        let dangling: Vec<ObjectId> = self
            .objects
            .values()
            .filter_map(|o| {
                let link = o.as_link()?;
                if self.anchor(link.from_port).is_none() || self.anchor(link.to_port).is_none() {
                    Some(link.common.id)
                } else {
                    None
                }
            })
            .collect();
        for id in &dangling {
            warn!("pruning dangling link {id}");
            self.remove_object(*id);
        }
        dangling
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            objects: self.objects.clone(),
            z_order: self.z_order.clone(),
            workarea: self.workarea.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        self.objects = snapshot.objects;
        self.z_order = snapshot.z_order;
        self.workarea = snapshot.workarea;
        self.selection.retain(|id| self.objects.contains_key(id));
        self.rebuild_index();
        self.heal();
    }

    /// Rebuild the port/link indexes from the object map.
    pub(crate) fn rebuild_index(&mut self) {
        self.port_owner.clear();
        self.links_by_port.clear();
        for (id, object) in &self.objects {
            match object {
                SceneObject::Node(node) => {
                    for port in node.ports() {
                        self.port_owner.insert(port.id, *id);
                    }
                }
                SceneObject::Link(link) => {
                    self.links_by_port.entry(link.from_port).or_default().push(*id);
                    self.links_by_port.entry(link.to_port).or_default().push(*id);
                }
                _ => {}
            }
        }
    }

    /// Set the draw order explicitly, used by import to restore record
    /// order. Ids not present in the graph are ignored.
    pub(crate) fn reorder(&mut self, order: &[ObjectId]) {
        let mut z: Vec<ObjectId> = order
            .iter()
            .copied()
            .filter(|id| self.objects.contains_key(id))
            .collect();
        for id in &self.z_order {
            if !z.contains(id) {
                z.push(*id);
            }
        }
        self.z_order = z;
    }

    /// Re-derive ports and reroute everything, used after import.
    pub(crate) fn sync_all(&mut self) {
        let nodes: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.is_node())
            .map(|(id, _)| *id)
            .collect();
        for id in nodes {
            self.sync_node(id);
        }
    }
}

// ---- property value parsing ------------------------------------------

fn number(key: &str, value: &Value) -> SceneResult<f64> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SceneError::validation(key, "expected a finite number"))
}

fn boolean(key: &str, value: &Value) -> SceneResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| SceneError::validation(key, "expected a boolean"))
}

fn string(key: &str, value: &Value) -> SceneResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SceneError::validation(key, "expected a string"))
}

fn opt_string(key: &str, value: &Value) -> SceneResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    string(key, value).map(Some)
}

fn non_null(value: &Value) -> Option<Value> {
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}

fn set_frame_field(frame: &mut Frame, key: &str, v: f64) {
    match key {
        "left" => frame.left = v,
        "top" => frame.top = v,
        "width" => frame.width = v,
        "height" => frame.height = v,
        _ => unreachable!("geometry key checked by caller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_descriptor(name: &str, in_ports: usize, out_ports: usize) -> Descriptor {
        Descriptor::node(name, in_ports, out_ports)
    }

    fn graph_with_link() -> (SceneGraph, ObjectId, ObjectId, ObjectId) {
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&node_descriptor("A", 0, 2), Point::new(100.0, 100.0), false)
            .unwrap();
        let b = graph
            .add(&node_descriptor("B", 1, 0), Point::new(400.0, 300.0), false)
            .unwrap();
        let out0 = graph.get(a).unwrap().as_node().unwrap().out_ports[0].id;
        let in0 = graph.get(b).unwrap().as_node().unwrap().in_ports[0].id;
        let link = graph.connect(out0, in0, RoutingKind::Straight).unwrap();
        (graph, a, b, link)
    }

    #[test]
    fn add_node_creates_ports_atomically() {
        let mut graph = SceneGraph::new();
        let id = graph
            .add(&node_descriptor("Filter", 1, 2), Point::new(0.0, 0.0), false)
            .unwrap();
        let node = graph.get(id).unwrap().as_node().unwrap();
        assert_eq!(node.in_ports.len(), 1);
        assert_eq!(node.out_ports.len(), 2);
        for port in node.ports() {
            assert_eq!(graph.port_owner(port.id), Some(id));
        }
    }

    #[test]
    fn port_positions_never_stale() {
        let (mut graph, a, _, _) = graph_with_link();
        graph.move_by(a, 13.0, -7.0).unwrap();

        let node = graph.get(a).unwrap().as_node().unwrap();
        let center = node.common.frame.center();
        for port in node.ports() {
            let derived = graph.port_position(port.id).unwrap();
            assert_eq!(derived.x, center.x + port.left_diff);
            assert_eq!(derived.y, center.y + port.top_diff);
            assert_eq!(port.position(), derived);
        }
    }

    #[test]
    fn cascade_delete_removes_ports_and_links() {
        let (mut graph, a, _, link) = graph_with_link();
        let ports: Vec<ObjectId> = graph
            .get(a)
            .unwrap()
            .as_node()
            .unwrap()
            .ports()
            .map(|p| p.id)
            .collect();

        let removed = graph.remove(a).unwrap();

        assert!(removed.contains(&a));
        assert!(removed.contains(&link));
        assert!(!graph.contains(link));
        for port in ports {
            assert!(graph.port_owner(port).is_none());
            assert!(graph.port_position(port).is_none());
        }
        assert!(graph.heal().is_empty());
    }

    #[test]
    fn duplicate_isolates_the_clone() {
        let (mut graph, a, _, _) = graph_with_link();
        let before: Vec<ObjectId> = graph.z_order().to_vec();

        let clone = graph.duplicate(a).unwrap();

        assert!(!before.contains(&clone));
        let source = graph.get(a).unwrap().as_node().unwrap();
        let cloned = graph.get(clone).unwrap().as_node().unwrap();
        assert_eq!(cloned.common.name, "A_clone");
        assert_eq!(cloned.common.frame.left, source.common.frame.left + 10.0);
        for port in cloned.ports() {
            assert!(source.port(port.id).is_none());
            // No link references the clone's ports.
            assert!(graph.links_by_port.get(&port.id).is_none());
        }
    }

    #[test]
    fn self_loop_links_are_permitted() {
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&node_descriptor("A", 1, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        let node = graph.get(a).unwrap().as_node().unwrap();
        let (out, inp) = (node.out_ports[0].id, node.in_ports[0].id);
        assert!(graph.connect(out, inp, RoutingKind::Curved).is_ok());
    }

    #[test]
    fn connect_rejects_unknown_ports() {
        let mut graph = SceneGraph::new();
        let err = graph
            .connect(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), RoutingKind::Straight)
            .unwrap_err();
        assert!(matches!(err, SceneError::Structural(_)));
    }

    #[test]
    fn moving_a_node_moves_its_link_endpoint_only() {
        // Node A (out0, out1), node B (in0), link out0 -> in0, straight.
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&node_descriptor("A", 0, 2), Point::new(100.0, 100.0), false)
            .unwrap();
        let b = graph
            .add(&node_descriptor("B", 1, 0), Point::new(400.0, 300.0), false)
            .unwrap();
        let (out0, out1) = {
            let node = graph.get(a).unwrap().as_node().unwrap();
            (node.out_ports[0].id, node.out_ports[1].id)
        };
        let in0 = graph.get(b).unwrap().as_node().unwrap().in_ports[0].id;
        let link = graph.connect(out0, in0, RoutingKind::Straight).unwrap();

        let out0_before = graph.port_position(out0).unwrap();
        let out1_before = graph.port_position(out1).unwrap();
        let in0_before = graph.port_position(in0).unwrap();
        let b_frame_before = *graph.get(b).unwrap().frame();

        graph.move_by(a, 30.0, 0.0).unwrap();

        assert_eq!(graph.port_position(out0).unwrap().x, out0_before.x + 30.0);
        assert_eq!(graph.port_position(out1).unwrap().x, out1_before.x + 30.0);
        assert_eq!(graph.port_position(in0).unwrap(), in0_before);
        assert_eq!(*graph.get(b).unwrap().frame(), b_frame_before);

        let path = &graph.get(link).unwrap().as_link().unwrap().path;
        assert_eq!(path[0].x, out0_before.x + 30.0);
        assert_eq!(path[1], in0_before);
    }

    #[test]
    fn snap_commits_to_cell_multiples() {
        let mut graph = SceneGraph::new();
        graph.grid = GridConfig {
            enabled: true,
            snap_to_grid: true,
            cell_size: 10.0,
            ..GridConfig::default()
        };
        let id = graph
            .add(&node_descriptor("A", 1, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        graph.move_by(id, 13.0, 17.0).unwrap();

        let frame = graph.get(id).unwrap().frame();
        assert!(grid::is_on_grid(frame.left, 10.0));
        assert!(grid::is_on_grid(frame.top, 10.0));

        // Idempotent: a second commit does not move anything.
        let before = *frame;
        graph.set_coords(id).unwrap();
        assert_eq!(*graph.get(id).unwrap().frame(), before);
    }

    #[test]
    fn selection_snap_keeps_relative_offsets() {
        let mut graph = SceneGraph::new();
        graph.grid = GridConfig {
            enabled: true,
            snap_to_grid: true,
            cell_size: 10.0,
            ..GridConfig::default()
        };
        let a = graph
            .add(&node_descriptor("A", 0, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        let b = graph
            .add(&node_descriptor("B", 1, 0), Point::new(33.0, 41.0), false)
            .unwrap();
        graph.select(a);
        graph.add_to_selection(b);

        let rel_before = graph.get(b).unwrap().frame().left - graph.get(a).unwrap().frame().left;
        graph.move_selection(13.0, 21.0).unwrap();

        let fa = *graph.get(a).unwrap().frame();
        let fb = *graph.get(b).unwrap().frame();
        assert_eq!(fb.left - fa.left, rel_before);
        // The selection anchor (bounding origin) is quantized.
        assert!(grid::is_on_grid(fa.left.min(fb.left), 10.0));
        assert!(grid::is_on_grid(fa.top.min(fb.top), 10.0));
    }

    #[test]
    fn set_rejects_invalid_sizes() {
        let mut graph = SceneGraph::new();
        let id = graph
            .add(&node_descriptor("A", 1, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        let before = graph.get(id).unwrap().frame().width;

        let err = graph.set(id, "width", &json!(-5.0)).unwrap_err();
        assert!(matches!(err, SceneError::Validation { .. }));
        assert_eq!(graph.get(id).unwrap().frame().width, before);

        assert!(graph.set(id, "width", &json!(f64::NAN)).is_err());
        assert!(graph.set(id, "bogus", &json!(1)).is_err());
    }

    #[test]
    fn set_on_selection_broadcasts_and_locks() {
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&node_descriptor("A", 1, 1), Point::new(0.0, 0.0), false)
            .unwrap();
        let b = graph
            .add(&node_descriptor("B", 1, 1), Point::new(200.0, 0.0), false)
            .unwrap();
        graph.select(a);
        graph.add_to_selection(b);

        graph.set_on_selection("fill", &json!("#ff0000")).unwrap();
        assert_eq!(graph.get(a).unwrap().common().fill.as_deref(), Some("#ff0000"));
        assert_eq!(graph.get(b).unwrap().common().fill.as_deref(), Some("#ff0000"));

        graph.set_on_selection("locked", &json!(true)).unwrap();
        assert!(graph.selection_locked());
        assert!(graph.get(a).unwrap().common().locked);

        // Locked members no longer move.
        let before = graph.get(a).unwrap().frame().left;
        graph.move_by(a, 50.0, 0.0).unwrap();
        assert_eq!(graph.get(a).unwrap().frame().left, before);
    }

    #[test]
    fn z_order_operations() {
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&Descriptor::new("r1", DescriptorKind::Rect), Point::new(0.0, 0.0), false)
            .unwrap();
        let b = graph
            .add(&Descriptor::new("r2", DescriptorKind::Rect), Point::new(10.0, 10.0), false)
            .unwrap();

        assert_eq!(graph.z_order(), &[a, b]);
        graph.bring_to_front(a);
        assert_eq!(graph.z_order(), &[b, a]);
        graph.send_to_back(a);
        assert_eq!(graph.z_order(), &[a, b]);
        assert!(graph.bring_forward(a));
        assert!(!graph.bring_forward(a));
        assert!(graph.send_backward(a));
    }

    #[test]
    fn restore_heals_dangling_links() {
        let (mut graph, a, _, link) = graph_with_link();
        let mut snapshot = graph.snapshot();
        // Corrupt the snapshot: drop the node but keep the link.
        snapshot.objects.remove(&a);
        snapshot.z_order.retain(|id| *id != a);

        graph.restore(snapshot);
        assert!(!graph.contains(link));
    }

    #[test]
    fn workarea_is_protected() {
        let mut graph = SceneGraph::new();
        let wa = graph.workarea().common.id;
        assert!(graph.remove(wa).is_err());
        assert!(graph.duplicate(wa).is_err());
        assert!(graph.set(wa, "width", &json!(800.0)).is_ok());
        assert_eq!(graph.workarea().workarea_width, 800.0);
    }
}
