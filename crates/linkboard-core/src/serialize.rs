//! Structural (de)serialization.
//!
//! Export walks all id-bearing objects in z-order and emits a whitelisted
//! record per object; transient runtime state (cached link paths, selection)
//! is never emitted. Import reconstructs objects in record order, re-linking
//! strictly by id; records whose references cannot be resolved are dropped
//! and reported, never fatal.

use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;
use crate::objects::{
    Common, Frame, Image, Link, Node, ObjectId, Port, PortRole, RoutingKind, SceneObject, Shape,
    ShapeKind, Text, Workarea, WorkareaLayout,
};
use kurbo::Point;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Persisted view of one port, embedded in its owning node's record so link
/// endpoints resolve by id on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRecord {
    pub id: ObjectId,
    pub role: PortRole,
    pub left_diff: f64,
    pub top_diff: f64,
    pub fill: String,
    pub origin_fill: String,
}

fn one() -> f64 {
    1.0
}

/// Whitelisted persisted view of one scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: String,
    pub super_type: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_property: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_kind: Option<RoutingKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workarea_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workarea_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<WorkareaLayout>,
}

/// A record skipped during import, with the reason.
#[derive(Debug, Clone)]
pub struct DroppedRecord {
    pub id: ObjectId,
    pub reason: String,
}

/// Which records an import had to drop. Empty on a clean import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub dropped: Vec<DroppedRecord>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Persisted project document: ordered pages plus global metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    #[serde(default)]
    pub name: String,
    pub pages: Vec<PageFile>,
    #[serde(default)]
    pub animations: Vec<Value>,
    #[serde(default)]
    pub styles: Vec<Value>,
    #[serde(default)]
    pub data_sources: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFile {
    pub id: ObjectId,
    pub objects: Vec<ObjectRecord>,
}

impl ProjectFile {
    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Decode {
            record: "project".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> SceneResult<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Decode {
            record: "project".to_string(),
            reason: e.to_string(),
        })
    }
}

// ---- export -----------------------------------------------------------

/// Export every addressable object of a graph, workarea first, then
/// z-order.
pub fn export_records(graph: &SceneGraph) -> Vec<ObjectRecord> {
    let mut records = Vec::with_capacity(graph.len() + 1);
    records.push(workarea_record(graph.workarea()));
    for object in graph.objects() {
        records.push(object_record(object));
    }
    records
}

fn base_record(common: &Common, kind: &str, super_type: &str) -> ObjectRecord {
    ObjectRecord {
        id: common.id,
        kind: kind.to_string(),
        super_type: super_type.to_string(),
        left: common.frame.left,
        top: common.frame.top,
        width: common.frame.width,
        height: common.frame.height,
        angle: common.frame.angle,
        scale_x: common.frame.scale_x,
        scale_y: common.frame.scale_y,
        locked: common.locked,
        name: Some(common.name.clone()),
        fill: common.fill.clone(),
        stroke: common.stroke.clone(),
        link: common.link.clone(),
        tooltip: common.tooltip.clone(),
        animation: common.animation.clone(),
        trigger: common.trigger.clone(),
        user_property: common.user_property.clone(),
        from_port_id: None,
        to_port_id: None,
        routing_kind: None,
        ports: None,
        descriptor: None,
        text: None,
        font_size: None,
        src: None,
        svg: None,
        points: None,
        workarea_width: None,
        workarea_height: None,
        layout: None,
    }
}

fn workarea_record(workarea: &Workarea) -> ObjectRecord {
    let mut record = base_record(&workarea.common, "workarea", "workarea");
    record.workarea_width = Some(workarea.workarea_width);
    record.workarea_height = Some(workarea.workarea_height);
    record.layout = Some(workarea.layout);
    record.src = workarea.src.clone();
    record
}

fn object_record(object: &SceneObject) -> ObjectRecord {
    let super_type = match object.super_kind() {
        crate::objects::SuperKind::Shape => "shape",
        crate::objects::SuperKind::Element => "element",
        crate::objects::SuperKind::Node => "node",
        crate::objects::SuperKind::Link => "link",
        crate::objects::SuperKind::Workarea => "workarea",
    };
    let mut record = base_record(object.common(), object.type_name(), super_type);
    match object {
        SceneObject::Shape(shape) => {
            record.points = shape.points.clone();
            record.svg = shape.svg.clone();
        }
        SceneObject::Text(text) => {
            record.text = Some(text.text.clone());
            record.font_size = Some(text.font_size);
        }
        SceneObject::Image(image) => {
            record.src = image.src.clone();
        }
        SceneObject::Node(node) => {
            record.descriptor = Some(node.descriptor.clone());
            record.ports = Some(
                node.ports()
                    .map(|p| PortRecord {
                        id: p.id,
                        role: p.role,
                        left_diff: p.left_diff,
                        top_diff: p.top_diff,
                        fill: p.fill.clone(),
                        origin_fill: p.origin_fill.clone(),
                    })
                    .collect(),
            );
        }
        SceneObject::Link(link) => {
            record.from_port_id = Some(link.from_port);
            record.to_port_id = Some(link.to_port);
            record.routing_kind = Some(link.routing);
        }
        SceneObject::Workarea(_) => {}
    }
    record
}

// ---- import -----------------------------------------------------------

/// Reconstruct a graph from records. Unresolvable records are dropped and
/// reported.
pub fn import_records(records: &[ObjectRecord]) -> (SceneGraph, ImportReport) {
    let mut graph = SceneGraph::new();
    let report = import_into(&mut graph, records);
    (graph, report)
}

/// Reconstruct records into an existing (typically empty) graph, keeping
/// its grid configuration. Links are resolved after all nodes exist;
/// record order is preserved in the resulting z-order.
pub fn import_into(graph: &mut SceneGraph, records: &[ObjectRecord]) -> ImportReport {
    let mut report = ImportReport::default();
    let mut links: Vec<&ObjectRecord> = Vec::new();
    let mut order: Vec<ObjectId> = Vec::new();

    for record in records {
        match record.kind.as_str() {
            "workarea" => {
                *graph.workarea_mut() = decode_workarea(record);
            }
            "link" => {
                links.push(record);
                order.push(record.id);
            }
            _ => match decode_object(record) {
                Ok(object) => {
                    graph.insert(object);
                    order.push(record.id);
                }
                Err(err) => {
                    warn!("dropping record {}: {err}", record.id);
                    report.dropped.push(DroppedRecord {
                        id: record.id,
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    for record in links {
        let (Some(from), Some(to)) = (record.from_port_id, record.to_port_id) else {
            report.dropped.push(DroppedRecord {
                id: record.id,
                reason: "link record without endpoints".to_string(),
            });
            continue;
        };
        if graph.port_owner(from).is_none() || graph.port_owner(to).is_none() {
            warn!("dropping link {}: endpoint does not resolve", record.id);
            report.dropped.push(DroppedRecord {
                id: record.id,
                reason: "endpoint port does not resolve".to_string(),
            });
            continue;
        }
        let mut link = Link::new(from, to, record.routing_kind.unwrap_or_default());
        link.common = decode_common(record);
        graph.insert(SceneObject::Link(link));
    }

    graph.reorder(&order);
    graph.sync_all();
    report
}

fn decode_common(record: &ObjectRecord) -> Common {
    let mut common = Common::new(
        record.name.clone().unwrap_or_default(),
        Frame {
            left: record.left,
            top: record.top,
            width: record.width,
            height: record.height,
            angle: record.angle,
            scale_x: record.scale_x,
            scale_y: record.scale_y,
        },
    );
    common.id = record.id;
    common.locked = record.locked;
    common.fill = record.fill.clone();
    common.stroke = record.stroke.clone();
    common.link = record.link.clone();
    common.tooltip = record.tooltip.clone();
    common.animation = record.animation.clone();
    common.trigger = record.trigger.clone();
    common.user_property = record.user_property.clone();
    common
}

fn decode_workarea(record: &ObjectRecord) -> Workarea {
    Workarea {
        common: decode_common(record),
        layout: record.layout.unwrap_or_default(),
        workarea_width: record.workarea_width.unwrap_or(record.width),
        workarea_height: record.workarea_height.unwrap_or(record.height),
        src: record.src.clone(),
    }
}

fn decode_object(record: &ObjectRecord) -> SceneResult<SceneObject> {
    let common = decode_common(record);
    let object = match record.kind.as_str() {
        "rect" | "triangle" | "circle" | "polygon" | "svg" => {
            let kind = match record.kind.as_str() {
                "rect" => ShapeKind::Rect,
                "triangle" => ShapeKind::Triangle,
                "circle" => ShapeKind::Circle,
                "polygon" => ShapeKind::Polygon,
                _ => ShapeKind::Svg,
            };
            SceneObject::Shape(Shape {
                common,
                kind,
                points: record.points.clone(),
                svg: record.svg.clone(),
            })
        }
        "text" => SceneObject::Text(Text {
            common,
            text: record.text.clone().unwrap_or_default(),
            font_size: record.font_size.unwrap_or(24.0),
        }),
        "image" => SceneObject::Image(Image {
            common,
            src: record.src.clone(),
        }),
        "node" => {
            let mut in_ports = Vec::new();
            let mut out_ports = Vec::new();
            for p in record.ports.as_deref().unwrap_or_default() {
                let mut port = Port::new(p.role, p.left_diff, p.top_diff, p.fill.clone());
                port.id = p.id;
                port.origin_fill = p.origin_fill.clone();
                match p.role {
                    PortRole::Target => in_ports.push(port),
                    PortRole::Source => out_ports.push(port),
                }
            }
            let mut node = Node {
                common,
                descriptor: record.descriptor.clone().unwrap_or_default(),
                in_ports,
                out_ports,
            };
            node.sync_ports();
            SceneObject::Node(node)
        }
        other => {
            return Err(SceneError::Decode {
                record: record.id.to_string(),
                reason: format!("unknown object type '{other}'"),
            });
        }
    };
    Ok(object)
}

// ---- id remapping -----------------------------------------------------

/// Give every record (and embedded port) a fresh id, rewriting link
/// endpoints through the same mapping. Used when duplicating a page so id
/// uniqueness holds across the whole project.
pub fn remap_ids(records: &mut [ObjectRecord]) {
    let mut mapping: HashMap<ObjectId, ObjectId> = HashMap::new();
    for record in records.iter_mut() {
        let fresh = *mapping.entry(record.id).or_insert_with(Uuid::new_v4);
        record.id = fresh;
        if let Some(ports) = record.ports.as_mut() {
            for port in ports {
                port.id = *mapping.entry(port.id).or_insert_with(Uuid::new_v4);
            }
        }
    }
    for record in records.iter_mut() {
        if let Some(from) = record.from_port_id {
            record.from_port_id = Some(*mapping.entry(from).or_insert_with(Uuid::new_v4));
        }
        if let Some(to) = record.to_port_id {
            record.to_port_id = Some(*mapping.entry(to).or_insert_with(Uuid::new_v4));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, DescriptorKind};
    use serde_json::json;

    fn sample_graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let a = graph
            .add(&Descriptor::node("A", 0, 2), Point::new(100.0, 100.0), false)
            .unwrap();
        let b = graph
            .add(&Descriptor::node("B", 1, 0), Point::new(400.0, 300.0), false)
            .unwrap();
        let out0 = graph.get(a).unwrap().as_node().unwrap().out_ports[0].id;
        let in0 = graph.get(b).unwrap().as_node().unwrap().in_ports[0].id;
        graph.connect(out0, in0, RoutingKind::Orthogonal).unwrap();
        graph
            .add(&Descriptor::new("label", DescriptorKind::Rect), Point::new(0.0, 0.0), false)
            .unwrap();
        graph.set(a, "fill", &json!("#336699")).unwrap();
        graph
            .set(a, "userProperty", &json!({ "stage": 3 }))
            .unwrap();
        graph
    }

    #[test]
    fn export_import_export_round_trips() {
        let graph = sample_graph();
        let exported = export_records(&graph);

        let (imported, report) = import_records(&exported);
        assert!(report.is_clean());

        let re_exported = export_records(&imported);
        assert_eq!(exported, re_exported);
    }

    #[test]
    fn transient_fields_are_not_emitted() {
        let graph = sample_graph();
        let json = serde_json::to_value(export_records(&graph)).unwrap();
        for record in json.as_array().unwrap() {
            assert!(record.get("path").is_none());
            assert!(record.get("selection").is_none());
        }
    }

    #[test]
    fn unresolvable_link_is_dropped_and_reported() {
        let graph = sample_graph();
        let mut records = export_records(&graph);
        // Orphan the link by dropping node A.
        let a_id = records
            .iter()
            .find(|r| r.name.as_deref() == Some("A"))
            .unwrap()
            .id;
        records.retain(|r| r.id != a_id);

        let (mut imported, report) = import_records(&records);
        assert_eq!(report.dropped.len(), 1);
        assert!(report.dropped[0].reason.contains("resolve"));
        assert!(imported.objects().all(|o| !o.is_link()));
        assert!(imported.heal().is_empty());
    }

    #[test]
    fn unknown_record_type_is_skipped_not_fatal() {
        let graph = sample_graph();
        let mut records = export_records(&graph);
        let rect = records
            .iter()
            .position(|r| r.name.as_deref() == Some("label"))
            .unwrap();
        records[rect].kind = "hologram".to_string();

        let (_, report) = import_records(&records);
        assert_eq!(report.dropped.len(), 1);
    }

    #[test]
    fn import_preserves_record_order() {
        let graph = sample_graph();
        let exported = export_records(&graph);
        let (imported, _) = import_records(&exported);

        let order: Vec<ObjectId> = imported.objects().map(|o| o.id()).collect();
        let expected: Vec<ObjectId> = exported[1..].iter().map(|r| r.id).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn import_rederives_port_positions() {
        let graph = sample_graph();
        let (imported, _) = import_records(&export_records(&graph));
        for object in imported.objects() {
            if let Some(node) = object.as_node() {
                let center = node.common.frame.center();
                for port in node.ports() {
                    assert_eq!(port.left, center.x + port.left_diff);
                    assert_eq!(port.top, center.y + port.top_diff);
                }
            }
        }
    }

    #[test]
    fn remap_keeps_link_structure() {
        let graph = sample_graph();
        let mut records = export_records(&graph);
        let originals: Vec<ObjectId> = records.iter().map(|r| r.id).collect();

        remap_ids(&mut records);

        for (record, original) in records.iter().zip(&originals) {
            assert_ne!(record.id, *original);
        }
        let (imported, report) = import_records(&records);
        assert!(report.is_clean());
        assert!(imported.objects().any(|o| o.is_link()));
    }

    #[test]
    fn project_file_json_round_trip() {
        let file = ProjectFile {
            name: "demo".to_string(),
            pages: vec![PageFile {
                id: Uuid::new_v4(),
                objects: export_records(&sample_graph()),
            }],
            animations: vec![json!({ "name": "fade" })],
            styles: Vec::new(),
            data_sources: Vec::new(),
        };
        let json = file.to_json().unwrap();
        assert_eq!(ProjectFile::from_json(&json).unwrap(), file);
    }
}
