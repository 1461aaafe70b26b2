//! Palette descriptor registry.
//!
//! Descriptors are templates consumed by `SceneGraph::add` to instantiate
//! typed objects. The registry is owned by the editing session and passed in
//! explicitly; there is no process-wide registration.

use crate::objects::ShapeKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// What a descriptor instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Rect,
    Triangle,
    Circle,
    Polygon,
    Svg,
    Text,
    Image,
    Node,
}

impl DescriptorKind {
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            DescriptorKind::Rect => Some(ShapeKind::Rect),
            DescriptorKind::Triangle => Some(ShapeKind::Triangle),
            DescriptorKind::Circle => Some(ShapeKind::Circle),
            DescriptorKind::Polygon => Some(ShapeKind::Polygon),
            DescriptorKind::Svg => Some(ShapeKind::Svg),
            _ => None,
        }
    }
}

/// One palette entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub icon: String,
    pub kind: DescriptorKind,
    /// Free-form construction options (default size, colors, text...).
    #[serde(default)]
    pub option: Value,
    /// Inbound port count, node descriptors only.
    #[serde(default)]
    pub in_ports: usize,
    /// Outbound port count, node descriptors only.
    #[serde(default)]
    pub out_ports: usize,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, kind: DescriptorKind) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            kind,
            option: Value::Null,
            in_ports: 0,
            out_ports: 0,
        }
    }

    pub fn node(name: impl Into<String>, in_ports: usize, out_ports: usize) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            kind: DescriptorKind::Node,
            option: Value::Null,
            in_ports,
            out_ports,
        }
    }

    /// Default object size declared by the option payload, falling back to
    /// the kind's standard size.
    pub fn default_size(&self) -> (f64, f64) {
        let get = |key: &str| self.option.get(key).and_then(Value::as_f64);
        match (get("width"), get("height")) {
            (Some(w), Some(h)) => (w, h),
            _ if self.kind == DescriptorKind::Node => (100.0, 40.0),
            _ => (100.0, 100.0),
        }
    }
}

/// Session-owned registry of palette descriptors, grouped by palette
/// section.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    groups: HashMap<String, Vec<Descriptor>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, group: impl Into<String>, descriptor: Descriptor) {
        self.groups.entry(group.into()).or_default().push(descriptor);
    }

    pub fn group(&self, group: &str) -> &[Descriptor] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look a descriptor up by name across all groups.
    pub fn find(&self, name: &str) -> Option<&Descriptor> {
        self.groups
            .values()
            .flat_map(|v| v.iter())
            .find(|d| d.name == name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &Vec<Descriptor>)> {
        self.groups.iter()
    }
}
