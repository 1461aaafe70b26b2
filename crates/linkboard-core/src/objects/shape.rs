//! Plain drawable shapes.

use super::{Common, Frame};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Concrete drawable kind, the `type` of the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Triangle,
    Circle,
    Polygon,
    Svg,
}

impl ShapeKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Svg => "svg",
        }
    }
}

/// Generic drawable: rect, triangle, circle, polygon or inline svg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub common: Common,
    pub kind: ShapeKind,
    /// Polygon vertices, present for `ShapeKind::Polygon` only.
    pub points: Option<Vec<Point>>,
    /// Inline markup, present for `ShapeKind::Svg` only.
    pub svg: Option<String>,
}

impl Shape {
    pub fn new(kind: ShapeKind, name: impl Into<String>, frame: Frame) -> Self {
        Self {
            common: Common::new(name, frame),
            kind,
            points: None,
            svg: None,
        }
    }
}
