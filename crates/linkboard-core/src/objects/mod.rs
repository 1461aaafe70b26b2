//! Typed object model for the scene graph.
//!
//! Every addressable entity is a [`SceneObject`]: a closed tagged enum with a
//! per-variant struct, dispatched at the enum level. Helper visuals (grid
//! guide lines, selection chrome) are never `SceneObject`s and never receive
//! an id.

mod image;
mod link;
mod node;
mod shape;
mod text;
mod workarea;

pub use image::Image;
pub use link::{Link, RoutingKind};
pub use node::{Node, Port, PortRole, DEFAULT_PORT_FILL, PORT_SPACING};
pub use shape::{Shape, ShapeKind};
pub use text::Text;
pub use workarea::{Workarea, WorkareaLayout};

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for scene objects (and ports).
pub type ObjectId = Uuid;

/// Broad category used for dispatch, the `superType` of the persisted
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuperKind {
    /// Plain drawable (rect, polygon, svg, text).
    Shape,
    /// Embedded media (image and friends).
    Element,
    /// Connectable unit owning ports.
    Node,
    /// Connection between two ports.
    Link,
    /// Per-page canvas background.
    Workarea,
}

/// Shared geometry of every scene object.
///
/// `left`/`top` are the top-left corner in canvas coordinates; the center is
/// derived. Angle is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Frame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Center point of the frame.
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Axis-aligned bounds (rotation is not applied).
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.top += dy;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Fields shared by every scene object variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Common {
    pub id: ObjectId,
    pub name: String,
    pub frame: Frame,
    pub locked: bool,
    /// CSS color string, as the persisted format stores it.
    pub fill: Option<String>,
    pub stroke: Option<String>,
    /// Hyperlink action payload (owned by collaborators, round-tripped).
    pub link: Option<Value>,
    pub tooltip: Option<Value>,
    pub animation: Option<Value>,
    pub trigger: Option<Value>,
    pub user_property: Option<Value>,
}

impl Common {
    pub fn new(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frame,
            locked: false,
            fill: None,
            stroke: None,
            link: None,
            tooltip: None,
            animation: None,
            trigger: None,
            user_property: None,
        }
    }
}

/// Closed sum of all scene object variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SceneObject {
    Shape(Shape),
    Text(Text),
    Image(Image),
    Node(Node),
    Link(Link),
    Workarea(Workarea),
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        self.common().id
    }

    pub fn common(&self) -> &Common {
        match self {
            SceneObject::Shape(o) => &o.common,
            SceneObject::Text(o) => &o.common,
            SceneObject::Image(o) => &o.common,
            SceneObject::Node(o) => &o.common,
            SceneObject::Link(o) => &o.common,
            SceneObject::Workarea(o) => &o.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            SceneObject::Shape(o) => &mut o.common,
            SceneObject::Text(o) => &mut o.common,
            SceneObject::Image(o) => &mut o.common,
            SceneObject::Node(o) => &mut o.common,
            SceneObject::Link(o) => &mut o.common,
            SceneObject::Workarea(o) => &mut o.common,
        }
    }

    pub fn super_kind(&self) -> SuperKind {
        match self {
            SceneObject::Shape(_) | SceneObject::Text(_) => SuperKind::Shape,
            SceneObject::Image(_) => SuperKind::Element,
            SceneObject::Node(_) => SuperKind::Node,
            SceneObject::Link(_) => SuperKind::Link,
            SceneObject::Workarea(_) => SuperKind::Workarea,
        }
    }

    /// The `type` discriminant of the persisted format.
    pub fn type_name(&self) -> &'static str {
        match self {
            SceneObject::Shape(s) => s.kind.type_name(),
            SceneObject::Text(_) => "text",
            SceneObject::Image(_) => "image",
            SceneObject::Node(_) => "node",
            SceneObject::Link(_) => "link",
            SceneObject::Workarea(_) => "workarea",
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.common().frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.common_mut().frame
    }

    /// Assign a fresh id to this object (and, for nodes, to every owned
    /// port). Used by duplication and page cloning so imports stay unique
    /// across the whole project.
    pub fn regenerate_id(&mut self) {
        self.common_mut().id = Uuid::new_v4();
        if let SceneObject::Node(node) = self {
            for port in node.ports_mut() {
                port.id = Uuid::new_v4();
            }
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, SceneObject::Node(_))
    }

    pub fn is_link(&self) -> bool {
        matches!(self, SceneObject::Link(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            SceneObject::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            SceneObject::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            SceneObject::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_link_mut(&mut self) -> Option<&mut Link> {
        match self {
            SceneObject::Link(l) => Some(l),
            _ => None,
        }
    }
}
