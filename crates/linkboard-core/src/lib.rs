//! Linkboard Core Library
//!
//! Platform-agnostic scene graph, routing and history for the Linkboard
//! node-and-link diagram editor.

pub mod descriptor;
pub mod editor;
pub mod error;
pub mod graph;
pub mod grid;
pub mod history;
pub mod objects;
pub mod project;
pub mod routing;
pub mod serialize;
pub mod store;

pub use descriptor::{Descriptor, DescriptorKind, DescriptorRegistry};
pub use editor::{DeferredEffect, Editor, SceneEvent};
pub use error::{SceneError, SceneResult};
pub use graph::{GraphSnapshot, SceneGraph};
pub use grid::{GridConfig, GuideLine, guide_lines, snap_point, snap_value};
pub use history::{History, COALESCE_WINDOW, MAX_UNDO_HISTORY};
pub use objects::{
    Common, Frame, Image, Link, Node, ObjectId, Port, PortRole, RoutingKind, SceneObject,
    Shape, ShapeKind, SuperKind, Text, Workarea, WorkareaLayout,
};
pub use project::{MountSignal, Page, Project};
pub use routing::Anchor;
pub use serialize::{ImportReport, ObjectRecord, PortRecord, ProjectFile};
pub use store::{MemoryStore, ProjectStore};
