//! Connectable node and its anchor ports.

use super::{Common, Frame, ObjectId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default fill for ports that declare no palette color.
pub const DEFAULT_PORT_FILL: &str = "rgba(0, 0, 0, 0.1)";

/// Horizontal spacing between sibling ports on the same edge.
pub const PORT_SPACING: f64 = 80.0;

/// Which end of a link a port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    /// Outbound anchor, a link starts here.
    Source,
    /// Inbound anchor, a link ends here.
    Target,
}

/// Anchor point owned by exactly one node.
///
/// `left_diff`/`top_diff` are fixed at creation as offsets from the owner's
/// center. `left`/`top` are the derived absolute position; they are
/// recomputed from the owner on every geometry change and are never ground
/// truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: ObjectId,
    pub role: PortRole,
    pub left_diff: f64,
    pub top_diff: f64,
    pub fill: String,
    pub origin_fill: String,
    pub left: f64,
    pub top: f64,
}

impl Port {
    pub fn new(role: PortRole, left_diff: f64, top_diff: f64, fill: impl Into<String>) -> Self {
        let fill = fill.into();
        Self {
            id: Uuid::new_v4(),
            role,
            left_diff,
            top_diff,
            fill: fill.clone(),
            origin_fill: fill,
            left: 0.0,
            top: 0.0,
        }
    }

    /// Current absolute position (valid after the last sync).
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

/// Connectable scene object owning an ordered set of ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub common: Common,
    /// Palette descriptor this node was instantiated from.
    pub descriptor: String,
    pub in_ports: Vec<Port>,
    pub out_ports: Vec<Port>,
}

impl Node {
    /// Create a node with evenly spread ports: targets along the top edge,
    /// sources along the bottom edge. Two sources sit at -40/+40 from
    /// center, matching the classic filter-node template.
    pub fn with_ports(name: impl Into<String>, frame: Frame, in_count: usize, out_count: usize) -> Self {
        let half_h = frame.height / 2.0;
        let in_ports = spread_offsets(in_count)
            .into_iter()
            .map(|dx| Port::new(PortRole::Target, dx, -half_h, DEFAULT_PORT_FILL))
            .collect();
        let out_ports = spread_offsets(out_count)
            .into_iter()
            .map(|dx| Port::new(PortRole::Source, dx, half_h, DEFAULT_PORT_FILL))
            .collect();
        let mut node = Self {
            common: Common::new(name, frame),
            descriptor: String::new(),
            in_ports,
            out_ports,
        };
        node.sync_ports();
        node
    }

    /// All ports in declaration order, targets first.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.in_ports.iter().chain(self.out_ports.iter())
    }

    pub fn ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.in_ports.iter_mut().chain(self.out_ports.iter_mut())
    }

    pub fn port(&self, id: ObjectId) -> Option<&Port> {
        self.ports().find(|p| p.id == id)
    }

    pub fn owns_port(&self, id: ObjectId) -> bool {
        self.port(id).is_some()
    }

    /// Recompute every owned port's absolute position from the node center
    /// and the port's fixed offset.
    ///
    /// The projection tracks translation and size only; `angle` is
    /// intentionally not factored in. Rotation-aware placement is a known
    /// limitation of the offset model, not silently corrected here.
    pub fn sync_ports(&mut self) {
        let center = self.common.frame.center();
        for port in self.in_ports.iter_mut().chain(self.out_ports.iter_mut()) {
            port.left = center.x + port.left_diff;
            port.top = center.y + port.top_diff;
        }
    }
}

/// Offsets spreading `count` ports symmetrically around the center.
fn spread_offsets(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| (i as f64 - (count as f64 - 1.0) / 2.0) * PORT_SPACING)
        .collect()
}
