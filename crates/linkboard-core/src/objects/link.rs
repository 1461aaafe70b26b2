//! Link between two ports.

use super::{Common, Frame, ObjectId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Path computation variant for a link. The variants differ only in how the
/// path between the two endpoints is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingKind {
    /// Single segment between the endpoints.
    #[default]
    Straight,
    /// Single quadratic curve, control point offset perpendicular to the
    /// endpoint vector.
    Curved,
    /// Horizontal/vertical segments only, with one or two right-angle
    /// bends.
    Orthogonal,
}

/// Scene object connecting a source port to a target port.
///
/// A link is valid only while both referenced ports exist and belong to
/// live nodes; the graph prunes it otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub common: Common,
    pub from_port: ObjectId,
    pub to_port: ObjectId,
    pub routing: RoutingKind,
    /// Cached routed polyline/control points. Runtime-only, rebuilt whenever
    /// either endpoint moves; never serialized.
    #[serde(skip)]
    pub path: Vec<Point>,
}

impl Link {
    pub fn new(from_port: ObjectId, to_port: ObjectId, routing: RoutingKind) -> Self {
        Self {
            common: Common::new("link", Frame::default()),
            from_port,
            to_port,
            routing,
            path: Vec::new(),
        }
    }

    /// Whether either endpoint references the given port.
    pub fn touches_port(&self, port: ObjectId) -> bool {
        self.from_port == port || self.to_port == port
    }
}
