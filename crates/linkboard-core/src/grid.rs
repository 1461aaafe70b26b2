//! Grid display and coordinate snapping.
//!
//! The visual grid is regenerated deterministically from the cell size over
//! a fixed working extent and is display-only: guide lines are not scene
//! objects, carry no id and never serialize.

use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

/// Half-extent of the working area covered by guide lines.
pub const WORKING_EXTENT: f64 = 5000.0;

/// Every n-th guide line is drawn with the border color.
const MAJOR_LINE_EVERY: usize = 5;

/// Tolerance for "committed coordinate is a cell multiple" checks.
pub const SNAP_EPSILON: f64 = 1e-6;

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub enabled: bool,
    pub cell_size: f64,
    pub line_color: String,
    pub border_color: String,
    pub snap_to_grid: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 10.0,
            line_color: "#ebebeb".to_string(),
            border_color: "#cccccc".to_string(),
            snap_to_grid: false,
        }
    }
}

impl GridConfig {
    /// Whether committed coordinates should be quantized.
    pub fn snaps(&self) -> bool {
        self.enabled && self.snap_to_grid && self.cell_size > 0.0
    }
}

/// One display-only guide line.
#[derive(Debug, Clone, Copy)]
pub struct GuideLine {
    pub line: Line,
    /// Drawn with the border color.
    pub major: bool,
}

/// Generate the visual grid for the configured cell size. Deterministic:
/// same config, same lines.
pub fn guide_lines(config: &GridConfig) -> Vec<GuideLine> {
    if !config.enabled || config.cell_size <= 0.0 {
        return Vec::new();
    }
    let extent = WORKING_EXTENT;
    let count = (extent / config.cell_size) as usize;
    let mut lines = Vec::with_capacity(count * 4);
    for i in 0..count {
        let distance = i as f64 * config.cell_size;
        let major = i % MAJOR_LINE_EVERY == 0;
        for x in [distance, distance - extent] {
            lines.push(GuideLine {
                line: Line::new(Point::new(x, -extent), Point::new(x, extent)),
                major,
            });
        }
        for y in [distance, distance - extent] {
            lines.push(GuideLine {
                line: Line::new(Point::new(-extent, y), Point::new(extent, y)),
                major,
            });
        }
    }
    lines
}

/// Round a coordinate to the nearest cell multiple, half away from zero.
pub fn snap_value(value: f64, cell_size: f64) -> f64 {
    (value / cell_size).round() * cell_size
}

/// Snap a point to the grid.
pub fn snap_point(point: Point, cell_size: f64) -> Point {
    Point::new(snap_value(point.x, cell_size), snap_value(point.y, cell_size))
}

/// Whether a committed coordinate is an exact cell multiple within
/// [`SNAP_EPSILON`].
pub fn is_on_grid(value: f64, cell_size: f64) -> bool {
    (value - snap_value(value, cell_size)).abs() <= SNAP_EPSILON
}
