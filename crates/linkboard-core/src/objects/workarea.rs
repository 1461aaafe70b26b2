//! Per-page canvas background.

use super::{Common, Frame};
use serde::{Deserialize, Serialize};

/// How the workarea fills the rendering surface. Interpreting the mode is a
/// presentation concern; the core only carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkareaLayout {
    #[default]
    Fixed,
    Responsive,
    Fullscreen,
}

/// Singleton-per-page background object. Not connectable, never removed by
/// structural operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workarea {
    pub common: Common,
    pub layout: WorkareaLayout,
    pub workarea_width: f64,
    pub workarea_height: f64,
    /// Optional background image reference.
    pub src: Option<String>,
}

impl Workarea {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            common: Common::new("workarea", Frame::new(0.0, 0.0, width, height)),
            layout: WorkareaLayout::default(),
            workarea_width: width,
            workarea_height: height,
            src: None,
        }
    }
}

impl Default for Workarea {
    fn default() -> Self {
        Self::new(600.0, 400.0)
    }
}
