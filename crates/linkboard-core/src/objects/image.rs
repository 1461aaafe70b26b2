//! Image element.
//!
//! The core stores only the asset reference; upload and hosting are
//! collaborator concerns.

use super::{Common, Frame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub common: Common,
    /// Asset reference (URL or storage key).
    pub src: Option<String>,
}

impl Image {
    pub fn new(name: impl Into<String>, frame: Frame, src: Option<String>) -> Self {
        Self {
            common: Common::new(name, frame),
            src,
        }
    }
}
