//! Text object.

use super::{Common, Frame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    pub common: Common,
    pub text: String,
    pub font_size: f64,
}

impl Text {
    pub fn new(name: impl Into<String>, frame: Frame, text: impl Into<String>) -> Self {
        Self {
            common: Common::new(name, frame),
            text: text.into(),
            font_size: 24.0,
        }
    }
}
