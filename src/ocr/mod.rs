//! Photographed recipes: text recognition and reading-order reconstruction.

use crate::error::ExtractError;
use crate::model::Region;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod layout;
pub mod vision;

pub use layout::{reconstruct, LayoutChoice, LayoutResult, OrderingScore};
pub use vision::GoogleVisionRecognizer;

/// One recognized text fragment with its bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    pub bbox: Region,
}

fn full_confidence() -> f32 {
    1.0
}

impl Observation {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: Region) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    pub fn center_y(&self) -> f32 {
        self.bbox.y + self.bbox.height / 2.0
    }

    pub fn left(&self) -> f32 {
        self.bbox.x
    }

    pub fn right(&self) -> f32 {
        self.bbox.x + self.bbox.width
    }
}

/// Backend that turns image bytes into positioned text observations
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<Observation>, ExtractError>;
}
