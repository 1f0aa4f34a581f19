//! Classifier + assembler behind one interface, so parity checks are written once
//! and run against the in-crate pipeline or an external implementation alike.

mod command;

pub use command::CommandEngine;

use crate::assembler::assemble;
use crate::classifier::{ClassifierModel, ContextualPredictor};
use crate::error::ToolingError;
use crate::model::{Label, RecipeDraft, SourceMetadata};
use std::sync::Arc;

/// Labels and assembled draft for one document
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub labels: Vec<Label>,
    /// Per-line confidences, when the implementation reports them
    pub confidences: Option<Vec<f32>>,
    pub draft: RecipeDraft,
}

pub trait SchemaEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Label the normalized lines of one document and assemble them
    fn run(&self, lines: &[String]) -> Result<EngineOutput, ToolingError>;
}

/// The in-crate contextual predictor followed by the schema assembler
pub struct ModelEngine {
    name: String,
    predictor: ContextualPredictor,
}

impl ModelEngine {
    pub fn new(name: impl Into<String>, model: Arc<ClassifierModel>) -> Self {
        Self {
            name: name.into(),
            predictor: ContextualPredictor::new(model),
        }
    }
}

impl SchemaEngine for ModelEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, lines: &[String]) -> Result<EngineOutput, ToolingError> {
        let labeled = self.predictor.label_texts(lines);
        let draft = assemble(&labeled, &SourceMetadata::default());
        Ok(EngineOutput {
            labels: labeled.iter().map(|line| line.label).collect(),
            confidences: Some(labeled.iter().map(|line| line.confidence).collect()),
            draft,
        })
    }
}
