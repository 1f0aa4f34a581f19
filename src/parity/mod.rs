//! Cross-implementation parity gate.
//!
//! Two [`SchemaEngine`](crate::engine::SchemaEngine)s run over the same fixtures; the
//! gate is green when their labels and assembled counts agree within tolerance, every
//! remaining assembly difference is explained, and every golden case passes.

pub mod assembly;
pub mod golden;
pub mod labels;

pub use assembly::{compare_assembly, AssemblyParityReport, CountDeltas, SectionCounts};
pub use golden::{load_golden_cases, run_golden_cases, GoldenCase, GoldenExpectations, GoldenResult};
pub use labels::{compare_labels, Confusion, LabelParityReport};

use crate::dataset::{read_json, DOCUMENT_SUFFIX};
use crate::error::ToolingError;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Documented reasons for known assembly differences, keyed by fixture file name or doc id
pub type Rationales = BTreeMap<String, String>;

pub(crate) fn generated_at_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn load_rationales(path: &Path) -> Result<Rationales, ToolingError> {
    read_json(path)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateVerdict {
    pub label_parity_passed: bool,
    pub assembly_parity_passed: bool,
    /// Mismatched fixtures without a rationale
    pub missing_rationales: Vec<String>,
    pub failed_golden_cases: Vec<String>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.label_parity_passed
            && self.assembly_parity_passed
            && self.missing_rationales.is_empty()
            && self.failed_golden_cases.is_empty()
    }
}

fn has_rationale(rationales: &Rationales, fixture: &str) -> bool {
    let doc_id = fixture.trim_end_matches(DOCUMENT_SUFFIX);
    [fixture, doc_id]
        .iter()
        .filter_map(|key| rationales.get(*key))
        .any(|reason| !reason.trim().is_empty())
}

pub fn evaluate_gate(
    labels: &LabelParityReport,
    assembly: &AssemblyParityReport,
    rationales: &Rationales,
    golden: &[GoldenResult],
) -> GateVerdict {
    GateVerdict {
        label_parity_passed: labels.passes_threshold,
        assembly_parity_passed: assembly.passes_threshold,
        missing_rationales: assembly
            .mismatched_fixtures()
            .filter(|fixture| !has_rationale(rationales, fixture))
            .map(str::to_string)
            .collect(),
        failed_golden_cases: golden
            .iter()
            .filter(|result| !result.passed)
            .map(|result| result.name.clone())
            .collect(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::engine::{EngineOutput, SchemaEngine};
    use crate::error::ToolingError;
    use crate::model::{IngredientLine, Label, RecipeDraft};

    /// Labels lines with a fixed function and groups them into a draft without assembly rules
    pub struct FixedEngine {
        name: String,
        label: fn(&str) -> Label,
    }

    impl FixedEngine {
        pub fn new(name: &str, label: fn(&str) -> Label) -> Self {
            Self {
                name: name.to_string(),
                label,
            }
        }
    }

    impl SchemaEngine for FixedEngine {
        fn name(&self) -> &str {
            &self.name
        }

        fn run(&self, lines: &[String]) -> Result<EngineOutput, ToolingError> {
            let labels: Vec<Label> = lines.iter().map(|line| (self.label)(line)).collect();
            let with = |wanted: Label| {
                lines
                    .iter()
                    .zip(&labels)
                    .filter(move |(_, label)| **label == wanted)
                    .map(|(line, _)| line.clone())
            };
            let draft = RecipeDraft {
                title: with(Label::Title).next(),
                ingredients: with(Label::Ingredient).map(IngredientLine::new).collect(),
                steps: with(Label::Step).collect(),
                notes: with(Label::Note).collect(),
                ..Default::default()
            };
            Ok(EngineOutput {
                labels,
                confidences: None,
                draft,
            })
        }
    }
}
