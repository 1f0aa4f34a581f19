use super::generated_at_utc;
use super::labels::file_name;
use crate::dataset::{read_json, sorted_files, DatasetDocument, DOCUMENT_SUFFIX};
use crate::engine::SchemaEngine;
use crate::error::ToolingError;
use crate::model::RecipeDraft;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Assembled section sizes of one draft
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCounts {
    pub ingredients: usize,
    pub steps: usize,
    pub notes: usize,
}

impl SectionCounts {
    pub fn of(draft: &RecipeDraft) -> Self {
        let present = |items: &[String]| items.iter().filter(|item| !item.trim().is_empty()).count();
        Self {
            ingredients: draft.ingredients.len(),
            steps: draft.steps.len(),
            notes: present(&draft.notes),
        }
    }
}

/// `candidate - reference` per section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDeltas {
    pub ingredients: i64,
    pub steps: i64,
    pub notes: i64,
}

impl CountDeltas {
    fn between(candidate: SectionCounts, reference: SectionCounts) -> Self {
        let delta = |a: usize, b: usize| a as i64 - b as i64;
        Self {
            ingredients: delta(candidate.ingredients, reference.ingredients),
            steps: delta(candidate.steps, reference.steps),
            notes: delta(candidate.notes, reference.notes),
        }
    }

    pub fn any(&self) -> bool {
        self.ingredients != 0 || self.steps != 0 || self.notes != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureAssemblyParity {
    pub fixture: String,
    pub line_count: usize,
    pub candidate_counts: SectionCounts,
    pub reference_counts: SectionCounts,
    pub count_deltas: CountDeltas,
    pub has_count_mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyParityReport {
    pub report_type: String,
    pub generated_at_utc: String,
    pub candidate: String,
    pub reference: String,
    pub fixtures_dir: String,
    pub total_fixtures: usize,
    pub mismatch_docs: usize,
    pub ingredient_mismatch_docs: usize,
    pub step_mismatch_docs: usize,
    pub note_mismatch_docs: usize,
    pub max_mismatch_docs: usize,
    pub passes_threshold: bool,
    pub fixtures: Vec<FixtureAssemblyParity>,
}

impl AssemblyParityReport {
    /// Fixture names whose assembled counts differ
    pub fn mismatched_fixtures(&self) -> impl Iterator<Item = &str> {
        self.fixtures
            .iter()
            .filter(|fixture| fixture.has_count_mismatch)
            .map(|fixture| fixture.fixture.as_str())
    }
}

/// Compare assembled section counts of two implementations over `*.doc.json` fixtures
pub fn compare_assembly(
    candidate: &dyn SchemaEngine,
    reference: &dyn SchemaEngine,
    documents_dir: &Path,
    max_mismatch_docs: usize,
) -> Result<AssemblyParityReport, ToolingError> {
    let files = sorted_files(documents_dir, DOCUMENT_SUFFIX)?;

    let fixtures: Vec<FixtureAssemblyParity> = files
        .par_iter()
        .map(|path| {
            let document: DatasetDocument = read_json(path)?;
            let lines = &document.normalized_lines;

            let candidate_counts = SectionCounts::of(&candidate.run(lines)?.draft);
            let reference_counts = SectionCounts::of(&reference.run(lines)?.draft);
            let count_deltas = CountDeltas::between(candidate_counts, reference_counts);

            Ok(FixtureAssemblyParity {
                fixture: file_name(path),
                line_count: lines.len(),
                candidate_counts,
                reference_counts,
                count_deltas,
                has_count_mismatch: count_deltas.any(),
            })
        })
        .collect::<Result<_, ToolingError>>()?;

    let count = |pick: fn(&CountDeltas) -> i64| {
        fixtures
            .iter()
            .filter(|fixture| pick(&fixture.count_deltas) != 0)
            .count()
    };
    let mismatch_docs = fixtures.iter().filter(|f| f.has_count_mismatch).count();
    let report = AssemblyParityReport {
        report_type: "assembly_parity".to_string(),
        generated_at_utc: generated_at_utc(),
        candidate: candidate.name().to_string(),
        reference: reference.name().to_string(),
        fixtures_dir: documents_dir.display().to_string(),
        total_fixtures: fixtures.len(),
        mismatch_docs,
        ingredient_mismatch_docs: count(|d| d.ingredients),
        step_mismatch_docs: count(|d| d.steps),
        note_mismatch_docs: count(|d| d.notes),
        max_mismatch_docs,
        passes_threshold: mismatch_docs <= max_mismatch_docs,
        fixtures,
    };

    info!(
        "Assembly parity: {}/{} docs (ingredient={}, step={}, note={})",
        report.mismatch_docs,
        report.total_fixtures,
        report.ingredient_mismatch_docs,
        report.step_mismatch_docs,
        report.note_mismatch_docs
    );
    Ok(report)
}
