use super::generated_at_utc;
use crate::dataset::{read_json_lines, sorted_files, LineRow, LINES_SUFFIX};
use crate::engine::SchemaEngine;
use crate::error::ToolingError;
use crate::model::Label;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const TOP_CONFUSIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMismatch {
    pub line_index: usize,
    pub text: String,
    pub candidate_label: Label,
    pub reference_label: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confusion {
    pub candidate_label: Label,
    pub reference_label: Label,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureLabelParity {
    pub fixture: String,
    pub line_count: usize,
    pub mismatch_count: usize,
    pub mismatch_rate: f64,
    pub mismatches: Vec<LabelMismatch>,
    pub confusions: Vec<Confusion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelParityReport {
    pub report_type: String,
    pub generated_at_utc: String,
    pub candidate: String,
    pub reference: String,
    pub fixtures_dir: String,
    pub total_fixtures: usize,
    pub total_lines: usize,
    pub mismatch_lines: usize,
    pub mismatch_rate: f64,
    pub threshold: f64,
    pub passes_threshold: bool,
    pub top_confusions: Vec<Confusion>,
    pub fixtures: Vec<FixtureLabelParity>,
}

/// Most frequent first; ties by label order so reports are stable
fn ranked(counts: BTreeMap<(Label, Label), usize>, limit: usize) -> Vec<Confusion> {
    let mut confusions: Vec<Confusion> = counts
        .into_iter()
        .map(|((candidate_label, reference_label), count)| Confusion {
            candidate_label,
            reference_label,
            count,
        })
        .collect();
    confusions.sort_by(|a, b| b.count.cmp(&a.count));
    confusions.truncate(limit);
    confusions
}

fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-line label comparison of two pipeline implementations over `*.lines.jsonl` fixtures.
///
/// Only the fixture text is used; gold labels play no part in parity.
pub fn compare_labels(
    candidate: &dyn SchemaEngine,
    reference: &dyn SchemaEngine,
    lines_dir: &Path,
    threshold: f64,
) -> Result<LabelParityReport, ToolingError> {
    let files = sorted_files(lines_dir, LINES_SUFFIX)?;

    let fixtures: Vec<FixtureLabelParity> = files
        .par_iter()
        .map(|path| {
            let mut rows: Vec<LineRow> = read_json_lines(path)?;
            rows.sort_by_key(|row| row.line_index);
            let lines: Vec<String> = rows.into_iter().map(|row| row.text).collect();

            let candidate_labels = candidate.run(&lines)?.labels;
            let reference_labels = reference.run(&lines)?.labels;

            let mut counts = BTreeMap::new();
            let mut mismatches = Vec::new();
            for (line_index, ((text, candidate_label), reference_label)) in lines
                .iter()
                .zip(candidate_labels)
                .zip(reference_labels)
                .enumerate()
            {
                if candidate_label == reference_label {
                    continue;
                }
                *counts.entry((candidate_label, reference_label)).or_insert(0) += 1;
                mismatches.push(LabelMismatch {
                    line_index,
                    text: text.clone(),
                    candidate_label,
                    reference_label,
                });
            }

            Ok(FixtureLabelParity {
                fixture: file_name(path),
                line_count: lines.len(),
                mismatch_count: mismatches.len(),
                mismatch_rate: rate(mismatches.len(), lines.len()),
                mismatches,
                confusions: ranked(counts, usize::MAX),
            })
        })
        .collect::<Result<_, ToolingError>>()?;

    let total_lines: usize = fixtures.iter().map(|f| f.line_count).sum();
    let mismatch_lines: usize = fixtures.iter().map(|f| f.mismatch_count).sum();
    let mismatch_rate = rate(mismatch_lines, total_lines);

    let mut totals = BTreeMap::new();
    for confusion in fixtures.iter().flat_map(|f| &f.confusions) {
        *totals
            .entry((confusion.candidate_label, confusion.reference_label))
            .or_insert(0) += confusion.count;
    }

    info!(
        "Label parity: {}/{} ({:.4}%) threshold={:.4}%",
        mismatch_lines,
        total_lines,
        mismatch_rate * 100.0,
        threshold * 100.0
    );
    Ok(LabelParityReport {
        report_type: "label_parity".to_string(),
        generated_at_utc: generated_at_utc(),
        candidate: candidate.name().to_string(),
        reference: reference.name().to_string(),
        fixtures_dir: lines_dir.display().to_string(),
        total_fixtures: fixtures.len(),
        total_lines,
        mismatch_lines,
        mismatch_rate,
        threshold,
        passes_threshold: mismatch_rate <= threshold,
        top_confusions: ranked(totals, TOP_CONFUSIONS),
        fixtures,
    })
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
