use crate::config::AcceptanceThresholds;
use crate::model::Label;
use serde::Serialize;
use std::collections::BTreeMap;

/// One evaluated line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedLine {
    pub doc_id: String,
    pub line_index: usize,
    pub gold: Label,
    pub predicted: Label,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Mean F1 over all six labels
    pub macro_f1: f64,
    /// Mean F1 over labels with nonzero support; the gated value
    pub macro_f1_present_labels: f64,
    pub present_labels: Vec<Label>,
    pub per_class: BTreeMap<Label, ClassMetrics>,
    /// `confusion[gold][predicted]`
    pub confusion: BTreeMap<Label, BTreeMap<Label, usize>>,
    pub ingredient_step_confusion_rate: f64,
    pub prediction_count: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn compute_metrics(predictions: &[EvaluatedLine]) -> Metrics {
    let mut matrix = [[0usize; 6]; 6];
    for prediction in predictions {
        matrix[prediction.gold.index()][prediction.predicted.index()] += 1;
    }

    let mut per_class = BTreeMap::new();
    for label in Label::ALL {
        let idx = label.index();
        let tp = matrix[idx][idx];
        let fp: usize = (0..6).filter(|&other| other != idx).map(|other| matrix[other][idx]).sum();
        let fn_: usize = (0..6).filter(|&other| other != idx).map(|other| matrix[idx][other]).sum();

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_class.insert(
            label,
            ClassMetrics {
                precision,
                recall,
                f1,
                support: matrix[idx].iter().sum(),
            },
        );
    }

    let macro_f1 = per_class.values().map(|m| m.f1).sum::<f64>() / Label::ALL.len() as f64;
    let present_labels: Vec<Label> = Label::ALL
        .into_iter()
        .filter(|label| per_class[label].support > 0)
        .collect();
    let macro_f1_present_labels = if present_labels.is_empty() {
        macro_f1
    } else {
        present_labels.iter().map(|label| per_class[label].f1).sum::<f64>()
            / present_labels.len() as f64
    };

    let swaps = matrix[Label::Ingredient.index()][Label::Step.index()]
        + matrix[Label::Step.index()][Label::Ingredient.index()];

    let confusion = Label::ALL
        .iter()
        .map(|gold| {
            let row = Label::ALL
                .iter()
                .map(|predicted| (*predicted, matrix[gold.index()][predicted.index()]))
                .collect();
            (*gold, row)
        })
        .collect();

    Metrics {
        macro_f1,
        macro_f1_present_labels,
        present_labels,
        per_class,
        confusion,
        ingredient_step_confusion_rate: ratio(swaps, predictions.len()),
        prediction_count: predictions.len(),
    }
}

/// Outcome of one acceptance check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCheck {
    pub name: String,
    pub value: f64,
    pub threshold: f64,
    /// `None` when the check does not apply (no support)
    pub passed: Option<bool>,
}

/// Macro-F1 floor, note recall floor (when notes are present), ingredient/step confusion ceiling
pub fn check_thresholds(metrics: &Metrics, thresholds: &AcceptanceThresholds) -> Vec<ThresholdCheck> {
    let note = &metrics.per_class[&Label::Note];
    vec![
        ThresholdCheck {
            name: "macro_f1".to_string(),
            value: metrics.macro_f1_present_labels,
            threshold: thresholds.macro_f1,
            passed: Some(metrics.macro_f1_present_labels >= thresholds.macro_f1),
        },
        ThresholdCheck {
            name: "note_recall".to_string(),
            value: note.recall,
            threshold: thresholds.note_recall,
            passed: (note.support > 0).then(|| note.recall >= thresholds.note_recall),
        },
        ThresholdCheck {
            name: "ingredient_step_confusion".to_string(),
            value: metrics.ingredient_step_confusion_rate,
            threshold: thresholds.ingredient_step_confusion,
            passed: Some(metrics.ingredient_step_confusion_rate <= thresholds.ingredient_step_confusion),
        },
    ]
}

pub fn all_passed(checks: &[ThresholdCheck]) -> bool {
    checks.iter().all(|check| check.passed != Some(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(gold: Label, predicted: Label) -> EvaluatedLine {
        EvaluatedLine {
            doc_id: "doc".to_string(),
            line_index: 0,
            gold,
            predicted,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_perfect_predictions() {
        let preds = vec![
            line(Label::Title, Label::Title),
            line(Label::Ingredient, Label::Ingredient),
            line(Label::Step, Label::Step),
        ];
        let metrics = compute_metrics(&preds);
        assert_eq!(metrics.macro_f1_present_labels, 1.0);
        assert_eq!(metrics.present_labels, vec![Label::Title, Label::Ingredient, Label::Step]);
        assert!(metrics.macro_f1 < 1.0);
        assert_eq!(metrics.ingredient_step_confusion_rate, 0.0);

        let checks = check_thresholds(&metrics, &AcceptanceThresholds::default());
        assert!(all_passed(&checks));
        assert_eq!(checks[1].passed, None);
    }

    #[test]
    fn test_swaps_and_note_recall() {
        let preds = vec![
            line(Label::Ingredient, Label::Step),
            line(Label::Step, Label::Ingredient),
            line(Label::Step, Label::Step),
            line(Label::Note, Label::Step),
        ];
        let metrics = compute_metrics(&preds);
        assert_eq!(metrics.ingredient_step_confusion_rate, 0.5);
        assert_eq!(metrics.confusion[&Label::Ingredient][&Label::Step], 1);
        assert_eq!(metrics.per_class[&Label::Note].recall, 0.0);
        assert_eq!(metrics.per_class[&Label::Step].support, 2);

        let checks = check_thresholds(&metrics, &AcceptanceThresholds::default());
        assert!(!all_passed(&checks));
        assert_eq!(checks[1].passed, Some(false));
    }

    #[test]
    fn test_empty_predictions() {
        let metrics = compute_metrics(&[]);
        assert_eq!(metrics.prediction_count, 0);
        assert_eq!(metrics.macro_f1_present_labels, 0.0);
    }
}
