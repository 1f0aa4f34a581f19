use super::naive_bayes::{ClassifierModel, Prediction};
use crate::assembler::patterns::{header_section, SectionKind};
use crate::model::{Label, LabeledLine, Line};
use rayon::prelude::*;
use std::sync::Arc;

const TITLE_MAX_CHARS: usize = 110;
const TITLE_MAX_WORDS: usize = 14;
const HEADER_MAX_WORDS: usize = 7;
const HEADER_MAX_CHARS: usize = 90;
const SECTION_WORDS: &[&str] = &["ingredient", "instruction", "direction", "method", "step"];

/// Per-line model predictions corrected by document context.
///
/// Line predictions are independent and run in parallel; the section pass that follows
/// is sequential because each line depends on the headers above it.
#[derive(Clone)]
pub struct ContextualPredictor {
    model: Arc<ClassifierModel>,
}

impl ContextualPredictor {
    pub fn new(model: Arc<ClassifierModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    pub fn label_texts(&self, texts: &[String]) -> Vec<LabeledLine> {
        let lines: Vec<Line> = texts.iter().map(Line::new).collect();
        self.label_lines(&lines)
    }

    pub fn label_lines(&self, lines: &[Line]) -> Vec<LabeledLine> {
        let predictions: Vec<Prediction> = lines
            .par_iter()
            .map(|line| self.model.predict(&line.text))
            .collect();

        let mut active_section: Option<SectionKind> = None;
        lines
            .iter()
            .zip(predictions)
            .enumerate()
            .map(|(idx, (line, prediction))| {
                let (label, confidence) =
                    apply_context(idx, &line.text, prediction, &mut active_section);
                LabeledLine {
                    line: line.clone(),
                    label,
                    confidence: confidence.clamp(0.0, 1.0) as f32,
                }
            })
            .collect()
    }
}

fn apply_context(
    idx: usize,
    text: &str,
    prediction: Prediction,
    active_section: &mut Option<SectionKind>,
) -> (Label, f64) {
    let mut label = prediction.label;
    let mut confidence = prediction.confidence;

    if idx == 0 && looks_like_title_line(text) {
        label = Label::Title;
        confidence = confidence.max(0.96);
    }

    if let Some(section) = header_section(text) {
        *active_section = Some(section);
        return (Label::Header, confidence.max(0.98));
    }
    if looks_like_header(text) {
        return (Label::Header, confidence.max(0.93));
    }

    match *active_section {
        Some(_) if label == Label::Header => {}
        Some(SectionKind::Notes) => {
            label = Label::Note;
            confidence = confidence.max(0.90);
        }
        Some(SectionKind::Ingredients) if label == Label::Title => {}
        Some(SectionKind::Ingredients) => {
            label = Label::Ingredient;
            confidence = confidence.max(0.90);
        }
        Some(SectionKind::Steps) => {
            label = Label::Step;
            confidence = confidence.max(0.90);
        }
        None => {}
    }
    (label, confidence)
}

/// Opening line short enough to be a recipe name
fn looks_like_title_line(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || text.ends_with(':') || text.chars().count() > TITLE_MAX_CHARS {
        return false;
    }
    let words = text.split_whitespace().count();
    if !(1..=TITLE_MAX_WORDS).contains(&words) {
        return false;
    }
    let lowered = text.to_lowercase();
    !SECTION_WORDS.iter().any(|word| lowered.contains(word)) && !text.contains('.')
}

/// Short `…:` line
fn looks_like_header(text: &str) -> bool {
    let text = text.trim();
    let Some(stem) = text.strip_suffix(':') else {
        return false;
    };
    let words = stem.split_whitespace().count();
    (1..=HEADER_MAX_WORDS).contains(&words) && text.chars().count() <= HEADER_MAX_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> ContextualPredictor {
        let rows = vec![
            ("Lemon Tart", Label::Title),
            ("lemon zest", Label::Ingredient),
            ("caster sugar", Label::Ingredient),
            ("gently fold in the cream", Label::Step),
            ("keeps for two days", Label::Note),
            ("Ingredients", Label::Header),
            ("share this", Label::Junk),
        ];
        ContextualPredictor::new(Arc::new(ClassifierModel::train(rows, 1.0, 5)))
    }

    fn labels(lines: &[&str]) -> Vec<Label> {
        let texts: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        predictor()
            .label_texts(&texts)
            .into_iter()
            .map(|l| l.label)
            .collect()
    }

    #[test]
    fn test_sections_pull_labels() {
        let result = labels(&[
            "Lemon Tart",
            "Ingredients",
            "lemon zest",
            "Fresh Mint Leaves",
            "For the crust:",
            "caster sugar",
            "Instructions",
            "gently fold in the cream",
            "chill before slicing",
            "Notes",
            "keeps for two days",
        ]);
        assert_eq!(
            result,
            vec![
                Label::Title,
                Label::Header,
                Label::Ingredient,
                Label::Ingredient,
                Label::Header,
                Label::Ingredient,
                Label::Header,
                Label::Step,
                Label::Step,
                Label::Header,
                Label::Note,
            ]
        );
    }

    #[test]
    fn test_first_line_with_sentence_is_not_forced_to_title() {
        let result = labels(&["Whisk the eggs. Then bake.", "2 eggs"]);
        assert_eq!(result[0], Label::Step);
        assert_eq!(result[1], Label::Ingredient);
    }

    #[test]
    fn test_title_survives_inside_ingredients() {
        let prediction = |label: Label| Prediction {
            label,
            confidence: 0.6,
            probabilities: [0.0; Label::ALL.len()],
            from_rule: false,
        };

        let mut section = Some(SectionKind::Ingredients);
        let (label, _) = apply_context(3, "Lemon Curd Filling", prediction(Label::Title), &mut section);
        assert_eq!(label, Label::Title);
        let (label, confidence) = apply_context(4, "caster sugar", prediction(Label::Step), &mut section);
        assert_eq!(label, Label::Ingredient);
        assert_eq!(confidence, 0.90);

        let mut section = Some(SectionKind::Steps);
        let (label, _) = apply_context(5, "Lemon Curd Filling", prediction(Label::Title), &mut section);
        assert_eq!(label, Label::Step);
    }

    #[test]
    fn test_confidence_stays_in_range() {
        let texts = vec!["Ingredients".to_string(), "zzz".to_string()];
        for line in predictor().label_texts(&texts) {
            assert!((0.0..=1.0).contains(&line.confidence));
        }
    }
}
