//! Schema assembler: a section state machine over labeled lines.
//!
//! Labels are a strong hint, not the final word. Metadata lines, OCR debris, tips
//! blocks and wrapped continuations are recognized by shape and routed regardless
//! of what the classifier said.

pub mod patterns;
pub mod sanitize;

use crate::error::ExtractError;
use crate::model::{IngredientLine, Label, LabeledLine, RecipeDraft, SourceMetadata};
use crate::normalize::clean_text;
use crate::source::source_title_from_url;
use log::debug;
use once_cell::sync::Lazy;
use patterns::{
    extract_metadata_line, extract_tips_remainder, has_step_number, header_section,
    is_ocr_artifact_line, looks_like_headerless_instruction, looks_like_ingredient_continuation,
    looks_like_ingredient_line, looks_like_note_fragment, looks_like_recipe_title,
    looks_like_step_continuation, looks_like_step_fragment, looks_like_subsection_header,
    normalize_note_text, split_numbered_steps, strip_step_number, title_word_count, SectionKind,
};
use regex::Regex;
use sanitize::{sanitize_ingredient, should_drop_ingredient};

static SAUCE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsauce\b").unwrap());
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Minimum list length before a trailing "For the sauce" group is split off
const MIN_INGREDIENTS_FOR_GROUP_SPLIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Ingredients,
    Steps,
    Notes,
}

#[derive(Debug, Clone)]
struct StepEntry {
    text: String,
    section: Option<String>,
}

#[derive(Debug, Default)]
struct TimeFields {
    yields: Option<String>,
    total: Option<u32>,
    prep: Option<u32>,
    cook: Option<u32>,
}

struct Assembly {
    title: Option<String>,
    section: Section,
    ingredient_section: Option<String>,
    step_section: Option<String>,
    ingredients: Vec<IngredientLine>,
    steps: Vec<StepEntry>,
    notes: Vec<String>,
    times: TimeFields,
}

impl Assembly {
    fn new() -> Self {
        Self {
            title: None,
            section: Section::Unknown,
            ingredient_section: None,
            step_section: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
            notes: Vec::new(),
            times: TimeFields::default(),
        }
    }

    fn enter(&mut self, section: Section) {
        if section != Section::Ingredients {
            self.ingredient_section = None;
        }
        self.section = section;
    }

    fn add_note(&mut self, text: &str) {
        let note = normalize_note_text(text);
        if !note.is_empty() {
            self.notes.push(note);
        }
    }

    /// Explicitly numbered steps always start a new entry; others may continue the last one
    fn add_step(&mut self, raw: &str) {
        let numbered = has_step_number(raw);
        let text = strip_step_number(raw);
        if text.is_empty() || is_ocr_artifact_line(&text) {
            return;
        }
        let section = self.step_section.clone();

        if !numbered {
            if let Some(last) = self.steps.last_mut() {
                if last.section == section && looks_like_step_continuation(&last.text, &text) {
                    last.text = clean_text(&format!("{} {}", last.text, text));
                    return;
                }
            }
        }
        self.steps.push(StepEntry { text, section });
    }

    /// Stored as cleaned text; parenthesis repair runs once continuations are merged
    fn add_ingredient(&mut self, raw: &str) {
        let text = clean_text(&crate::normalize::strip_bullets(raw));
        if should_drop_ingredient(&text) {
            debug!("Assembler: dropping ingredient candidate '{}'", text);
            return;
        }
        let section = self.ingredient_section.clone();

        if let Some(last) = self.ingredients.last_mut() {
            if last.section == section && looks_like_ingredient_continuation(&last.text, &text) {
                last.text = clean_text(&format!("{} {}", last.text, text));
                return;
            }
        }
        self.ingredients.push(IngredientLine { text, section });
    }

    fn apply_metadata(&mut self, text: &str) -> bool {
        let Some(metadata) = extract_metadata_line(text) else {
            return false;
        };
        if metadata.yields.is_some() {
            self.times.yields = metadata.yields;
        }
        if metadata.total_minutes.is_some() {
            self.times.total = metadata.total_minutes;
        }
        if metadata.prep_minutes.is_some() {
            self.times.prep = metadata.prep_minutes;
        }
        if metadata.cook_minutes.is_some() {
            self.times.cook = metadata.cook_minutes;
        }
        true
    }

    fn handle_header(&mut self, text: &str) {
        match header_section(text) {
            Some(SectionKind::Ingredients) => {
                self.enter(Section::Ingredients);
                self.ingredient_section = None;
                return;
            }
            Some(SectionKind::Steps) => {
                self.enter(Section::Steps);
                self.step_section = None;
                return;
            }
            Some(SectionKind::Notes) => {
                self.enter(Section::Notes);
                return;
            }
            None => {}
        }

        if looks_like_subsection_header(text) {
            let name = clean_text(text.trim_end_matches(':'));
            match self.section {
                Section::Steps => self.step_section = Some(name),
                Section::Notes => self.notes.push(text.to_string()),
                _ => {
                    self.enter(Section::Ingredients);
                    self.ingredient_section = Some(name);
                }
            }
            return;
        }

        // Plain ingredient lines mislabeled as headers ("Butter, for the pan")
        if self.section == Section::Ingredients {
            if looks_like_headerless_instruction(text) {
                self.enter(Section::Steps);
                self.add_step(text);
            } else {
                self.add_ingredient(text);
            }
        }
    }

    fn handle_ingredient(&mut self, text: &str) {
        match self.section {
            Section::Notes if looks_like_step_fragment(text) => {
                self.enter(Section::Steps);
                self.add_step(text);
            }
            Section::Ingredients if looks_like_headerless_instruction(text) => {
                self.enter(Section::Steps);
                self.add_step(text);
            }
            Section::Steps if !looks_like_ingredient_line(text) => self.add_step(text),
            _ => {
                self.enter(Section::Ingredients);
                self.add_ingredient(text);
            }
        }
    }

    fn handle_step(&mut self, text: &str) {
        self.enter(Section::Steps);
        for step in split_numbered_steps(text) {
            self.add_step(&step);
        }
    }

    fn handle_note(&mut self, text: &str) {
        if looks_like_step_fragment(text) {
            self.enter(Section::Steps);
            self.add_step(text);
        } else {
            self.enter(Section::Notes);
            self.add_note(text);
        }
    }

    fn consume(&mut self, text: &str, label: Label) {
        if self.apply_metadata(text) || is_ocr_artifact_line(text) {
            return;
        }

        if let Some(remainder) = extract_tips_remainder(text) {
            self.enter(Section::Notes);
            self.add_note(&remainder);
            return;
        }

        if self.section == Section::Notes
            && matches!(label, Label::Ingredient | Label::Step | Label::Note)
            && looks_like_note_fragment(text)
        {
            self.add_note(text);
            return;
        }

        match label {
            Label::Title if self.title.is_none() => {
                if looks_like_recipe_title(text) {
                    self.title = Some(text.to_string());
                } else {
                    self.notes.push(text.to_string());
                }
            }
            Label::Title | Label::Junk => {}
            Label::Header => self.handle_header(text),
            Label::Ingredient => self.handle_ingredient(text),
            Label::Step => self.handle_step(text),
            Label::Note => self.handle_note(text),
        }
    }

    /// Title from the labeled lines, then any title-shaped line, then a title-shaped note
    fn resolve_title(&mut self, lines: &[LabeledLine]) -> Option<String> {
        if let Some(title) = self.title.take() {
            return Some(title);
        }

        let candidate = |text: &str| looks_like_recipe_title(text) && title_word_count(text) >= 2;

        let from_lines = lines
            .iter()
            .filter(|line| !matches!(line.label, Label::Junk | Label::Header))
            .map(|line| clean_text(line.text()))
            .find(|text| candidate(text));
        if from_lines.is_some() {
            return from_lines;
        }

        let position = self.notes.iter().position(|note| candidate(note))?;
        Some(clean_text(&self.notes.remove(position)))
    }

    fn finish(mut self, lines: &[LabeledLine], metadata: &SourceMetadata) -> RecipeDraft {
        let title = self
            .resolve_title(lines)
            .or_else(|| metadata.title.clone().filter(|t| !t.trim().is_empty()));

        if let Some(title) = &title {
            let key = title.to_lowercase();
            self.notes.retain(|note| clean_text(note).to_lowercase() != key);
        }

        let mut ingredients: Vec<IngredientLine> = self
            .ingredients
            .into_iter()
            .filter_map(|entry| {
                sanitize_ingredient(&entry.text).map(|text| IngredientLine {
                    text,
                    section: entry.section,
                })
            })
            .collect();
        let steps: Vec<String> = self.steps.into_iter().map(|step| step.text).collect();
        split_trailing_group(&mut ingredients, &steps);

        let times = self.times;
        let total_minutes = times
            .total
            .or(match (times.prep, times.cook) {
                (Some(prep), Some(cook)) => Some(prep.saturating_add(cook)),
                (prep, cook) => cook.or(prep),
            })
            .or(metadata.total_minutes);

        let source_title = metadata.source_title.clone().or_else(|| {
            metadata
                .source_url
                .as_deref()
                .and_then(source_title_from_url)
        });

        RecipeDraft {
            title,
            ingredients,
            steps,
            notes: self.notes,
            yields: times.yields.or_else(|| metadata.yields.clone()),
            total_minutes,
            source_url: metadata.source_url.clone(),
            source_title,
            image_url: metadata.image_url.clone(),
        }
    }
}

/// Marker line such as `For the sauce` or `To serve` inside a flat ingredient list
fn trailing_group_name(text: &str) -> Option<&'static str> {
    let lowered = clean_text(text).to_lowercase();
    let marker = PARENTHETICAL.replace_all(&lowered, "");
    let marker = marker
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let marker = marker.trim_matches(|c: char| " :;,-".contains(c));
    match marker {
        "sauce" | "for sauce" | "for the sauce" => Some("Sauce"),
        "for serving" | "to serve" | "for garnish" => Some("For Serving"),
        _ => None,
    }
}

/// Group a flat list behind a "For the sauce" style marker when the steps mention a sauce
fn split_trailing_group(ingredients: &mut Vec<IngredientLine>, steps: &[String]) {
    if ingredients.len() < MIN_INGREDIENTS_FOR_GROUP_SPLIT
        || ingredients.iter().any(|item| item.section.is_some())
    {
        return;
    }
    let step_text = steps.join(" ").to_lowercase();
    if !SAUCE_WORD.is_match(&step_text) {
        return;
    }

    let last_candidate = ingredients.len() - 2;
    let Some((marker_idx, name)) = ingredients[..last_candidate]
        .iter()
        .enumerate()
        .find_map(|(idx, item)| trailing_group_name(&item.text).map(|name| (idx, name)))
    else {
        return;
    };
    let split_index = marker_idx + 1;
    if split_index < 2 || ingredients.len() - split_index < 2 {
        return;
    }

    debug!("Assembler: grouping trailing ingredients under '{}'", name);
    ingredients.remove(marker_idx);
    for item in ingredients.iter_mut().skip(marker_idx) {
        item.section = Some(name.to_string());
    }
}

/// Build a draft from labeled lines; never fails, missing parts stay empty
pub fn assemble(lines: &[LabeledLine], metadata: &SourceMetadata) -> RecipeDraft {
    let mut assembly = Assembly::new();
    for line in lines {
        let text = clean_text(line.text());
        if text.is_empty() {
            continue;
        }
        assembly.consume(&text, line.label);
    }

    let draft = assembly.finish(lines, metadata);
    debug!(
        "Assembled draft: title={:?}, {} ingredients, {} steps, {} notes",
        draft.title,
        draft.ingredients.len(),
        draft.steps.len(),
        draft.notes.len()
    );
    draft
}

/// [`assemble`], then reject drafts without a title, ingredients and steps
pub fn assemble_validated(
    lines: &[LabeledLine],
    metadata: &SourceMetadata,
) -> Result<RecipeDraft, ExtractError> {
    let draft = assemble(lines, metadata);
    let missing = draft.missing_parts();
    if missing.is_empty() {
        Ok(draft)
    } else {
        Err(ExtractError::InsufficientStructure { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(rows: &[(&str, Label)]) -> Vec<LabeledLine> {
        rows.iter()
            .map(|(text, label)| LabeledLine::new(*text, *label, 0.9))
            .collect()
    }

    fn ingredient_texts(draft: &RecipeDraft) -> Vec<&str> {
        draft.ingredients.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn test_basic_recipe() {
        let lines = labeled(&[
            ("Banana Bread", Label::Title),
            ("Serves 8", Label::Note),
            ("Prep time: 15 minutes", Label::Note),
            ("Cook time: 1 hour", Label::Note),
            ("Ingredients", Label::Header),
            ("3 ripe bananas", Label::Ingredient),
            ("• 2 cups flour ((sifted))", Label::Ingredient),
            ("Instructions", Label::Header),
            ("1. Mash the bananas.", Label::Step),
            ("2. Stir in the flour.", Label::Step),
            ("Notes", Label::Header),
            ("Use very ripe bananas for more flavor.", Label::Note),
            ("share on facebook", Label::Junk),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());

        assert_eq!(draft.title.as_deref(), Some("Banana Bread"));
        assert_eq!(ingredient_texts(&draft), vec!["3 ripe bananas", "2 cups flour (sifted)"]);
        assert_eq!(draft.steps, vec!["Mash the bananas.", "Stir in the flour."]);
        assert_eq!(draft.notes, vec!["Use very ripe bananas for more flavor."]);
        assert_eq!(draft.yields.as_deref(), Some("8 servings"));
        assert_eq!(draft.total_minutes, Some(75));
        assert!(draft.is_valid());
    }

    #[test]
    fn test_huge_prep_and_cook_saturate() {
        let lines = labeled(&[
            ("Country Ham", Label::Title),
            ("Prep time: 4000000000 minutes", Label::Note),
            ("Cook time: 1000000000 minutes", Label::Note),
            ("Ingredients", Label::Header),
            ("1 fresh ham", Label::Ingredient),
            ("Instructions", Label::Header),
            ("Cure the ham in salt.", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(draft.total_minutes, Some(u32::MAX));
    }

    #[test]
    fn test_ingredient_sections() {
        let lines = labeled(&[
            ("Fruit Tart", Label::Title),
            ("For the crust:", Label::Header),
            ("1 cup flour", Label::Ingredient),
            ("For the filling:", Label::Header),
            ("2 cups berries", Label::Ingredient),
            ("Method", Label::Header),
            ("Bake the crust.", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(draft.ingredients[0].section.as_deref(), Some("For the crust"));
        assert_eq!(draft.ingredients[1].section.as_deref(), Some("For the filling"));
        assert_eq!(draft.steps, vec!["Bake the crust."]);
    }

    #[test]
    fn test_wrapped_lines_merge() {
        let lines = labeled(&[
            ("Cheese Toast", Label::Title),
            ("Ingredients", Label::Header),
            ("1 cup cheese (such as", Label::Ingredient),
            ("cheddar)", Label::Ingredient),
            ("Salt", Label::Ingredient),
            ("to taste", Label::Ingredient),
            ("Instructions", Label::Header),
            ("Spread the cheese over the bread,", Label::Step),
            ("then toast until bubbling.", Label::Step),
            ("3. Slice and serve", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(
            ingredient_texts(&draft),
            vec!["1 cup cheese (such as cheddar)", "Salt to taste"]
        );
        assert_eq!(
            draft.steps,
            vec![
                "Spread the cheese over the bread, then toast until bubbling.",
                "Slice and serve",
            ]
        );
    }

    #[test]
    fn test_numbered_steps_are_never_merged() {
        let lines = labeled(&[
            ("Cookies", Label::Title),
            ("1 cup butter", Label::Ingredient),
            ("1. Preheat oven to 350", Label::Step),
            ("2. Cream butter and sugar", Label::Step),
            ("3. Stir in flour and chips", Label::Step),
            ("4. Bake 10 to 12 minutes", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(draft.steps.len(), 4);
    }

    #[test]
    fn test_collapsed_numbered_step_line_is_split() {
        let lines = labeled(&[
            ("Cookies", Label::Title),
            ("1 cup butter", Label::Ingredient),
            (
                "1. Preheat oven. 2. Cream butter. 3. Add flour. 4. Bake.",
                Label::Step,
            ),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(
            draft.steps,
            vec!["Preheat oven.", "Cream butter.", "Add flour.", "Bake."]
        );
    }

    #[test]
    fn test_tips_block_and_artifacts() {
        let lines = labeled(&[
            ("Garlic Noodles", Label::Title),
            ("8 oz noodles", Label::Ingredient),
            ("Toss the noodles with garlic butter.", Label::Step),
            ("Created by TemplateLab", Label::Junk),
            ("Tips & Variations: add chili flakes for heat", Label::Note),
            ("Optional: top with scallions", Label::Ingredient),
            ("~", Label::Note),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(
            draft.notes,
            vec!["add chili flakes for heat", "Optional: top with scallions"]
        );
        assert_eq!(ingredient_texts(&draft), vec!["8 oz noodles"]);
    }

    #[test]
    fn test_headerless_instruction_in_ingredients_switches_to_steps() {
        let lines = labeled(&[
            ("Simple Rice", Label::Title),
            ("1 cup rice", Label::Ingredient),
            ("Drain the rice well", Label::Ingredient),
            ("Simmer for 18 minutes", Label::Ingredient),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(ingredient_texts(&draft), vec!["1 cup rice"]);
        assert_eq!(draft.steps, vec!["Drain the rice well", "Simmer for 18 minutes"]);
    }

    #[test]
    fn test_title_fallbacks() {
        let lines = labeled(&[
            ("Ingredients", Label::Header),
            ("Roasted Carrot Soup", Label::Note),
            ("4 carrots", Label::Ingredient),
            ("Roast the carrots.", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(draft.title.as_deref(), Some("Roasted Carrot Soup"));
        assert!(draft.notes.is_empty());

        let untitled = labeled(&[("4 carrots", Label::Ingredient), ("Roast them.", Label::Step)]);
        let metadata = SourceMetadata {
            title: Some("Carrots".to_string()),
            source_url: Some("https://food.example.com/carrots".to_string()),
            ..Default::default()
        };
        let draft = assemble(&untitled, &metadata);
        assert_eq!(draft.title.as_deref(), Some("Carrots"));
        assert_eq!(draft.source_title.as_deref(), Some("food.example.com"));
    }

    #[test]
    fn test_trailing_sauce_group() {
        let lines = labeled(&[
            ("Dumplings", Label::Title),
            ("2 cups flour", Label::Ingredient),
            ("1 cup water", Label::Ingredient),
            ("1 lb pork", Label::Ingredient),
            ("For the sauce", Label::Ingredient),
            ("2 tbsp soy sauce", Label::Ingredient),
            ("1 tbsp vinegar", Label::Ingredient),
            ("Fold the dumplings and serve with the sauce.", Label::Step),
        ]);
        let draft = assemble(&lines, &SourceMetadata::default());
        assert_eq!(draft.ingredients.len(), 5);
        assert_eq!(draft.ingredients[2].section, None);
        assert_eq!(draft.ingredients[3].section.as_deref(), Some("Sauce"));
        assert_eq!(draft.ingredients[4].section.as_deref(), Some("Sauce"));
    }

    #[test]
    fn test_validation_reports_missing_parts() {
        let lines = labeled(&[("Just A Title Here", Label::Title)]);
        let result = assemble_validated(&lines, &SourceMetadata::default());
        match result {
            Err(ExtractError::InsufficientStructure { missing }) => {
                assert_eq!(missing, vec!["ingredients", "steps"]);
            }
            other => panic!("expected insufficient structure, got {other:?}"),
        }
    }
}
