use super::json_repair::parse_json_payloads;
use super::{
    resolve_image_url, source_title_from_url, AcquiredSource, ParsingContext, SourceStrategy,
};
use crate::assembler::patterns::split_numbered_steps;
use crate::assembler::sanitize::repair_parentheses;
use crate::duration::parse_duration_minutes;
use crate::model::SourceMetadata;
use crate::normalize::{collapse_whitespace, decode_entities, strip_tags};
use log::debug;
use once_cell::sync::Lazy;
use scraper::Selector;
use serde_json::{Map, Value};
use std::collections::HashSet;

static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").unwrap());

/// Longest section name that still gets its own `"<name>:"` line
const MAX_SECTION_NAME_WORDS: usize = 7;

pub struct JsonLdStrategy;

impl SourceStrategy for JsonLdStrategy {
    fn name(&self) -> &'static str {
        "json_ld"
    }

    fn acquire(&self, context: &ParsingContext) -> Option<AcquiredSource> {
        let mut nodes: Vec<Map<String, Value>> = Vec::new();
        let mut block_count = 0;

        for script in context.document.select(&JSON_LD_SELECTOR) {
            let raw: String = script.text().collect();
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            block_count += 1;

            // Entity-decoding before parsing can break valid payloads, so it is only a retry
            let mut payloads = parse_json_payloads(raw);
            if payloads.is_empty() {
                let decoded = decode_entities(raw);
                if decoded.trim() != raw {
                    payloads = parse_json_payloads(&decoded);
                }
            }

            for payload in &payloads {
                collect_recipe_nodes(payload, &mut nodes);
            }
        }

        debug!(
            "JSON-LD: {} blocks, {} recipe candidates",
            block_count,
            nodes.len()
        );

        let mut best: Option<(usize, &Map<String, Value>)> = None;
        for node in &nodes {
            let score = score_recipe(node);
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, node));
            }
        }
        let (_, recipe) = best?;

        let title = recipe_title(recipe);
        let ingredients = extract_ingredients(recipe);
        let instructions = extract_instructions(recipe);
        if ingredients.is_empty() && instructions.is_empty() {
            debug!("JSON-LD: best recipe node has no ingredients or instructions");
            return None;
        }

        let mut lines = Vec::with_capacity(ingredients.len() + instructions.len() + 3);
        if !title.is_empty() {
            lines.push(title.clone());
        }
        if !ingredients.is_empty() {
            lines.push("Ingredients".to_string());
            lines.extend(ingredients);
        }
        if !instructions.is_empty() {
            lines.push("Instructions".to_string());
            lines.extend(instructions);
        }

        let source_url = context.source_url.clone();
        let metadata = SourceMetadata {
            title: (!title.is_empty()).then_some(title),
            yields: recipe.get("recipeYield").and_then(first_yield),
            total_minutes: total_minutes(recipe),
            image_url: recipe
                .get("image")
                .and_then(|image| first_image_url(image, source_url.as_deref())),
            source_title: source_url.as_deref().and_then(source_title_from_url),
            source_url,
            method: Some(self.name().to_string()),
        };

        Some(AcquiredSource::new(lines, metadata))
    }
}

/// `@type` match: `"Recipe"`, `"http://schema.org/Recipe"`, `["Recipe", "NewsArticle"]`
pub fn is_recipe_type(type_value: &Value) -> bool {
    match type_value {
        Value::String(name) => name.to_lowercase().contains("recipe"),
        Value::Array(items) => items.iter().any(is_recipe_type),
        _ => false,
    }
}

/// Collect every recipe-typed object, walking through `@graph`, lists and nested entities
pub fn collect_recipe_nodes(node: &Value, out: &mut Vec<Map<String, Value>>) {
    match node {
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_recipe_type) {
                out.push(map.clone());
            }
            for child in map.values() {
                collect_recipe_nodes(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_recipe_nodes(item, out);
            }
        }
        _ => {}
    }
}

fn clean_field(raw: &str) -> String {
    collapse_whitespace(&strip_tags(&decode_entities(raw)))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// First non-blank value among `keys`
fn first_present<'a>(recipe: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| recipe.get(*key))
        .find(|value| !is_blank(value))
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(clean_field(text)).filter(|t| !t.is_empty()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn unique_preserve(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

fn recipe_title(recipe: &Map<String, Value>) -> String {
    ["name", "headline"]
        .iter()
        .filter_map(|key| recipe.get(*key))
        .find_map(first_text)
        .unwrap_or_default()
}

fn extract_ingredients(recipe: &Map<String, Value>) -> Vec<String> {
    let Some(value) = first_present(recipe, &["recipeIngredient", "ingredients"]) else {
        return Vec::new();
    };

    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let lines = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.as_str()),
            Value::Object(map) => map.get("text").and_then(Value::as_str),
            _ => None,
        })
        .map(|text| repair_parentheses(&clean_field(text)))
        .filter(|text| !text.is_empty())
        .collect();

    unique_preserve(lines)
}

fn extract_instructions(recipe: &Map<String, Value>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(value) = first_present(recipe, &["recipeInstructions", "instructions"]) {
        walk_instructions(value, &mut out);
    }
    unique_preserve(out)
}

/// Visit the instruction tree: plain strings, step objects and named sections
fn walk_instructions(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::String(text) => out.extend(split_numbered_steps(&clean_field(text))),
        Value::Array(items) => {
            for item in items {
                walk_instructions(item, out);
            }
        }
        Value::Object(map) => {
            let list = map.get("itemListElement").filter(|list| !is_blank(list));
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .map(clean_field)
                .unwrap_or_default();
            let section_name = name.trim_end_matches(':').trim();

            if list.is_some()
                && !section_name.is_empty()
                && section_name.split_whitespace().count() <= MAX_SECTION_NAME_WORDS
            {
                out.push(format!("{section_name}:"));
            }

            let text = map
                .get("text")
                .and_then(Value::as_str)
                .map(clean_field)
                .filter(|text| !text.is_empty());
            if let Some(text) = &text {
                out.extend(split_numbered_steps(text));
            }

            if let Some(list) = list {
                walk_instructions(list, out);
                return;
            }

            // HowToStep carrying only a name
            if text.is_none() && !name.is_empty() {
                out.extend(split_numbered_steps(&name));
            }

            for key in ["steps", "instructions", "recipeInstructions"] {
                if let Some(child) = map.get(key) {
                    walk_instructions(child, out);
                }
            }
        }
        _ => {}
    }
}

/// `3 × has title + ingredient count + 2 × step count`
fn score_recipe(recipe: &Map<String, Value>) -> usize {
    let title = if recipe_title(recipe).is_empty() { 0 } else { 3 };
    title + extract_ingredients(recipe).len() + 2 * extract_instructions(recipe).len()
}

fn first_yield(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(clean_field(text)).filter(|t| !t.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => items.iter().find_map(first_yield),
        _ => None,
    }
}

fn duration_field(value: &Value) -> Option<u32> {
    match value {
        Value::String(text) => parse_duration_minutes(text),
        Value::Number(number) => number
            .as_u64()
            .and_then(|minutes| u32::try_from(minutes).ok())
            .filter(|minutes| *minutes > 0),
        Value::Array(items) => items.iter().find_map(duration_field),
        _ => None,
    }
}

/// `totalTime`, else prep + cook, else whichever of the two exists
fn total_minutes(recipe: &Map<String, Value>) -> Option<u32> {
    let field = |key: &str| recipe.get(key).and_then(duration_field);
    field("totalTime").or_else(|| match (field("prepTime"), field("cookTime")) {
        (Some(prep), Some(cook)) => Some(prep.saturating_add(cook)),
        (prep, cook) => prep.or(cook),
    })
}

fn image_candidates(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => out.push(url.clone()),
        Value::Array(items) => {
            for item in items {
                image_candidates(item, out);
            }
        }
        Value::Object(map) => {
            for key in ["url", "contentUrl", "@id"] {
                if let Some(child) = map.get(key) {
                    image_candidates(child, out);
                }
            }
        }
        _ => {}
    }
}

fn first_image_url(value: &Value, base: Option<&str>) -> Option<String> {
    let mut candidates = Vec::new();
    image_candidates(value, &mut candidates);
    candidates
        .iter()
        .find_map(|candidate| resolve_image_url(candidate, base))
}
