use super::{
    resolve_image_url, source_title_from_url, AcquiredSource, ParsingContext, SourceStrategy,
};
use crate::assembler::patterns::split_numbered_steps;
use crate::assembler::sanitize::repair_parentheses;
use crate::duration::parse_duration_minutes;
use crate::model::SourceMetadata;
use crate::normalize::collapse_whitespace;
use log::debug;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

static ITEMSCOPE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[itemscope]").unwrap());
static LIST_ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

pub struct MicroDataStrategy;

impl MicroDataStrategy {
    fn find_recipe_container<'a>(&self, document: &'a scraper::Html) -> Option<ElementRef<'a>> {
        // Only itemprops scoped to a Recipe item are trusted; page-wide "name" picks up site chrome
        document.select(&ITEMSCOPE_SELECTOR).find(|element| {
            element.value().attr("itemtype").is_some_and(|itemtype| {
                itemtype.contains("schema.org/Recipe")
                    || itemtype.contains("data-vocabulary.org/Recipe")
            })
        })
    }

    fn select_prop<'a>(&self, root: ElementRef<'a>, prop: &str) -> Vec<ElementRef<'a>> {
        match Selector::parse(&format!("[itemprop='{}']", prop)) {
            Ok(selector) => root.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn get_itemprop(&self, root: ElementRef, prop: &str) -> Option<String> {
        self.select_prop(root, prop)
            .into_iter()
            .map(itemprop_value)
            .find(|value| !value.is_empty())
    }

    fn get_itemprop_list(&self, root: ElementRef, prop: &str) -> Vec<String> {
        self.select_prop(root, prop)
            .into_iter()
            .map(itemprop_value)
            .filter(|value| !value.is_empty())
            .collect()
    }

    fn instructions(&self, root: ElementRef) -> Vec<String> {
        let mut steps = Vec::new();
        for element in self.select_prop(root, "recipeInstructions") {
            let items: Vec<String> = element
                .select(&LIST_ITEM_SELECTOR)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect();
            if items.is_empty() {
                steps.extend(split_numbered_steps(&itemprop_value(element)));
            } else {
                steps.extend(items);
            }
        }
        steps.retain(|step| !step.is_empty());
        steps
    }
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Machine-readable attribute first (`content`, `datetime`), then visible text
fn itemprop_value(element: ElementRef) -> String {
    let value = element.value();
    value
        .attr("content")
        .or_else(|| value.attr("datetime"))
        .map(collapse_whitespace)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| element_text(element))
}

impl SourceStrategy for MicroDataStrategy {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn acquire(&self, context: &ParsingContext) -> Option<AcquiredSource> {
        let Some(container) = self.find_recipe_container(&context.document) else {
            debug!("MicroData: no Recipe container");
            return None;
        };

        let title = self.get_itemprop(container, "name").unwrap_or_default();
        let mut ingredients = self.get_itemprop_list(container, "recipeIngredient");
        if ingredients.is_empty() {
            ingredients = self.get_itemprop_list(container, "ingredients");
        }
        let ingredients: Vec<String> = ingredients
            .iter()
            .map(|line| repair_parentheses(line))
            .filter(|line| !line.is_empty())
            .collect();
        let instructions = self.instructions(container);

        if ingredients.is_empty() && instructions.is_empty() {
            debug!("MicroData: Recipe container has no ingredients or instructions");
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

        let minutes = |prop: &str| {
            self.get_itemprop(container, prop)
                .and_then(|raw| parse_duration_minutes(&raw))
        };
        let total_minutes = minutes("totalTime").or_else(|| match (minutes("prepTime"), minutes("cookTime")) {
            (Some(prep), Some(cook)) => Some(prep.saturating_add(cook)),
            (prep, cook) => prep.or(cook),
        });

        let source_url = context.source_url.clone();
        let image_url = self
            .select_prop(container, "image")
            .into_iter()
            .filter_map(|element| {
                let value = element.value();
                value
                    .attr("src")
                    .or_else(|| value.attr("content"))
                    .or_else(|| value.attr("href"))
                    .map(str::to_string)
            })
            .find_map(|raw| resolve_image_url(&raw, source_url.as_deref()));

        let metadata = SourceMetadata {
            title: (!title.is_empty()).then_some(title),
            yields: self.get_itemprop(container, "recipeYield"),
            total_minutes,
            image_url,
            source_title: source_url.as_deref().and_then(source_title_from_url),
            source_url,
            method: Some(self.name().to_string()),
        };

        Some(AcquiredSource::new(lines, metadata))
    }
}
