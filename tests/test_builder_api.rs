mod common;

use common::{fixture_model, recipe_page};
use recipe_schema::{ExtractError, InputSource, PipelineConfig, RecipeExtractor};
use std::time::Duration;

const SHRIMP_CAPTION: &str = "Garlic Butter Shrimp
Ingredients
1 lb shrimp, peeled
3 cloves garlic, minced
2 tbsp butter
Instructions
Melt the butter in a large skillet.
Add the garlic and shrimp and cook for 4 minutes.";

#[tokio::test]
async fn test_builder_with_text() {
    let draft = RecipeExtractor::builder()
        .text(SHRIMP_CAPTION)
        .model(fixture_model())
        .config(PipelineConfig::default())
        .build()
        .await
        .unwrap();

    assert_eq!(draft.title.as_deref(), Some("Garlic Butter Shrimp"));
    assert_eq!(draft.ingredients.len(), 3);
    assert_eq!(draft.ingredients[0].text, "1 lb shrimp, peeled");
    assert_eq!(draft.steps.len(), 2);
    assert!(draft.steps[1].contains("cook for 4 minutes"));
    assert!(draft.source_url.is_none());
}

#[tokio::test]
async fn test_builder_with_url() {
    let mut server = mockito::Server::new_async().await;
    let page = recipe_page(
        r#"{
            "@context": "https://schema.org",
            "@type": "Recipe",
            "name": "Sheet Pan Gnocchi",
            "recipeYield": "4 servings",
            "totalTime": "PT30M",
            "image": "/img/gnocchi.jpg",
            "recipeIngredient": ["1 lb shelf-stable gnocchi", "2 cups cherry tomatoes", "2 tbsp olive oil"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Heat the oven to 450°F."},
                {"@type": "HowToStep", "text": "Toss everything on a sheet pan and roast for 20 minutes."}
            ]
        }"#,
    );
    let mock = server
        .mock("GET", "/gnocchi")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(page)
        .create();

    let url = format!("{}/gnocchi", server.url());
    let draft = RecipeExtractor::builder()
        .url(&url)
        .model(fixture_model())
        .config(PipelineConfig::default())
        .timeout(Duration::from_secs(10))
        .build()
        .await
        .unwrap();

    mock.assert();
    assert_eq!(draft.title.as_deref(), Some("Sheet Pan Gnocchi"));
    assert_eq!(draft.ingredients.len(), 3);
    assert_eq!(draft.steps.len(), 2);
    assert_eq!(draft.yields.as_deref(), Some("4 servings"));
    assert_eq!(draft.total_minutes, Some(30));
    assert_eq!(draft.source_url.as_deref(), Some(url.as_str()));
    let image = draft.image_url.unwrap();
    assert!(image.starts_with("http"), "image not absolute: {image}");
    assert!(image.ends_with("/img/gnocchi.jpg"));
}

#[tokio::test]
async fn test_builder_with_html_and_source_url() {
    let page = recipe_page(
        r#"{
            "@context": "https://schema.org",
            "@type": "Recipe",
            "name": "Miso Glazed Eggplant",
            "recipeIngredient": ["2 eggplants, halved", "3 tbsp white miso", "1 tbsp honey"],
            "recipeInstructions": "Score the eggplant halves. Brush with miso and honey, then roast until soft."
        }"#,
    );
    let draft = RecipeExtractor::builder()
        .html(page)
        .source_url("https://www.example.com/miso-eggplant")
        .model(fixture_model())
        .config(PipelineConfig::default())
        .build()
        .await
        .unwrap();

    assert_eq!(draft.title.as_deref(), Some("Miso Glazed Eggplant"));
    assert_eq!(draft.ingredients.len(), 3);
    assert!(!draft.steps.is_empty());
    assert_eq!(
        draft.source_url.as_deref(),
        Some("https://www.example.com/miso-eggplant")
    );
}

#[tokio::test]
async fn test_extractor_is_reusable() {
    let extractor = RecipeExtractor::builder()
        .model(fixture_model())
        .config(PipelineConfig::default())
        .extractor()
        .unwrap();

    let first = extractor
        .extract(&InputSource::Text(SHRIMP_CAPTION.to_string()))
        .await
        .unwrap();
    let second = extractor
        .extract(&InputSource::Text(SHRIMP_CAPTION.to_string()))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_builder_without_source() {
    let result = RecipeExtractor::builder()
        .model(fixture_model())
        .config(PipelineConfig::default())
        .build()
        .await;
    assert!(matches!(result, Err(ExtractError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_builder_without_model() {
    let result = RecipeExtractor::builder()
        .text(SHRIMP_CAPTION)
        .config(PipelineConfig::default())
        .build()
        .await;
    assert!(matches!(result, Err(ExtractError::ModelUnavailable(_))));

    let result = RecipeExtractor::builder()
        .text(SHRIMP_CAPTION)
        .model_path("/nonexistent/line_classifier.json")
        .config(PipelineConfig::default())
        .build()
        .await;
    assert!(matches!(result, Err(ExtractError::ModelUnavailable(_))));
}

#[tokio::test]
async fn test_text_without_recipe_structure() {
    let result = RecipeExtractor::builder()
        .text("Weekend plans")
        .model(fixture_model())
        .config(PipelineConfig::default())
        .build()
        .await;

    match result {
        Err(ExtractError::InsufficientStructure { missing }) => {
            assert!(missing.contains(&"ingredients"));
            assert!(missing.contains(&"steps"));
        }
        other => panic!("expected InsufficientStructure, got {other:?}"),
    }
}
