#![allow(dead_code)]

use recipe_schema::dataset::{load_line_rows, DocFilter};
use recipe_schema::ClassifierModel;
use std::path::PathBuf;
use std::sync::Arc;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/recipe_schema")
}

/// Model fit on every labeled line of the fixture corpus
pub fn fixture_model() -> Arc<ClassifierModel> {
    let rows = load_line_rows(&fixtures_dir(), &DocFilter::default()).unwrap();
    let labeled: Vec<_> = rows
        .iter()
        .map(|row| (row.text.as_str(), row.gold_label().unwrap()))
        .collect();
    Arc::new(ClassifierModel::train(labeled, 1.0, 5))
}

pub fn recipe_page(json_ld: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Test Recipe</title>
    <script type="application/ld+json">{json_ld}</script>
</head>
<body><h1>Test Recipe</h1></body>
</html>"#
    )
}
