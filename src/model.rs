use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a raw input came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Recipe web page markup
    Html,
    /// Social caption or pasted plain text
    Text,
    /// Text recognized from a photograph
    Ocr,
}

/// One input unit handed to the acquirer
#[derive(Debug, Clone)]
pub struct RawSource {
    kind: SourceKind,
    body: String,
    source_url: Option<String>,
}

impl RawSource {
    pub fn new(kind: SourceKind, body: impl Into<String>, source_url: Option<String>) -> Self {
        Self {
            kind,
            body: body.into(),
            source_url,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }
}

/// Region of the page an OCR line was reconstructed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A normalized, non-empty text line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            region: None,
        }
    }
}

/// Closed label set assigned to every line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Title,
    Ingredient,
    Step,
    Note,
    Header,
    Junk,
}

impl Label {
    pub const ALL: [Label; 6] = [
        Label::Title,
        Label::Ingredient,
        Label::Step,
        Label::Note,
        Label::Header,
        Label::Junk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Title => "title",
            Label::Ingredient => "ingredient",
            Label::Step => "step",
            Label::Note => "note",
            Label::Header => "header",
            Label::Junk => "junk",
        }
    }

    /// Position of the label inside [`Label::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Label::Title => 0,
            Label::Ingredient => 1,
            Label::Step => 2,
            Label::Note => 3,
            Label::Header => 4,
            Label::Junk => 5,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Label::Title),
            "ingredient" => Ok(Label::Ingredient),
            "step" => Ok(Label::Step),
            "note" => Ok(Label::Note),
            "header" => Ok(Label::Header),
            "junk" => Ok(Label::Junk),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// A classified line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledLine {
    pub line: Line,
    pub label: Label,
    /// Softmax-normalized score of the winning label, in [0, 1]
    pub confidence: f32,
}

impl LabeledLine {
    pub fn new(text: impl Into<String>, label: Label, confidence: f32) -> Self {
        Self {
            line: Line::new(text),
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn text(&self) -> &str {
        &self.line.text
    }
}

/// One ingredient entry, optionally grouped under a section such as "Dough"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl IngredientLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section: None,
        }
    }
}

/// Best-effort metadata gathered while acquiring a source, before any line is classified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: Option<String>,
    pub yields: Option<String>,
    pub total_minutes: Option<u32>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub source_title: Option<String>,
    /// Which acquisition strategy produced the lines
    pub method: Option<String>,
}

/// Assembled recipe returned to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: Option<String>,
    pub ingredients: Vec<IngredientLine>,
    pub steps: Vec<String>,
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u32>,
    #[serde(rename = "sourceURL", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl RecipeDraft {
    /// Names of the required parts that are still empty
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self
            .title
            .as_deref()
            .map_or(true, |title| title.trim().is_empty())
        {
            missing.push("title");
        }
        if self.ingredients.is_empty() {
            missing.push("ingredients");
        }
        if self.steps.is_empty() {
            missing.push("steps");
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_parts().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_str() {
        for label in Label::ALL {
            assert_eq!(label.as_str().parse::<Label>().unwrap(), label);
            assert_eq!(Label::ALL[label.index()], label);
        }
        assert!("bad_label".parse::<Label>().is_err());
    }

    #[test]
    fn test_recipe_draft_json_field_names() {
        let draft = RecipeDraft {
            title: Some("Soup".to_string()),
            ingredients: vec![IngredientLine {
                text: "1 onion".to_string(),
                section: None,
            }],
            steps: vec!["Chop the onion.".to_string()],
            notes: vec![],
            yields: Some("4 servings".to_string()),
            total_minutes: Some(30),
            source_url: Some("https://example.com/soup".to_string()),
            source_title: Some("example.com".to_string()),
            image_url: None,
        };

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["title"], "Soup");
        assert_eq!(json["totalMinutes"], 30);
        assert_eq!(json["sourceURL"], "https://example.com/soup");
        assert_eq!(json["sourceTitle"], "example.com");
        assert!(json.get("imageURL").is_none());
        assert_eq!(json["ingredients"][0]["text"], "1 onion");
    }

    #[test]
    fn test_missing_parts() {
        let draft = RecipeDraft {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(draft.missing_parts(), vec!["title", "ingredients", "steps"]);
        assert!(!draft.is_valid());
    }
}
