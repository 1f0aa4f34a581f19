use super::{Observation, TextRecognizer};
use crate::error::ExtractError;
use crate::model::Region;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Google Cloud Vision `TEXT_DETECTION`, one observation per detected word
pub struct GoogleVisionRecognizer {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleVisionRecognizer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Reads the key from `GOOGLE_API_KEY`
    pub fn from_env() -> Result<Self, ExtractError> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
            ExtractError::Recognizer("GOOGLE_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextRecognizer for GoogleVisionRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<Observation>, ExtractError> {
        let request_body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        debug!("Sending OCR request to Google Vision API");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header("Accept-Encoding", "identity")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ExtractError::Recognizer(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Recognizer(format!(
                "Google Vision API error ({}): {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Recognizer(e.to_string()))?;

        let observations = parse_annotations(&body);
        debug!("Google Vision returned {} word observations", observations.len());
        Ok(observations)
    }
}

/// `textAnnotations[0]` is the whole page; the rest are words with bounding polygons
pub fn parse_annotations(body: &Value) -> Vec<Observation> {
    let Some(annotations) = body["responses"][0]["textAnnotations"].as_array() else {
        return Vec::new();
    };

    annotations
        .iter()
        .skip(1)
        .filter_map(|annotation| {
            let text = annotation["description"].as_str()?.trim();
            if text.is_empty() {
                return None;
            }
            let vertices = annotation["boundingPoly"]["vertices"].as_array()?;
            let points: Vec<(f32, f32)> = vertices
                .iter()
                .map(|v| {
                    (
                        v["x"].as_f64().unwrap_or(0.0) as f32,
                        v["y"].as_f64().unwrap_or(0.0) as f32,
                    )
                })
                .collect();
            if points.is_empty() {
                return None;
            }

            let min_x = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
            let max_x = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
            let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
            let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

            Some(Observation::new(
                text,
                annotation["confidence"].as_f64().unwrap_or(1.0) as f32,
                Region {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x,
                    height: max_y - min_y,
                },
            ))
        })
        .collect()
}
