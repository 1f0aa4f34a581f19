use super::{EngineOutput, SchemaEngine};
use crate::error::ToolingError;
use crate::model::{IngredientLine, Label, RecipeDraft};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

#[derive(Serialize)]
struct BridgeRequest<'a> {
    lines: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeResponse {
    labels: Vec<String>,
    #[serde(default)]
    confidences: Option<Vec<f32>>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    ingredient_section_names: Vec<Option<String>>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    yields: Option<String>,
    #[serde(default)]
    total_minutes: Option<u32>,
}

/// External implementation driven over stdin/stdout.
///
/// The process receives `{"lines": [...]}` and must print one JSON object with
/// `labels` (one per line) plus the assembled `ingredients`, `steps` and `notes`.
pub struct CommandEngine {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// Split a shell-like command line on whitespace
    pub fn from_command_line(name: impl Into<String>, command_line: &str) -> Result<Self, ToolingError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ToolingError::Bridge("empty reference command".to_string()))?;
        Ok(Self::new(name, program, parts.collect()))
    }

    fn invoke(&self, lines: &[String]) -> Result<Vec<u8>, ToolingError> {
        let payload = serde_json::to_vec(&BridgeRequest { lines })
            .map_err(|e| ToolingError::Bridge(format!("failed to encode request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolingError::Bridge(format!("failed to start '{}': {e}", self.program)))?;

        // stdin is written while stdout and stderr are drained
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(&payload)));

        let output = child
            .wait_with_output()
            .map_err(|e| ToolingError::Bridge(format!("failed to read output: {e}")))?;
        let written = match writer {
            Some(handle) => handle
                .join()
                .map_err(|_| ToolingError::Bridge("request writer panicked".to_string()))?,
            None => Ok(()),
        };
        if !output.status.success() {
            return Err(ToolingError::Bridge(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|e| ToolingError::Bridge(format!("failed to write request: {e}")))?;
        Ok(output.stdout)
    }
}

impl SchemaEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, lines: &[String]) -> Result<EngineOutput, ToolingError> {
        let stdout = self.invoke(lines)?;
        let response: BridgeResponse = serde_json::from_slice(&stdout)
            .map_err(|e| ToolingError::Bridge(format!("invalid response JSON: {e}")))?;

        if response.labels.len() != lines.len() {
            return Err(ToolingError::Bridge(format!(
                "expected {} labels, got {}",
                lines.len(),
                response.labels.len()
            )));
        }
        let labels = response
            .labels
            .iter()
            .map(|raw| raw.parse::<Label>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ToolingError::Bridge(e.to_string()))?;
        debug!("{} labeled {} lines", self.name, labels.len());

        let ingredients = response
            .ingredients
            .into_iter()
            .enumerate()
            .map(|(idx, text)| IngredientLine {
                text,
                section: response
                    .ingredient_section_names
                    .get(idx)
                    .cloned()
                    .flatten(),
            })
            .collect();

        Ok(EngineOutput {
            labels,
            confidences: response.confidences,
            draft: RecipeDraft {
                title: response.title.filter(|title| !title.trim().is_empty()),
                ingredients,
                steps: response.steps,
                notes: response.notes,
                yields: response.yields.filter(|yields| !yields.trim().is_empty()),
                total_minutes: response.total_minutes,
                ..Default::default()
            },
        })
    }
}
