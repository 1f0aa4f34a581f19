//! Per-input acquisition.
//!
//! Every pipeline ends in an [`AcquiredSource`](crate::source::AcquiredSource): raw,
//! not yet normalized lines plus whatever metadata the input carried.

pub mod html;
pub mod image;
pub mod ocr_text;
pub mod text;
pub mod url;

use crate::error::ExtractError;

/// Split pasted text into raw lines, rejecting blank input
fn split_text(text: &str, what: &str) -> Result<Vec<String>, ExtractError> {
    if text.trim().is_empty() {
        return Err(ExtractError::InvalidRequest(format!("{what} cannot be empty")));
    }
    Ok(text.lines().map(str::to_string).collect())
}
