//! JSON output formatter

use crate::models::Outline;
use crate::output::FormatError;

/// Format an outline as pretty-printed JSON
pub fn format_json(outline: &Outline) -> Result<String, FormatError> {
    serde_json::to_string_pretty(outline).map_err(FormatError::from)
}
