//! YAML output formatter

use crate::models::Outline;
use crate::output::FormatError;

/// Format an outline as YAML
pub fn format_yaml(outline: &Outline) -> Result<String, FormatError> {
    serde_yaml::to_string(outline).map_err(FormatError::from)
}
