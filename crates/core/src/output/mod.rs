//! Output formatting module
//!
//! This module provides formatters for JSON, YAML, ANSI and plain-text
//! summaries of an outline.

pub mod ansi;
mod json;
mod yaml;

pub use ansi::format_ansi;
pub use json::format_json;
pub use yaml::format_yaml;

use crate::models::{MemberKind, Outline};
use thiserror::Error;

/// Output format errors
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON format
    #[default]
    Json,
    /// YAML format
    Yaml,
    /// ANSI colored text
    Ansi,
    /// Plain text summary
    Summary,
}

/// Format an outline in the specified format
pub fn format_outline(outline: &Outline, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => format_json(outline),
        OutputFormat::Yaml => format_yaml(outline),
        OutputFormat::Ansi => Ok(format_ansi(outline)),
        OutputFormat::Summary => Ok(format_summary(outline)),
    }
}

/// Item counts by category
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ItemCounts {
    containers: usize,
    callables: usize,
    properties: usize,
    fields: usize,
    regions: usize,
}

fn count_items(outline: &Outline) -> ItemCounts {
    let mut counts = ItemCounts::default();
    for item in &outline.items {
        match item.kind {
            MemberKind::Constructor | MemberKind::Method => counts.callables += 1,
            MemberKind::Property => counts.properties += 1,
            MemberKind::Field => counts.fields += 1,
            MemberKind::Region => counts.regions += 1,
            _ => counts.containers += 1,
        }
    }
    counts
}

/// Format as plain text summary
fn format_summary(outline: &Outline) -> String {
    let mut output = String::new();
    let counts = count_items(outline);

    output.push_str("Code Map\n");
    output.push_str("========\n\n");
    output.push_str(&format!("Source: {}\n", outline.source_name()));
    output.push_str(&format!("Language: {}\n", outline.language.display_name()));
    output.push_str(&format!("Lines: {}\n", outline.total_lines));
    output.push_str(&format!("Items: {}\n", outline.items.len()));
    output.push_str(&format!("  Types: {}\n", counts.containers));
    output.push_str(&format!("  Methods: {}\n", counts.callables));
    output.push_str(&format!("  Properties: {}\n", counts.properties));
    output.push_str(&format!("  Fields: {}\n", counts.fields));
    output.push_str(&format!("  Regions: {}\n", counts.regions));

    if outline.has_errors() {
        output.push_str(&format!("\nParse errors: {}\n", outline.errors.len()));
    }

    output.push('\n');
    for item in &outline.items {
        output.push_str(&format!(
            "{}{} {} :{}\n",
            "  ".repeat(item.depth + 1),
            item.kind.label(),
            item.title,
            item.start_line + 1
        ));
    }

    output.push_str(&format!(
        "\nGenerated in {}ms (attempts: {})\n",
        outline.metadata.duration_ms, outline.attempts
    ));

    output
}
