//! ANSI colored output formatter
//!
//! Renders an outline as an indented tree for the terminal.

use crate::models::{Language, MemberKind, Outline, OutlineItem};

// ANSI escape codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BRIGHT_RED: &str = "\x1b[91m";
const BRIGHT_GREEN: &str = "\x1b[92m";
const BRIGHT_YELLOW: &str = "\x1b[93m";
const BRIGHT_BLUE: &str = "\x1b[94m";
const BRIGHT_MAGENTA: &str = "\x1b[95m";
const BRIGHT_CYAN: &str = "\x1b[96m";

const BG_BLUE: &str = "\x1b[44m";

/// Get color for member kind
fn kind_color(kind: MemberKind) -> &'static str {
    match kind {
        MemberKind::Global => WHITE,
        MemberKind::Class => BRIGHT_YELLOW,
        MemberKind::Interface => BRIGHT_GREEN,
        MemberKind::Struct => YELLOW,
        MemberKind::Enum => BRIGHT_YELLOW,
        MemberKind::GenericType => BRIGHT_BLUE,
        MemberKind::Constructor => BRIGHT_MAGENTA,
        MemberKind::Method => BRIGHT_CYAN,
        MemberKind::Property => BLUE,
        MemberKind::Field => CYAN,
        MemberKind::Region => MAGENTA,
    }
}

/// Get icon for member kind
fn kind_icon(kind: MemberKind) -> &'static str {
    match kind {
        MemberKind::Global => "📦",
        MemberKind::Class => "🔷",
        MemberKind::Interface => "📐",
        MemberKind::Struct => "🧱",
        MemberKind::Enum => "📋",
        MemberKind::GenericType => "🔶",
        MemberKind::Constructor => "🔨",
        MemberKind::Method => "🔹",
        MemberKind::Property => "📌",
        MemberKind::Field => "▫",
        MemberKind::Region => "📁",
    }
}

fn language_color(language: Language) -> &'static str {
    match language {
        Language::CSharp | Language::Razor => BRIGHT_MAGENTA,
        Language::Python => BRIGHT_YELLOW,
        Language::JavaScript => BRIGHT_GREEN,
        Language::TypeScript => BRIGHT_BLUE,
        Language::Css => CYAN,
    }
}

/// Escape code for a bookmark color name, if it is a terminal color
fn tag_color(tag: &str) -> Option<&'static str> {
    match tag.to_lowercase().as_str() {
        "red" => Some(RED),
        "green" => Some(GREEN),
        "yellow" | "orange" => Some(YELLOW),
        "blue" => Some(BLUE),
        "magenta" | "purple" | "violet" => Some(MAGENTA),
        "cyan" | "teal" => Some(CYAN),
        _ => None,
    }
}

/// Format an outline as ANSI colored text
pub fn format_ansi(outline: &Outline) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{}{}  Code Map  {}{}\n\n",
        BOLD, BG_BLUE, RESET, RESET
    ));

    output.push_str(&format!(
        "{}{}📄 {}{} {}({}, {} lines){}\n",
        BOLD,
        language_color(outline.language),
        outline.source_name(),
        RESET,
        DIM,
        outline.language.display_name(),
        outline.total_lines,
        RESET
    ));

    if outline.has_errors() {
        output.push_str(&format!(
            "   {}⚠ {} parse error(s){}\n",
            BRIGHT_RED,
            outline.errors.len(),
            RESET
        ));
        for error in &outline.errors {
            output.push_str(&format!(
                "     {}{}:{} {}{}\n",
                DIM,
                error.line + 1,
                error.column + 1,
                error.message,
                RESET
            ));
        }
    }

    for item in &outline.items {
        output.push_str(&format_item_ansi(item));
    }

    output.push_str(&format!(
        "\n{}{} item(s) in {}ms{}\n",
        DIM,
        outline.items.len(),
        outline.metadata.duration_ms,
        RESET
    ));

    output
}

/// Format a single item, indented by its depth
fn format_item_ansi(item: &OutlineItem) -> String {
    let indent = "   ".repeat(item.depth + 1);
    let color = kind_color(item.kind);
    let title_style = if item.is_public { BOLD } else { DIM };

    let mut line = format!(
        "{}{}{} {}{} {}{}{}",
        indent,
        color,
        kind_icon(item.kind),
        item.kind.label(),
        RESET,
        title_style,
        item.title,
        RESET,
    );

    match item.end_line {
        Some(end) if end != item.start_line => {
            line.push_str(&format!(" {}:{}-{}{}", DIM, item.start_line + 1, end + 1, RESET))
        }
        _ => line.push_str(&format!(" {}:{}{}", DIM, item.start_line + 1, RESET)),
    }

    if let Some(tag) = &item.color_tag {
        let badge = tag_color(tag).unwrap_or(WHITE);
        line.push_str(&format!(" {}● {}{}", badge, tag, RESET));
    }

    line.push('\n');
    line
}
