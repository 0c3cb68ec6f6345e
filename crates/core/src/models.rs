//! Data models for code map outlines
//!
//! This module defines the core data structures shared by every stage of the
//! pipeline: the member forest produced by the language mappers, the
//! structured ancestry path used for identities, and the flat outline items
//! handed to a viewer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[serde(rename = "csharp")]
    CSharp,
    Razor,
    Python,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "typescript")]
    TypeScript,
    Css,
}

impl Language {
    /// Get display name for the language
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::CSharp => "C#",
            Language::Razor => "Razor",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Css => "CSS",
        }
    }
}

/// Kinds of members that can appear in an outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Synthetic container for top-level callables
    Global,
    Class,
    Interface,
    Struct,
    Enum,
    /// Container materialized by the heuristic mappers
    GenericType,
    Constructor,
    Method,
    Property,
    Field,
    Region,
}

impl MemberKind {
    /// Get human-readable label for the kind
    pub fn label(&self) -> &'static str {
        match self {
            MemberKind::Global => "global",
            MemberKind::Class => "class",
            MemberKind::Interface => "interface",
            MemberKind::Struct => "struct",
            MemberKind::Enum => "enum",
            MemberKind::GenericType => "type",
            MemberKind::Constructor => "constructor",
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Field => "field",
            MemberKind::Region => "region",
        }
    }

    /// Check if this kind owns children
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            MemberKind::Global
                | MemberKind::Class
                | MemberKind::Interface
                | MemberKind::Struct
                | MemberKind::Enum
                | MemberKind::GenericType
        )
    }

    /// Check if this kind carries a parameter list
    pub fn is_callable(&self) -> bool {
        matches!(self, MemberKind::Constructor | MemberKind::Method)
    }
}

/// Separator placed between the namespace group and the type group of a path
pub const NAMESPACE_SEPARATOR: char = '|';

/// Ancestry of a member, independent of its position in the tree
///
/// Namespace segments and enclosing type names are kept apart so that a bare
/// namespace parent and a nested type parent never render the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentPath {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl ParentPath {
    /// Path of a top-level member
    pub fn root() -> Self {
        Self::default()
    }

    /// Path made of namespace segments only
    pub fn namespace<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: segments.into_iter().map(Into::into).collect(),
            types: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty() && self.types.is_empty()
    }

    /// True when at least one enclosing type is part of the path
    pub fn has_type_segment(&self) -> bool {
        !self.types.is_empty()
    }

    /// Nesting depth used for indentation (enclosing types only)
    pub fn depth(&self) -> usize {
        self.types.len()
    }

    /// Path of the members declared inside `type_name`
    pub fn child(&self, type_name: &str) -> Self {
        let mut path = self.clone();
        path.types.push(type_name.to_string());
        path
    }

    /// Render as `ns.ns|Type.Nested`, `ns.ns` or `Type.Nested`
    pub fn render(&self) -> String {
        let namespaces = self.namespaces.join(".");
        let types = self.types.join(".");
        match (namespaces.is_empty(), types.is_empty()) {
            (true, _) => types,
            (false, true) => namespaces,
            (false, false) => format!("{}{}{}", namespaces, NAMESPACE_SEPARATOR, types),
        }
    }
}

impl fmt::Display for ParentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parameter list of a callable member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Whitespace-normalized parameter text without the parentheses
    pub parameters: String,

    /// Whether the display form shows the parameters or a placeholder
    pub shown: bool,
}

impl Signature {
    pub fn new(parameters: impl Into<String>, shown: bool) -> Self {
        Self {
            parameters: parameters.into(),
            shown,
        }
    }

    /// Display form: `(int a, int b)` or `(...)`
    pub fn display(&self) -> String {
        if self.shown {
            format!("({})", self.parameters)
        } else {
            "(...)".to_string()
        }
    }
}

/// Which side of a region pair a marker is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionBoundary {
    Start,
    End,
}

/// Region details carried by `MemberKind::Region` members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMarker {
    pub boundary: RegionBoundary,

    /// Name of the region; an end marker carries the name it closes
    pub name: String,

    /// Stack depth at the marker, shared by both markers of a pair
    pub depth: usize,
}

impl RegionMarker {
    /// Human-readable label: `<name>` or `</name>`
    pub fn label(&self) -> String {
        match self.boundary {
            RegionBoundary::Start => format!("<{}>", self.name),
            RegionBoundary::End => format!("</{}>", self.name),
        }
    }
}

/// Line span of a namespace body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceScope {
    /// Namespace segments in effect inside the span
    pub path: ParentPath,
    pub start_line: usize,
    pub end_line: usize,
}

impl NamespaceScope {
    pub fn new(path: ParentPath, start_line: usize, end_line: usize) -> Self {
        Self {
            path,
            start_line,
            end_line,
        }
    }

    /// True when `line` lies after the opening line and within the span
    pub fn contains(&self, line: usize) -> bool {
        self.start_line < line && line <= self.end_line
    }
}

/// One node of the member forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub kind: MemberKind,

    /// Declared identifier, type title or selector text
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    /// Starting line (0-indexed)
    pub start_line: usize,

    /// Ending line (0-indexed), when the mapper computes spans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    pub column: usize,

    #[serde(default)]
    pub parent_path: ParentPath,

    pub is_public: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Member>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionMarker>,

    /// Identity assigned by `identity::assign_ids`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Bookmark color joined in from the bookmark store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
}

impl Member {
    /// Create a new member at `start_line`
    pub fn new(kind: MemberKind, name: impl Into<String>, start_line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
            start_line,
            end_line: None,
            column: 0,
            parent_path: ParentPath::root(),
            is_public: true,
            children: Vec::new(),
            region: None,
            id: String::new(),
            color_tag: None,
        }
    }

    /// Create a region marker member
    pub fn region(marker: RegionMarker, line: usize, column: usize) -> Self {
        let mut member = Self::new(MemberKind::Region, marker.name.clone(), line);
        member.end_line = Some(line);
        member.column = column;
        member.region = Some(marker);
        member
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = Some(end_line);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    pub fn with_parent(mut self, parent_path: ParentPath) -> Self {
        self.parent_path = parent_path;
        self
    }

    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn with_children(mut self, children: Vec<Member>) -> Self {
        self.children = children;
        self
    }

    /// Path shared by the members declared inside this container
    pub fn child_path(&self) -> ParentPath {
        self.parent_path.child(&self.name)
    }

    /// Display text, decorated with the signature or region label
    pub fn title(&self) -> String {
        if let Some(region) = &self.region {
            return region.label();
        }
        match &self.signature {
            Some(signature) => format!("{}{}", self.name, signature.display()),
            None => self.name.clone(),
        }
    }

    /// Line range covered by this member's body
    ///
    /// Falls back to the first and last child lines when the mapper did not
    /// compute an end line. Returns `None` when neither is known.
    pub fn body_lines(&self) -> Option<(usize, usize)> {
        if let Some(end) = self.end_line {
            return Some((self.start_line, end));
        }
        let last = self.children.iter().map(|c| c.end_line.unwrap_or(c.start_line)).max()?;
        Some((self.start_line, last.max(self.start_line)))
    }

    /// Flatten the tree into a list, parents before children
    pub fn flatten(&self) -> Vec<&Member> {
        let mut result = vec![self];
        for child in &self.children {
            result.extend(child.flatten());
        }
        result
    }

    /// Visit this member and all descendants mutably
    pub fn visit_mut(&mut self, visit: &mut impl FnMut(&mut Member)) {
        visit(self);
        for child in &mut self.children {
            child.visit_mut(visit);
        }
    }
}

/// Syntax diagnostic reported by a mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Line number where error occurred (0-indexed)
    pub line: usize,

    /// Column number
    pub column: usize,

    /// Error message
    pub message: String,

    /// Error type (missing, error)
    pub error_type: String,
}

/// One entry of the ordered list a viewer renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: String,

    pub kind: MemberKind,

    /// Display text, already signature-decorated
    pub title: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_path: String,

    pub is_public: bool,

    /// Starting line (0-indexed), used for caret navigation
    pub start_line: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    pub column: usize,

    /// Nesting depth derived from the parent path
    pub depth: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionMarker>,
}

impl OutlineItem {
    pub fn from_member(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            kind: member.kind,
            title: member.title(),
            name: member.name.clone(),
            parent_path: member.parent_path.render(),
            is_public: member.is_public,
            start_line: member.start_line,
            end_line: member.end_line,
            column: member.column,
            depth: member.parent_path.depth(),
            color_tag: member.color_tag.clone(),
            region: member.region.clone(),
        }
    }
}

/// Metadata about one outline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineMetadata {
    /// Duration of the successful attempt in milliseconds
    pub duration_ms: u64,

    /// ISO timestamp of the run
    pub timestamp: String,

    /// Tool version
    pub tool_version: String,
}

/// Complete outline for one source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    /// Path of the source, when it came from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub language: Language,

    pub total_lines: usize,

    /// Ordered, filtered items
    pub items: Vec<OutlineItem>,

    /// Syntax diagnostics (the outline is still usable)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ParseError>,

    /// Attempts it took to produce this outline
    pub attempts: usize,

    pub metadata: OutlineMetadata,
}

impl Outline {
    /// Check if the source had syntax errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Display name of the source
    pub fn source_name(&self) -> String {
        self.path
            .as_deref()
            .map(Path::display)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<text>".to_string())
    }
}

/// Result of one outline request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutlineOutcome {
    /// Outline produced, possibly after retries
    Ready(Outline),

    /// No mapper registered for the extension; never retried
    Unsupported { extension: String },

    /// Every attempt failed; `message` is the last error verbatim
    Failed { message: String, attempts: usize },
}

impl OutlineOutcome {
    pub fn outline(&self) -> Option<&Outline> {
        match self {
            OutlineOutcome::Ready(outline) => Some(outline),
            _ => None,
        }
    }

    pub fn into_outline(self) -> Option<Outline> {
        match self {
            OutlineOutcome::Ready(outline) => Some(outline),
            _ => None,
        }
    }
}
