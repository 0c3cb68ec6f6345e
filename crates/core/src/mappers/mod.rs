//! Language mappers
//!
//! A mapper turns raw source text into a shallow member forest. C# and Razor
//! use a Tree-sitter syntax tree; Python, JavaScript/TypeScript and CSS are
//! mapped by line-oriented heuristics.

mod csharp;
mod css;
mod heuristic;
mod javascript;
mod python;

pub use csharp::CSharpMapper;
pub use css::CssMapper;
pub use javascript::JavaScriptMapper;
pub use python::PythonMapper;

use crate::models::{Language, Member, NamespaceScope, ParseError};
use crate::regions::RegionSyntax;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Mapper errors
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),

    #[error("Failed to parse source code: {0}")]
    ParseError(String),

    #[error("No mapper for language: {0}")]
    UnsupportedLanguage(String),
}

/// Per-request mapper options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOptions {
    /// Show parameter lists instead of a placeholder
    pub show_signatures: bool,

    /// Class name given to a Razor code section
    pub component_name: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            show_signatures: true,
            component_name: "Component".to_string(),
        }
    }
}

impl MapOptions {
    pub fn new(show_signatures: bool) -> Self {
        Self {
            show_signatures,
            ..Default::default()
        }
    }

    /// Set Razor component name (builder pattern)
    pub fn with_component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = name.into();
        self
    }
}

/// Raw mapper result
#[derive(Debug, Clone, Default)]
pub struct MapOutput {
    /// Shallow forest: containers with their direct members, nested
    /// containers as their own top-level entries
    pub members: Vec<Member>,

    /// Syntax diagnostics; never fatal
    pub errors: Vec<ParseError>,

    /// First source line the mapper covered, `None` when there is no code
    pub code_start_line: Option<usize>,

    /// Namespace bodies, used to qualify regions outside any type
    pub scopes: Vec<NamespaceScope>,
}

impl MapOutput {
    /// Output covering the whole file
    pub fn whole_file(members: Vec<Member>) -> Self {
        Self {
            members,
            errors: Vec::new(),
            code_start_line: Some(0),
            scopes: Vec::new(),
        }
    }
}

/// Trait for language-specific mappers
pub trait Mapper: Send {
    /// Get the language this mapper handles
    fn language(&self) -> Language;

    /// Map source text into a member forest
    fn map(&mut self, source: &str, options: &MapOptions) -> Result<MapOutput, MapperError>;

    /// How region markers are written in this language
    fn region_syntax(&self) -> RegionSyntax;

    /// Whether the output reflects real containment, so class filters apply
    fn encodes_containment(&self) -> bool {
        true
    }
}

/// Builds a fresh mapper for every outline attempt
///
/// Factories that only cover some languages report the rest as
/// `MapperError::UnsupportedLanguage`.
pub type MapperFactory =
    Arc<dyn Fn(Language) -> Result<Box<dyn Mapper>, MapperError> + Send + Sync>;

/// Create a mapper for the specified language
pub fn create_mapper(language: Language) -> Result<Box<dyn Mapper>, MapperError> {
    match language {
        Language::CSharp => Ok(Box::new(CSharpMapper::new()?)),
        Language::Razor => Ok(Box::new(CSharpMapper::razor()?)),
        Language::Python => Ok(Box::new(PythonMapper::new())),
        Language::JavaScript => Ok(Box::new(JavaScriptMapper::new(false)?)),
        Language::TypeScript => Ok(Box::new(JavaScriptMapper::new(true)?)),
        Language::Css => Ok(Box::new(CssMapper::new())),
    }
}

/// Extension-to-language table used to pick a mapper
#[derive(Debug, Clone)]
pub struct MapperRegistry {
    extensions: BTreeMap<String, Language>,
}

impl Default for MapperRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let table = [
            ("cs", Language::CSharp),
            ("razor", Language::Razor),
            ("py", Language::Python),
            ("pyw", Language::Python),
            ("pyi", Language::Python),
            ("js", Language::JavaScript),
            ("mjs", Language::JavaScript),
            ("cjs", Language::JavaScript),
            ("jsx", Language::JavaScript),
            ("ts", Language::TypeScript),
            ("mts", Language::TypeScript),
            ("cts", Language::TypeScript),
            ("tsx", Language::TypeScript),
            ("css", Language::Css),
        ];
        for (ext, language) in table {
            registry.register(ext, language);
        }
        registry
    }
}

impl MapperRegistry {
    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            extensions: BTreeMap::new(),
        }
    }

    /// Register or replace an extension
    pub fn register(&mut self, extension: &str, language: Language) {
        self.extensions.insert(normalize_extension(extension), language);
    }

    /// Look up the language for an extension
    pub fn resolve(&self, extension: &str) -> Option<Language> {
        self.extensions.get(&normalize_extension(extension)).copied()
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> impl Iterator<Item = (&str, Language)> {
        self.extensions.iter().map(|(ext, lang)| (ext.as_str(), *lang))
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Text between the outer parentheses of a parameter list
pub(crate) fn strip_parens(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('(').unwrap_or(text);
    text.strip_suffix(')').unwrap_or(text)
}

/// Leading whitespace width of a line
pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}
