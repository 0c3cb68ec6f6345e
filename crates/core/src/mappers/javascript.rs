//! JavaScript/TypeScript mapper
//!
//! Recognizes the common function-definition idioms line by line with an
//! ordered list of patterns; the first pattern that matches wins. Classes and
//! TypeScript interfaces are declared as containers; namespaces, enums and
//! object literals ending a line with `{` only name the block they open, so
//! members declared inside them are grouped under that name.

use super::heuristic::{scan, Declaration, LineClassifier, LineKind};
use super::{MapOptions, MapOutput, Mapper, MapperError};
use crate::identity::normalize_whitespace;
use crate::models::{Language, MemberKind, Signature};
use crate::regions::RegionSyntax;
use regex::Regex;

/// Function-definition idioms, in matching order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionIdiom {
    /// `window.name = function (...)`
    WindowMember,
    /// `window.a.b = function (...)`
    WindowPath,
    /// `name: function (...)`
    ObjectProperty,
    /// `function name(...)`
    FunctionKeyword,
    /// `name(...) {`
    BareMethod,
    /// `const name = function (...)`
    VarFunction,
    /// `const name = (...) =>`
    VarArrow,
    /// `const name = arg =>`
    VarArrowSingle,
}

const IDIOMS: [(FunctionIdiom, &str); 8] = [
    (
        FunctionIdiom::WindowMember,
        r"window\.(\w+)\s*=\s*(?:async\s+)?function\b\*?\s*\w*\s*(?:\(([^)]*)\)?)?",
    ),
    (
        FunctionIdiom::WindowPath,
        r"window\.([\w.]+)\s*=\s*(?:async\s+)?function\b\*?\s*\w*\s*\(([^)]*)\)?",
    ),
    (
        FunctionIdiom::ObjectProperty,
        r"(\w+)\s*:\s*(?:async\s+)?function\b\*?\s*\w*\s*(?:\(([^)]*)\)?)?",
    ),
    (
        FunctionIdiom::FunctionKeyword,
        r"\bfunction\b\*?\s+(\w+)\s*\(([^)]*)\)?",
    ),
    (
        FunctionIdiom::BareMethod,
        r"^(?:(?:static|async|get|set|public|private|protected|readonly|override)\s+)*\*?(\w+)\s*\(([^)]*)\)\s*(?::\s*[^{=]+)?\{",
    ),
    (
        FunctionIdiom::VarFunction,
        r"^(?:var|let|const)\s+(\w+)\s*=\s*(?:async\s+)?function\b\*?\s*\w*\s*\(([^)]*)\)?",
    ),
    (
        FunctionIdiom::VarArrow,
        r"^(?:var|let|const)\s+(\w+)\s*=\s*(?:async\s+)?\(([^)]*)\)[^=]*=>",
    ),
    (
        FunctionIdiom::VarArrowSingle,
        r"^(?:var|let|const)\s+(\w+)\s*=\s*(?:async\s+)?([a-zA-Z_$][\w$]*)\s*=>",
    ),
];

/// Keywords that look like `name(...) {` but never declare a function
const CONTROL_KEYWORDS: [&str; 9] = [
    "if", "for", "while", "switch", "catch", "with", "else", "do", "try",
];

const TYPE_DECLARATION: &str =
    r"^(?:(?:export|default|abstract|declare)\s+)*(class|interface)\s+([\w$]+)";

const TYPE_SCOPE: &str =
    r"^(?:(?:export|default|abstract|declare)\s+)*(?:namespace|module|enum)\s+([\w$.]+)";

const OBJECT_SCOPE: &str =
    r"^(?:(?:var|let|const)\s+)?(?:window\.|this\.|module\.)?([\w$.]+)\s*[:=]\s*\{$";

struct Matcher {
    idiom: FunctionIdiom,
    pattern: Regex,
}

/// JavaScript/TypeScript mapper implementation
pub struct JavaScriptMapper {
    is_typescript: bool,
    matchers: Vec<Matcher>,
    type_declaration: Regex,
    type_scope: Regex,
    object_scope: Regex,
}

impl JavaScriptMapper {
    /// Create a new JavaScript/TypeScript mapper
    pub fn new(typescript: bool) -> Result<Self, MapperError> {
        let matchers = IDIOMS
            .iter()
            .map(|&(idiom, pattern)| {
                Ok(Matcher {
                    idiom,
                    pattern: compile(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, MapperError>>()?;

        Ok(Self {
            is_typescript: typescript,
            matchers,
            type_declaration: compile(TYPE_DECLARATION)?,
            type_scope: compile(TYPE_SCOPE)?,
            object_scope: compile(OBJECT_SCOPE)?,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, MapperError> {
    Regex::new(pattern).map_err(|e| MapperError::InitError(e.to_string()))
}

impl Mapper for JavaScriptMapper {
    fn language(&self) -> Language {
        if self.is_typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn map(&mut self, source: &str, options: &MapOptions) -> Result<MapOutput, MapperError> {
        let mut classifier = ScriptLines {
            mapper: self,
            show_signatures: options.show_signatures,
        };
        Ok(MapOutput::whole_file(scan(source, &mut classifier)))
    }

    fn region_syntax(&self) -> RegionSyntax {
        RegionSyntax::LINE_COMMENT
    }
}

struct ScriptLines<'a> {
    mapper: &'a JavaScriptMapper,
    show_signatures: bool,
}

impl ScriptLines<'_> {
    fn type_declaration(&self, text: &str) -> Option<Declaration> {
        let caps = self.mapper.type_declaration.captures(text)?;
        let kind = match caps.get(1)?.as_str() {
            "interface" => MemberKind::Interface,
            _ => MemberKind::Class,
        };
        Some(Declaration::new(kind, caps.get(2)?.as_str()))
    }

    fn declaration(&self, text: &str) -> Option<Declaration> {
        for matcher in &self.mapper.matchers {
            let Some(caps) = matcher.pattern.captures(text) else {
                continue;
            };
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if matcher.idiom == FunctionIdiom::BareMethod && !is_method_name(text, name) {
                continue;
            }

            let parameters = caps
                .get(2)
                .map(|m| normalize_whitespace(m.as_str()))
                .unwrap_or_default();
            let kind = if name == "constructor" {
                MemberKind::Constructor
            } else {
                MemberKind::Method
            };
            return Some(
                Declaration::new(kind, name)
                    .with_signature(Signature::new(parameters, self.show_signatures)),
            );
        }
        None
    }

    fn scope(&self, text: &str) -> Option<String> {
        if !text.ends_with('{') {
            return None;
        }
        let caps = self
            .mapper
            .type_scope
            .captures(text)
            .or_else(|| self.mapper.object_scope.captures(text))?;
        let name = caps.get(1)?.as_str().trim_matches('.');
        (!name.is_empty() && !CONTROL_KEYWORDS.contains(&name)).then(|| name.to_string())
    }
}

/// Reject control-flow statements and anonymous `function (...) {` lines
fn is_method_name(text: &str, name: &str) -> bool {
    let first = text
        .split(|c: char| c == ' ' || c == '(')
        .next()
        .unwrap_or("");
    name != "function" && !CONTROL_KEYWORDS.contains(&name) && !CONTROL_KEYWORDS.contains(&first)
}

impl LineClassifier for ScriptLines<'_> {
    fn classify(&mut self, line: &str) -> LineKind {
        let text = line.trim();
        if text.starts_with("//") || text.starts_with("/*") || text.starts_with('*') {
            return LineKind::Skip;
        }

        let text = strip_export(text);
        if let Some(declaration) = self
            .type_declaration(text)
            .or_else(|| self.declaration(text))
        {
            return LineKind::Declaration(declaration);
        }
        match self.scope(text) {
            Some(name) => LineKind::Scope(name),
            None => LineKind::Plain,
        }
    }
}

fn strip_export(text: &str) -> &str {
    let text = text.strip_prefix("export ").map(str::trim_start).unwrap_or(text);
    text.strip_prefix("default ").map(str::trim_start).unwrap_or(text)
}
