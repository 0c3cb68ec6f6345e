//! Python mapper
//!
//! Line-oriented: `class` lines become classes and `def` lines become
//! methods, nested by indentation. A `@property` decorator turns the next
//! `def` into a property.

use super::heuristic::{scan, Declaration, LineClassifier, LineKind};
use super::{strip_parens, MapOptions, MapOutput, Mapper, MapperError};
use crate::identity::normalize_whitespace;
use crate::models::{Language, MemberKind, Signature};
use crate::regions::RegionSyntax;

/// Python mapper implementation
#[derive(Debug, Default)]
pub struct PythonMapper;

impl PythonMapper {
    pub fn new() -> Self {
        Self
    }
}

impl Mapper for PythonMapper {
    fn language(&self) -> Language {
        Language::Python
    }

    fn map(&mut self, source: &str, options: &MapOptions) -> Result<MapOutput, MapperError> {
        let mut classifier = PythonLines {
            show_signatures: options.show_signatures,
            pending: Pending::None,
        };
        Ok(MapOutput::whole_file(scan(source, &mut classifier)))
    }

    fn region_syntax(&self) -> RegionSyntax {
        RegionSyntax::HASH_COMMENT
    }

    /// Class filters are not applied to heuristic Python output
    fn encodes_containment(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Property,
    Accessor,
}

struct PythonLines {
    show_signatures: bool,
    pending: Pending,
}

impl LineClassifier for PythonLines {
    fn classify(&mut self, line: &str) -> LineKind {
        let text = line.trim();

        if text.starts_with('#') {
            return LineKind::Skip;
        }

        if let Some(decorator) = text.strip_prefix('@') {
            let target = decorator.split('(').next().unwrap_or("").trim();
            if target == "property" || target.ends_with("cached_property") {
                self.pending = Pending::Property;
            } else if target.ends_with(".setter") || target.ends_with(".deleter") {
                self.pending = Pending::Accessor;
            }
            return LineKind::Skip;
        }

        if let Some(rest) = text.strip_prefix("class ") {
            self.pending = Pending::None;
            let name = rest
                .split(|c: char| c == '(' || c == ':' || c.is_whitespace())
                .next()
                .unwrap_or("");
            if name.is_empty() {
                return LineKind::Plain;
            }
            return LineKind::Declaration(Declaration::new(MemberKind::Class, name));
        }

        let def = text
            .strip_prefix("def ")
            .or_else(|| text.strip_prefix("async def "));
        if let Some(rest) = def {
            let pending = std::mem::replace(&mut self.pending, Pending::None);
            let name = rest.split('(').next().unwrap_or("").trim();
            if name.is_empty() {
                return LineKind::Plain;
            }
            return match pending {
                Pending::Accessor => LineKind::Plain,
                Pending::Property => {
                    LineKind::Declaration(Declaration::new(MemberKind::Property, name))
                }
                Pending::None => {
                    let parameters = normalize_whitespace(strip_parens(parameter_text(rest)));
                    LineKind::Declaration(
                        Declaration::new(MemberKind::Method, name)
                            .with_signature(Signature::new(parameters, self.show_signatures)),
                    )
                }
            };
        }

        LineKind::Plain
    }
}

/// Parameter list of a `def` line, including the parentheses
///
/// Multi-line parameter lists are cut at the end of the line.
fn parameter_text(rest: &str) -> &str {
    let Some(open) = rest.find('(') else {
        return "";
    };
    let tail = &rest[open..];
    let mut depth = 0usize;
    for (index, c) in tail.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &tail[..=index];
                }
            }
            _ => {}
        }
    }
    tail.trim_end_matches(':')
}
