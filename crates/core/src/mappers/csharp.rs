//! C# and Razor mapper
//!
//! Uses Tree-sitter for error-tolerant parsing: a file with syntax errors
//! still yields its members, and the errors are reported as diagnostics.

use super::{strip_parens, MapOptions, MapOutput, Mapper, MapperError};
use crate::identity::normalize_whitespace;
use crate::models::{
    Language, Member, MemberKind, NamespaceScope, ParentPath, ParseError, Signature,
};
use crate::regions::RegionSyntax;
use std::borrow::Cow;
use tree_sitter::{Node, Parser, Tree};

/// Title of the synthetic container for top-level local functions
pub const GLOBAL_SCOPE: &str = "<global>";

/// C# mapper implementation
pub struct CSharpMapper {
    parser: Parser,
    razor: bool,
}

impl CSharpMapper {
    /// Create a mapper for plain C# files
    pub fn new() -> Result<Self, MapperError> {
        Self::with_mode(false)
    }

    /// Create a mapper for Razor components (only the `@code` block is mapped)
    pub fn razor() -> Result<Self, MapperError> {
        Self::with_mode(true)
    }

    fn with_mode(razor: bool) -> Result<Self, MapperError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|e| MapperError::InitError(e.to_string()))?;
        Ok(Self { parser, razor })
    }

    /// Parse source code into a tree
    fn parse_tree(&mut self, source: &str) -> Result<Tree, MapperError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| MapperError::ParseError("Failed to parse source".to_string()))
    }
}

impl Mapper for CSharpMapper {
    fn language(&self) -> Language {
        if self.razor {
            Language::Razor
        } else {
            Language::CSharp
        }
    }

    fn map(&mut self, source: &str, options: &MapOptions) -> Result<MapOutput, MapperError> {
        let (code, line_offset) = if self.razor {
            match razor_code_section(source, &options.component_name) {
                Some((code, offset)) => (Cow::Owned(code), offset),
                None => return Ok(MapOutput::default()),
            }
        } else {
            (Cow::Borrowed(source), 0)
        };

        let tree = self.parse_tree(&code)?;
        let root = tree.root_node();

        let mut extraction = Extraction {
            source: code.as_bytes(),
            show_signatures: options.show_signatures,
            line_offset,
            containers: Vec::new(),
            globals: Vec::new(),
            scopes: Vec::new(),
        };
        extraction.walk(root, &ParentPath::root());

        let mut members = extraction.containers;
        if let Some(global) = global_container(extraction.globals) {
            members.push(global);
        }
        members.sort_by_key(|m| m.start_line);

        let mut errors = Vec::new();
        collect_errors(&root, line_offset, &mut errors);

        Ok(MapOutput {
            members,
            errors,
            code_start_line: Some(line_offset),
            scopes: extraction.scopes,
        })
    }

    fn region_syntax(&self) -> RegionSyntax {
        RegionSyntax::DIRECTIVE
    }
}

/// Cut a Razor file down to its `@code { ... }` block
///
/// The directive line is rewritten into a class declaration so the block
/// parses as C#. Returns the code and the number of lines dropped before it.
fn razor_code_section(source: &str, component_name: &str) -> Option<(String, usize)> {
    let lines: Vec<&str> = source.lines().collect();
    let (start, directive) = lines.iter().enumerate().find_map(|(index, line)| {
        let trimmed = line.trim_start();
        ["@code", "@functions"]
            .into_iter()
            .find(|d| {
                trimmed
                    .strip_prefix(d)
                    .is_some_and(|rest| rest.trim_start().starts_with('{'))
            })
            .map(|d| (index, d))
    })?;

    let header = lines[start].replacen(directive, &format!("public class {}", component_name), 1);
    let mut code = header;
    for line in &lines[start + 1..] {
        code.push('\n');
        code.push_str(line);
    }
    Some((code, start))
}

fn global_container(functions: Vec<Member>) -> Option<Member> {
    let start = functions.iter().map(|m| m.start_line).min()?;
    let end = functions
        .iter()
        .map(|m| m.end_line.unwrap_or(m.start_line))
        .max()
        .unwrap_or(start);
    Some(
        Member::new(MemberKind::Global, GLOBAL_SCOPE, start)
            .with_end_line(end)
            .with_children(functions),
    )
}

struct Extraction<'a> {
    source: &'a [u8],
    show_signatures: bool,
    line_offset: usize,
    containers: Vec<Member>,
    globals: Vec<Member>,
    scopes: Vec<NamespaceScope>,
}

impl Extraction<'_> {
    /// Walk declarations at namespace or compilation-unit level
    fn walk(&mut self, node: Node, path: &ParentPath) {
        let mut scope = path.clone();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "namespace_declaration" => {
                    let inner = self.namespace_path(&child, &scope);
                    self.add_scope(&inner, &child, child.end_position().row);
                    if let Some(body) = child.child_by_field_name("body") {
                        self.walk(body, &inner);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    // Applies to its own children and to every following sibling
                    scope = self.namespace_path(&child, &scope);
                    self.add_scope(&scope, &child, node.end_position().row);
                    self.walk(child, &scope);
                }
                "global_statement" => self.add_global(&child),
                "ERROR" | "declaration_list" => self.walk(child, &scope),
                kind => {
                    if let Some(member_kind) = type_kind(kind) {
                        self.add_type(&child, member_kind, &scope);
                    }
                }
            }
        }
    }

    fn namespace_path(&self, node: &Node, path: &ParentPath) -> ParentPath {
        let mut inner = path.clone();
        if let Some(name) = self.field_text(node, "name") {
            inner.namespaces.extend(
                name.split('.')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            );
        }
        inner
    }

    fn add_scope(&mut self, path: &ParentPath, node: &Node, end_row: usize) {
        if path.namespaces.is_empty() {
            return;
        }
        self.scopes.push(NamespaceScope::new(
            path.clone(),
            node.start_position().row + self.line_offset,
            end_row + self.line_offset,
        ));
    }

    fn add_type(&mut self, node: &Node, kind: MemberKind, path: &ParentPath) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let container = self.member(node, kind, name, path).with_public(true);
        let inner = container.child_path();
        let index = self.containers.len();
        self.containers.push(container);

        if kind == MemberKind::Enum {
            return;
        }
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let members = match child.kind() {
                "constructor_declaration" => self.callable(&child, MemberKind::Constructor, &inner),
                "method_declaration" => self.callable(&child, MemberKind::Method, &inner),
                "property_declaration" => self.property(&child, &inner),
                "field_declaration" => self.fields(&child, &inner),
                kind => {
                    if let Some(nested) = type_kind(kind) {
                        self.add_type(&child, nested, &inner);
                    }
                    Vec::new()
                }
            };
            self.containers[index].children.extend(members);
        }
    }

    fn add_global(&mut self, node: &Node) {
        let path = ParentPath::root().child(GLOBAL_SCOPE);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "local_function_statement" {
                let functions = self.callable(&child, MemberKind::Method, &path);
                self.globals.extend(functions);
            }
        }
    }

    fn callable(&self, node: &Node, kind: MemberKind, path: &ParentPath) -> Vec<Member> {
        let Some(name) = self.field_text(node, "name") else {
            return Vec::new();
        };
        let parameters = node
            .child_by_field_name("parameters")
            .and_then(|p| p.utf8_text(self.source).ok())
            .map(|text| normalize_whitespace(strip_parens(text)))
            .unwrap_or_default();
        vec![self
            .member(node, kind, name, path)
            .with_public(has_public_modifier(node, self.source))
            .with_signature(Signature::new(parameters, self.show_signatures))]
    }

    fn property(&self, node: &Node, path: &ParentPath) -> Vec<Member> {
        let Some(name) = self.field_text(node, "name") else {
            return Vec::new();
        };
        vec![self
            .member(node, MemberKind::Property, name, path)
            .with_public(has_public_modifier(node, self.source))]
    }

    /// One member per declarator: `int a, b;` yields `a` and `b`
    fn fields(&self, node: &Node, path: &ParentPath) -> Vec<Member> {
        let is_public = has_public_modifier(node, self.source);
        let mut fields = Vec::new();
        let mut cursor = node.walk();
        for declaration in node.named_children(&mut cursor) {
            if declaration.kind() != "variable_declaration" {
                continue;
            }
            let mut inner = declaration.walk();
            for declarator in declaration.named_children(&mut inner) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let name = self
                    .field_text(&declarator, "name")
                    .or_else(|| first_identifier(&declarator, self.source));
                if let Some(name) = name {
                    fields.push(
                        self.member(node, MemberKind::Field, name, path)
                            .with_public(is_public),
                    );
                }
            }
        }
        fields
    }

    fn member(&self, node: &Node, kind: MemberKind, name: String, path: &ParentPath) -> Member {
        let start = node.start_position();
        let end = node.end_position();
        Member::new(kind, name, start.row + self.line_offset)
            .with_end_line(end.row + self.line_offset)
            .with_column(start.column)
            .with_parent(path.clone())
    }

    fn field_text(&self, node: &Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .and_then(|n| n.utf8_text(self.source).ok())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

/// Map a Tree-sitter declaration kind to a container kind
fn type_kind(kind: &str) -> Option<MemberKind> {
    match kind {
        "class_declaration" | "record_declaration" => Some(MemberKind::Class),
        "struct_declaration" | "record_struct_declaration" => Some(MemberKind::Struct),
        "interface_declaration" => Some(MemberKind::Interface),
        "enum_declaration" => Some(MemberKind::Enum),
        _ => None,
    }
}

/// Explicit `public` or `internal` modifier
fn has_public_modifier(node: &Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| {
        let text = match child.kind() {
            "modifier" => child.utf8_text(source).unwrap_or(""),
            other => other,
        };
        matches!(text.trim(), "public" | "internal")
    });
    found
}

fn first_identifier(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "identifier")
        .and_then(|child| child.utf8_text(source).ok())
        .map(str::to_string);
    found
}

/// Collect all error nodes from the tree
fn collect_errors(node: &Node, line_offset: usize, errors: &mut Vec<ParseError>) {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        errors.push(ParseError {
            line: pos.row + line_offset,
            column: pos.column,
            message: if node.is_missing() {
                format!("Missing: {}", node.kind())
            } else {
                format!("Syntax error at: {}", node.kind())
            },
            error_type: if node.is_missing() {
                "missing".to_string()
            } else {
                "error".to_string()
            },
        });
    }

    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(&child, line_offset, errors);
    }
}
