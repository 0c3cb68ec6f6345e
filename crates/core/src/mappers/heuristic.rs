//! Shared machinery for the line-scanning mappers
//!
//! Lines are classified one at a time by a language-specific classifier. An
//! indentation stack gives each line a synthetic parent (the nearest earlier
//! non-blank line with smaller indentation); named parents prefix the
//! member's name with `.`. A structuring pass then splits those dotted names
//! back into a tree, creating any missing containers on the way.

use super::indent_of;
use crate::models::{Member, MemberKind, ParentPath, Signature};
use std::collections::HashMap;

/// A declaration found on one line
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declaration {
    pub kind: MemberKind,
    pub name: String,
    pub signature: Option<Signature>,
}

impl Declaration {
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Classification of a single non-blank line
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineKind {
    /// Produces a member; containers also name their indented block
    Declaration(Declaration),
    /// Names the indented block without producing a member
    Scope(String),
    /// Ordinary code; its indented block is anonymous
    Plain,
    /// Ignored for nesting purposes (decorators, comments)
    Skip,
}

/// Stateful per-line classifier for one language
pub(crate) trait LineClassifier {
    fn classify(&mut self, line: &str) -> LineKind;
}

struct Frame {
    indent: usize,
    start: usize,
    scope: Option<String>,
    member: Option<usize>,
}

struct RawMember {
    qualified: String,
    declaration: Declaration,
    line: usize,
    column: usize,
    end_line: usize,
}

/// Scan lines, infer nesting and build the member forest
///
/// A declaration whose nearest parent block has no name stays at the top
/// level instead of being guessed into an outer scope.
pub(crate) fn scan(source: &str, classifier: &mut dyn LineClassifier) -> Vec<Member> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut raw: Vec<RawMember> = Vec::new();
    let mut spans: HashMap<String, (usize, usize)> = HashMap::new();
    let mut last_content = 0;

    for (line_no, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_of(line);

        while stack.last().is_some_and(|f| f.indent >= indent) {
            if let Some(frame) = stack.pop() {
                close_frame(frame, last_content, &mut raw, &mut spans);
            }
        }

        let parent = stack.last().and_then(|f| f.scope.clone());
        let qualify = |name: &str| match &parent {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        };

        let frame = match classifier.classify(line) {
            LineKind::Skip => None,
            LineKind::Plain => Some(Frame {
                indent,
                start: line_no,
                scope: None,
                member: None,
            }),
            LineKind::Scope(name) => Some(Frame {
                indent,
                start: line_no,
                scope: Some(qualify(&name)),
                member: None,
            }),
            LineKind::Declaration(declaration) => {
                let qualified = qualify(&declaration.name);
                let scope = declaration.kind.is_container().then(|| qualified.clone());
                raw.push(RawMember {
                    qualified,
                    declaration,
                    line: line_no,
                    column: indent,
                    end_line: line_no,
                });
                Some(Frame {
                    indent,
                    start: line_no,
                    scope,
                    member: Some(raw.len() - 1),
                })
            }
        };

        if let Some(frame) = frame {
            stack.push(frame);
        }
        last_content = line_no;
    }

    while let Some(frame) = stack.pop() {
        close_frame(frame, last_content, &mut raw, &mut spans);
    }

    structure(raw, &spans)
}

fn close_frame(
    frame: Frame,
    end: usize,
    raw: &mut [RawMember],
    spans: &mut HashMap<String, (usize, usize)>,
) {
    let end = end.max(frame.start);
    if let Some(index) = frame.member {
        if let Some(member) = raw.get_mut(index) {
            member.end_line = end;
        }
    }
    if let Some(scope) = frame.scope {
        spans.entry(scope).or_insert((frame.start, end));
    }
}

/// Split dotted names into a tree
struct Structurer<'a> {
    containers: Vec<Member>,
    by_name: HashMap<String, usize>,
    spans: &'a HashMap<String, (usize, usize)>,
}

impl Structurer<'_> {
    /// Find or materialize the container for a qualified name
    fn ensure(&mut self, qualified: &str, first_use: usize) -> usize {
        if let Some(&index) = self.by_name.get(qualified) {
            return index;
        }
        let (parent_path, name) = match qualified.rsplit_once('.') {
            Some((parent, name)) => {
                let parent_index = self.ensure(parent, first_use);
                (self.containers[parent_index].child_path(), name)
            }
            None => (ParentPath::root(), qualified),
        };
        let (start, end) = self
            .spans
            .get(qualified)
            .copied()
            .unwrap_or((first_use, first_use));

        let member = Member::new(MemberKind::GenericType, name, start)
            .with_end_line(end)
            .with_parent(parent_path);
        self.containers.push(member);
        let index = self.containers.len() - 1;
        self.by_name.insert(qualified.to_string(), index);
        index
    }
}

fn structure(raw: Vec<RawMember>, spans: &HashMap<String, (usize, usize)>) -> Vec<Member> {
    let mut structurer = Structurer {
        containers: Vec::new(),
        by_name: HashMap::new(),
        spans,
    };
    let mut loose = Vec::new();

    for item in raw {
        let (parent_key, name) = match item.qualified.rsplit_once('.') {
            Some((parent, name)) => (Some(parent), name.to_string()),
            None => (None, item.qualified.clone()),
        };
        let parent_index = parent_key.map(|key| structurer.ensure(key, item.line));
        let parent_path = parent_index
            .map(|index| structurer.containers[index].child_path())
            .unwrap_or_default();

        let mut member = Member::new(item.declaration.kind, name, item.line)
            .with_column(item.column)
            .with_end_line(item.end_line)
            .with_parent(parent_path);
        member.signature = item.declaration.signature;

        if member.kind.is_container() {
            structurer.containers.push(member);
            let index = structurer.containers.len() - 1;
            structurer.by_name.insert(item.qualified, index);
        } else if let Some(index) = parent_index {
            structurer.containers[index].children.push(member);
        } else {
            loose.push(member);
        }
    }

    let mut forest = structurer.containers;
    forest.extend(loose);
    forest.sort_by_key(|m| m.start_line);
    forest
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `box Name:` opens a container, `fn name` declares a method,
    /// `scope Name:` names a block, `@` lines are skipped
    struct Toy;

    impl LineClassifier for Toy {
        fn classify(&mut self, line: &str) -> LineKind {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("box ") {
                LineKind::Declaration(Declaration::new(MemberKind::Class, name.trim_end_matches(':')))
            } else if let Some(name) = line.strip_prefix("fn ") {
                LineKind::Declaration(Declaration::new(MemberKind::Method, name))
            } else if let Some(name) = line.strip_prefix("scope ") {
                LineKind::Scope(name.trim_end_matches(':').to_string())
            } else if line.starts_with('@') {
                LineKind::Skip
            } else {
                LineKind::Plain
            }
        }
    }

    #[test]
    fn test_nesting_by_indentation() {
        let source = "box A:\n    fn one\n    box B:\n        fn two\n\n    fn three\nfn top\n";
        let forest = scan(source, &mut Toy);

        let names: Vec<&str> = forest.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "top"]);

        let a = &forest[0];
        assert_eq!(a.end_line, Some(5));
        let children: Vec<&str> = a.children.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(children, vec!["one", "three"]);

        let b = &forest[1];
        assert_eq!(b.parent_path.render(), "A");
        assert_eq!(b.children[0].parent_path.render(), "A.B");
    }

    #[test]
    fn test_anonymous_parent_keeps_member_top_level() {
        let source = "box A:\n    if x:\n        fn hidden\n";
        let forest = scan(source, &mut Toy);

        assert_eq!(forest.len(), 2);
        assert!(forest[0].children.is_empty());
        assert_eq!(forest[1].name, "hidden");
        assert!(forest[1].parent_path.is_empty());
    }

    #[test]
    fn test_scope_materializes_generic_container() {
        let source = "scope api:\n    fn load\n    fn save\n";
        let forest = scan(source, &mut Toy);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].kind, MemberKind::GenericType);
        assert_eq!(forest[0].name, "api");
        assert_eq!(forest[0].body_lines(), Some((0, 2)));
        assert_eq!(forest[0].children.len(), 2);
    }

    #[test]
    fn test_dotted_names_split_on_last_dot() {
        let forest = scan("fn a.b.run\n", &mut Toy);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].name, "a");
        assert_eq!(forest[1].name, "b");
        assert_eq!(forest[1].parent_path.render(), "a");
        assert_eq!(forest[1].children[0].name, "run");
        assert_eq!(forest[1].children[0].parent_path.render(), "a.b");
    }

    #[test]
    fn test_skipped_lines_do_not_open_blocks() {
        let source = "box A:\n    @decorated\n    fn one\n";
        let forest = scan(source, &mut Toy);
        assert_eq!(forest[0].children.len(), 1);
    }
}
