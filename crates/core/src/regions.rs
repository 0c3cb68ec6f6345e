//! Region resolution
//!
//! Finds paired region markers in comments or directives and splices them
//! into the member forest next to the members they bracket.

use crate::models::{Member, NamespaceScope, ParentPath, RegionBoundary, RegionMarker};

/// How region markers are written in a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSyntax {
    /// Comment opener that must precede the marker, if any
    pub opener: Option<&'static str>,

    /// Comment closer stripped from the end of the line, if any
    pub closer: Option<&'static str>,

    /// Whether the keyword must be introduced by `#`
    pub requires_hash: bool,

    /// Whether the keyword must be written exactly as `region`/`endregion`
    pub exact_keyword: bool,
}

impl RegionSyntax {
    /// `#region Name` directives
    pub const DIRECTIVE: RegionSyntax = RegionSyntax {
        opener: None,
        closer: None,
        requires_hash: true,
        exact_keyword: false,
    };

    /// `# region Name` comments, lowercase keyword only
    pub const HASH_COMMENT: RegionSyntax = RegionSyntax {
        opener: Some("#"),
        closer: None,
        requires_hash: false,
        exact_keyword: true,
    };

    /// `//#region Name` comments
    pub const LINE_COMMENT: RegionSyntax = RegionSyntax {
        opener: Some("//"),
        closer: None,
        requires_hash: true,
        exact_keyword: false,
    };

    /// `/* #region Name */` comments
    pub const BLOCK_COMMENT: RegionSyntax = RegionSyntax {
        opener: Some("/*"),
        closer: Some("*/"),
        requires_hash: true,
        exact_keyword: false,
    };

    /// Parse one line into a marker boundary and carried name
    pub fn parse_line<'a>(&self, line: &'a str) -> Option<(RegionBoundary, &'a str)> {
        let mut text = line.trim();
        if let Some(opener) = self.opener {
            text = text.strip_prefix(opener)?.trim_start();
        }
        if let Some(closer) = self.closer {
            text = text.strip_suffix(closer).unwrap_or(text).trim_end();
        }
        if self.requires_hash {
            text = text.strip_prefix('#')?.trim_start();
        }

        let exact = self.exact_keyword;
        let (boundary, rest) = strip_keyword(text, "endregion", exact)
            .map(|rest| (RegionBoundary::End, rest))
            .or_else(|| {
                strip_keyword(text, "region", exact).map(|rest| (RegionBoundary::Start, rest))
            })?;
        Some((boundary, rest.trim()))
    }
}

fn strip_keyword<'a>(text: &'a str, keyword: &str, exact: bool) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    let matched = if exact {
        head == keyword
    } else {
        head.eq_ignore_ascii_case(keyword)
    };
    if !matched {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

/// Scan the source for balanced region markers, starting at `from_line`
///
/// End markers without an open region are dropped and regions still open at
/// the end of the file are closed on the last line.
pub fn scan_markers(source: &str, syntax: &RegionSyntax, from_line: usize) -> Vec<Member> {
    let mut markers = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut last_line = from_line;

    for (line_no, line) in source.lines().enumerate().skip(from_line) {
        last_line = line_no;
        let Some((boundary, carried)) = syntax.parse_line(line) else {
            continue;
        };
        let column = line.len() - line.trim_start().len();

        match boundary {
            RegionBoundary::Start => {
                let depth = open.len();
                open.push(carried.to_string());
                markers.push(Member::region(
                    RegionMarker {
                        boundary,
                        name: carried.to_string(),
                        depth,
                    },
                    line_no,
                    column,
                ));
            }
            RegionBoundary::End => {
                let Some(name) = open.pop() else {
                    continue;
                };
                markers.push(Member::region(
                    RegionMarker {
                        boundary,
                        name,
                        depth: open.len(),
                    },
                    line_no,
                    column,
                ));
            }
        }
    }

    while let Some(name) = open.pop() {
        markers.push(Member::region(
            RegionMarker {
                boundary: RegionBoundary::End,
                name,
                depth: open.len(),
            },
            last_line,
            0,
        ));
    }

    markers
}

/// Where a region marker goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    /// Top level, qualified by the enclosing namespaces
    TopLevel(ParentPath),

    /// Among the children of the container starting at `start_line`
    Container { start_line: usize, path: ParentPath },
}

/// Splice region markers into the forest
///
/// A start marker lands among the children of the innermost container whose
/// body strictly contains its line, or at the top level in line order
/// otherwise. An end marker always lands next to its start marker, so both
/// sides of a pair share a nesting depth even when the end was synthesized
/// at the end of the file. The forest must already be ordered by start line.
pub fn splice(forest: &mut Vec<Member>, regions: Vec<Member>, scopes: &[NamespaceScope]) {
    let mut open: Vec<Placement> = Vec::new();

    for region in regions {
        let line = region.start_line;
        let boundary = region.region.as_ref().map(|r| r.boundary);
        let placement = match boundary {
            Some(RegionBoundary::End) => open.pop().unwrap_or_else(|| locate(forest, scopes, line)),
            _ => {
                let placement = locate(forest, scopes, line);
                open.push(placement.clone());
                placement
            }
        };
        place(forest, region, placement);
    }
}

fn locate(forest: &[Member], scopes: &[NamespaceScope], line: usize) -> Placement {
    match innermost_container(forest, line) {
        Some(index) => Placement::Container {
            start_line: forest[index].start_line,
            path: forest[index].child_path(),
        },
        None => Placement::TopLevel(namespace_at(scopes, line)),
    }
}

fn place(forest: &mut Vec<Member>, mut region: Member, placement: Placement) {
    let line = region.start_line;
    if let Placement::Container { start_line, path } = &placement {
        let owner = forest.iter_mut().find(|m| {
            m.kind.is_container() && m.start_line == *start_line && m.child_path() == *path
        });
        if let Some(container) = owner {
            region.parent_path = path.clone();
            let position = container
                .children
                .iter()
                .take_while(|c| c.start_line <= line)
                .count();
            container.children.insert(position, region);
            return;
        }
    }

    region.parent_path = match placement {
        Placement::TopLevel(path) => path,
        Placement::Container { .. } => ParentPath::root(),
    };
    let position = forest.iter().take_while(|m| m.start_line <= line).count();
    forest.insert(position, region);
}

fn innermost_container(forest: &[Member], line: usize) -> Option<usize> {
    forest
        .iter()
        .enumerate()
        .filter(|(_, m)| m.kind.is_container())
        .filter_map(|(index, m)| {
            let (start, end) = m.body_lines()?;
            (start < line && line <= end).then_some((index, start, m.parent_path.depth()))
        })
        .max_by_key(|&(_, start, depth)| (start, depth))
        .map(|(index, _, _)| index)
}

/// Namespace segments in effect at `line`
fn namespace_at(scopes: &[NamespaceScope], line: usize) -> ParentPath {
    scopes
        .iter()
        .filter(|scope| scope.contains(line))
        .max_by_key(|scope| scope.path.namespaces.len())
        .map(|scope| ParentPath::namespace(scope.path.namespaces.iter().cloned()))
        .unwrap_or_else(ParentPath::root)
}

/// Scan and splice in one step, returning the number of markers placed
pub fn resolve(
    source: &str,
    syntax: &RegionSyntax,
    from_line: usize,
    scopes: &[NamespaceScope],
    forest: &mut Vec<Member>,
) -> usize {
    let markers = scan_markers(source, syntax, from_line);
    let count = markers.len();
    splice(forest, markers, scopes);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::assign_ids;
    use crate::models::MemberKind;

    #[test]
    fn test_parse_line_per_syntax() {
        let directive = RegionSyntax::DIRECTIVE;
        assert_eq!(
            directive.parse_line("    #region Fields"),
            Some((RegionBoundary::Start, "Fields"))
        );
        assert_eq!(
            directive.parse_line("#endregion"),
            Some((RegionBoundary::End, ""))
        );
        assert_eq!(directive.parse_line("#regionally"), None);
        assert_eq!(directive.parse_line("// #region x"), None);

        assert_eq!(
            RegionSyntax::HASH_COMMENT.parse_line("# region Helpers"),
            Some((RegionBoundary::Start, "Helpers"))
        );
        assert_eq!(
            RegionSyntax::HASH_COMMENT.parse_line("#endregion"),
            Some((RegionBoundary::End, ""))
        );
        assert_eq!(
            RegionSyntax::LINE_COMMENT.parse_line("  // #region Api calls"),
            Some((RegionBoundary::Start, "Api calls"))
        );
        assert_eq!(
            RegionSyntax::BLOCK_COMMENT.parse_line("/* #region Layout */"),
            Some((RegionBoundary::Start, "Layout"))
        );
    }

    #[test]
    fn test_hash_comment_keyword_is_lowercase_only() {
        let syntax = RegionSyntax::HASH_COMMENT;
        assert_eq!(syntax.parse_line("# Region lookup helpers are below"), None);
        assert_eq!(syntax.parse_line("#ENDREGION"), None);
        assert_eq!(syntax.parse_line("# regions are cached"), None);
        assert_eq!(
            syntax.parse_line("#region Helpers"),
            Some((RegionBoundary::Start, "Helpers"))
        );
        assert_eq!(
            RegionSyntax::DIRECTIVE.parse_line("#Region Fields"),
            Some((RegionBoundary::Start, "Fields"))
        );
    }

    #[test]
    fn test_scan_markers_balances_stack() {
        let source = "#region Outer\n#region Inner\n#endregion\n#endregion\n#endregion\n";
        let markers = scan_markers(source, &RegionSyntax::DIRECTIVE, 0);

        let labels: Vec<String> = markers.iter().map(|m| m.title()).collect();
        assert_eq!(labels, vec!["<Outer>", "<Inner>", "</Inner>", "</Outer>"]);

        let depths: Vec<usize> = markers
            .iter()
            .filter_map(|m| m.region.as_ref().map(|r| r.depth))
            .collect();
        assert_eq!(depths, vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_unclosed_region_closed_at_end() {
        let markers = scan_markers("#region Open\nint x;\n", &RegionSyntax::DIRECTIVE, 0);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].title(), "</Open>");
        assert_eq!(markers[1].start_line, 1);
    }

    #[test]
    fn test_unclosed_region_ends_beside_its_start() {
        let class = Member::new(MemberKind::Class, "A", 1)
            .with_end_line(3)
            .with_children(vec![Member::new(MemberKind::Method, "m", 2)
                .with_parent(ParentPath::root().child("A"))]);
        let mut forest = vec![class];
        let source = "#region Open\nclass A:\n    def m(self):\n        pass\n";
        resolve(source, &RegionSyntax::DIRECTIVE, 0, &[], &mut forest);

        let top: Vec<String> = forest.iter().map(|m| m.title()).collect();
        assert_eq!(top, vec!["<Open>", "A", "</Open>"]);
        assert_eq!(forest[1].children.len(), 1);
        assert!(forest[2].parent_path.is_empty());
    }

    #[test]
    fn test_unclosed_region_in_container_closes_after_last_child() {
        let a = Member::new(MemberKind::Class, "A", 0)
            .with_end_line(3)
            .with_children(vec![Member::new(MemberKind::Field, "a", 2)
                .with_parent(ParentPath::root().child("A"))]);
        let b = Member::new(MemberKind::Class, "B", 4).with_end_line(4);
        let mut forest = vec![a, b];
        let source = "class A {\n#region Open\n int a;\n}\nclass B { }\n";
        resolve(source, &RegionSyntax::DIRECTIVE, 0, &[], &mut forest);

        let top: Vec<String> = forest.iter().map(|m| m.title()).collect();
        assert_eq!(top, vec!["A", "B"]);
        let children: Vec<String> = forest[0].children.iter().map(|m| m.title()).collect();
        assert_eq!(children, vec!["<Open>", "a", "</Open>"]);
        let depths: Vec<usize> = forest[0]
            .children
            .iter()
            .filter_map(|m| m.region.as_ref().map(|r| r.depth))
            .collect();
        assert_eq!(depths, vec![0, 0]);
    }

    #[test]
    fn test_top_level_region_keeps_namespace() {
        let app = ParentPath::namespace(["App"]);
        let class = Member::new(MemberKind::Class, "X", 3)
            .with_end_line(4)
            .with_parent(app.clone());
        let mut forest = vec![class];
        let scopes = vec![NamespaceScope::new(app, 0, 6)];
        let source = "namespace App\n{\n#region Types\nclass X\n{ }\n#endregion\n}\n";
        resolve(source, &RegionSyntax::DIRECTIVE, 0, &scopes, &mut forest);
        assign_ids(&mut forest);

        let ids: Vec<&str> = forest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["App.#region Types", "App|X", "App.#endregion Types"]);
    }

    #[test]
    fn test_splice_into_container_and_top_level() {
        let class = Member::new(MemberKind::Class, "Program", 2)
            .with_end_line(10)
            .with_children(vec![
                Member::new(MemberKind::Field, "a", 4),
                Member::new(MemberKind::Field, "b", 6),
            ]);
        let mut forest = vec![class];
        let source = "#region Types\n\nclass Program {\n#region Fields\n int a;\n#endregion\n int b;\n\n\n\n}\n#endregion\n";
        let placed = resolve(source, &RegionSyntax::DIRECTIVE, 0, &[], &mut forest);

        assert_eq!(placed, 4);
        let top: Vec<String> = forest.iter().map(|m| m.title()).collect();
        assert_eq!(top, vec!["<Types>", "Program", "</Types>"]);

        let children: Vec<String> = forest[1].children.iter().map(|m| m.title()).collect();
        assert_eq!(children, vec!["<Fields>", "a", "</Fields>", "b"]);
        assert_eq!(forest[1].children[0].parent_path.render(), "Program");
    }

    #[test]
    fn test_splice_prefers_innermost_container() {
        let outer = Member::new(MemberKind::Class, "Outer", 0).with_end_line(20);
        let inner = Member::new(MemberKind::Class, "Inner", 5)
            .with_end_line(10)
            .with_parent(ParentPath::root().child("Outer"));
        let mut forest = vec![outer, inner];

        let marker = Member::region(
            RegionMarker {
                boundary: RegionBoundary::Start,
                name: "Deep".to_string(),
                depth: 0,
            },
            7,
            8,
        );
        splice(&mut forest, vec![marker], &[]);

        assert!(forest[0].children.is_empty());
        assert_eq!(forest[1].children.len(), 1);
        assert_eq!(forest[1].children[0].parent_path.render(), "Outer.Inner");
    }
}
