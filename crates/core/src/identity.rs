//! Identity assignment
//!
//! Every member gets a human-readable key built from its ancestry and kind.
//! The key survives edits that move a member around the file, which is what
//! lets bookmarks follow it.

use crate::models::{Member, MemberKind, ParentPath, RegionBoundary, NAMESPACE_SEPARATOR};
use std::collections::HashSet;
use uuid::Uuid;

/// Compute the identity of a single member from its kind rules
pub fn member_id(member: &Member) -> String {
    let parent = &member.parent_path;
    match member.kind {
        kind if kind.is_container() => container_id(parent, &member.name),
        MemberKind::Constructor | MemberKind::Method => {
            let parameters = member
                .signature
                .as_ref()
                .map(|s| normalize_whitespace(&s.parameters))
                .unwrap_or_default();
            format!("{}({})", qualify(parent, &member.name), parameters)
        }
        MemberKind::Property | MemberKind::Field => qualify(parent, &member.name),
        MemberKind::Region => {
            let directive = match member.region.as_ref().map(|r| r.boundary) {
                Some(RegionBoundary::End) => "#endregion",
                _ => "#region",
            };
            qualify(parent, format!("{} {}", directive, member.name).trim_end())
        }
        _ => String::new(),
    }
}

fn container_id(parent: &ParentPath, title: &str) -> String {
    if parent.is_empty() {
        title.to_string()
    } else if !parent.has_type_segment() {
        format!("{}{}{}", parent.render(), NAMESPACE_SEPARATOR, title)
    } else {
        format!("{}.{}", parent.render(), title)
    }
}

fn qualify(parent: &ParentPath, name: &str) -> String {
    let rendered = parent.render();
    if rendered.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", rendered, name)
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assign identities to the whole forest in depth-first order
///
/// Repeated keys get an ordinal suffix (`#2`, `#3`, ...) and empty keys fall
/// back to a random token, so the resulting set never has duplicates.
pub fn assign_ids(forest: &mut [Member]) {
    let mut seen = HashSet::new();
    for member in forest.iter_mut() {
        member.visit_mut(&mut |m| {
            let mut id = member_id(m);
            if id.is_empty() {
                id = format!("member-{}", Uuid::new_v4());
            }
            if seen.contains(&id) {
                let base = id.clone();
                let mut ordinal = 2;
                while seen.contains(&id) {
                    id = format!("{}#{}", base, ordinal);
                    ordinal += 1;
                }
            }
            seen.insert(id.clone());
            m.id = id;
        });
    }
}

/// Collect every assigned identity of the forest
pub fn collect_ids(forest: &[Member]) -> Vec<String> {
    forest
        .iter()
        .flat_map(|m| m.flatten())
        .map(|m| m.id.clone())
        .collect()
}
