//! CSS mapper
//!
//! Every line that opens a brace block becomes a field titled by its
//! selector. There is no containment; nested at-rule blocks are listed flat.

use super::{indent_of, MapOptions, MapOutput, Mapper, MapperError};
use crate::models::{Language, Member, MemberKind};
use crate::regions::RegionSyntax;

/// Selectors longer than this are shortened for display
const MAX_SELECTOR_CHARS: usize = 25;

/// Characters kept before the `...` suffix
const TRUNCATED_CHARS: usize = 24;

/// CSS mapper implementation
#[derive(Debug, Default)]
pub struct CssMapper;

impl CssMapper {
    pub fn new() -> Self {
        Self
    }
}

impl Mapper for CssMapper {
    fn language(&self) -> Language {
        Language::Css
    }

    fn map(&mut self, source: &str, _options: &MapOptions) -> Result<MapOutput, MapperError> {
        let members = source
            .lines()
            .enumerate()
            .filter_map(|(line_no, line)| {
                let selector = line.trim().strip_suffix('{')?.trim();
                Some(
                    Member::new(MemberKind::Field, shorten(selector), line_no)
                        .with_column(indent_of(line)),
                )
            })
            .collect();
        Ok(MapOutput::whole_file(members))
    }

    fn region_syntax(&self) -> RegionSyntax {
        RegionSyntax::BLOCK_COMMENT
    }

    fn encodes_containment(&self) -> bool {
        false
    }
}

fn shorten(selector: &str) -> String {
    if selector.chars().count() > MAX_SELECTOR_CHARS {
        let head: String = selector.chars().take(TRUNCATED_CHARS).collect();
        format!("{}...", head)
    } else {
        selector.to_string()
    }
}
