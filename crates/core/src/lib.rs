//! codemap_core - Core library for source code maps
//!
//! This crate turns a single source file into a navigable outline: the
//! classes, methods, properties, fields, nested types and regions a viewer
//! lists so the user can jump to a member.
//!
//! # Features
//!
//! - **Resilient Parsing**: C# and Razor code sections use Tree-sitter, so
//!   files with syntax errors still produce an outline.
//! - **Heuristic Mappers**: Python, JavaScript/TypeScript and CSS are mapped
//!   line by line.
//! - **Regions**: `#region` style markers are nested into the outline.
//! - **Stable Identities**: every member gets a key that survives edits, used
//!   to keep bookmarks attached.
//! - **Multiple Output Formats**: JSON, YAML, ANSI-colored and summary text.
//!
//! # Example
//!
//! ```rust,no_run
//! use codemap_core::{
//!     format_outline, MemoryBookmarkStore, OutlineGenerator, OutlineOptions, OutputFormat,
//!     SourceInput,
//! };
//! use std::sync::Arc;
//!
//! let generator = OutlineGenerator::new(Arc::new(MemoryBookmarkStore::new()));
//! let input = SourceInput::file("src/Program.cs");
//! let outcome = generator.generate(&input, &OutlineOptions::default());
//!
//! if let Some(outline) = outcome.outline() {
//!     println!("{}", format_outline(outline, OutputFormat::Summary).unwrap());
//! }
//! ```

pub mod bookmarks;
pub mod config;
pub mod engine;
pub mod identity;
pub mod mappers;
pub mod models;
pub mod output;
pub mod regions;

// Re-exports for convenience
pub use bookmarks::{BookmarkError, BookmarkStore, JsonBookmarkStore, MemoryBookmarkStore};
pub use config::{
    ConfigError, ContainerToggles, OutlineOptions, RetryPolicy, VisibilityToggle,
};
pub use engine::{OutlineError, OutlineGenerator, OutlineSession, SourceInput};
pub use mappers::{
    create_mapper, MapOptions, MapOutput, Mapper, MapperError, MapperFactory, MapperRegistry,
};
pub use models::{
    Language, Member, MemberKind, NamespaceScope, Outline, OutlineItem, OutlineMetadata,
    OutlineOutcome, ParentPath, ParseError, RegionBoundary, RegionMarker, Signature,
};
pub use output::{format_outline, FormatError, OutputFormat};
pub use regions::RegionSyntax;
