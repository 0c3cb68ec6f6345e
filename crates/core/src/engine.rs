//! Outline engine module
//!
//! This module runs the whole pipeline for one source: pick a mapper by
//! extension, map, resolve regions, assign identities, join bookmarks, then
//! filter and order the forest into the flat item list a viewer renders.

use crate::bookmarks::BookmarkStore;
use crate::config::{matches_filter, OutlineOptions, RetryPolicy};
use crate::identity::{assign_ids, collect_ids};
use crate::mappers::{
    create_mapper, MapOptions, Mapper, MapperError, MapperFactory, MapperRegistry,
};
use crate::models::{
    Language, Member, MemberKind, Outline, OutlineItem, OutlineMetadata, OutlineOutcome,
    ParentPath,
};
use crate::regions;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors of a single outline attempt
#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Mapper(#[from] MapperError),
}

/// Where the source text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    /// Read from disk on every attempt
    File(PathBuf),

    /// In-memory text with an extension hint
    Text {
        text: String,
        extension: String,
        /// File key used for bookmarks and the Razor component name
        name: Option<String>,
    },
}

impl SourceInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceInput::File(path.into())
    }

    pub fn text(text: impl Into<String>, extension: impl Into<String>) -> Self {
        SourceInput::Text {
            text: text.into(),
            extension: extension.into(),
            name: None,
        }
    }

    /// Set the file key of in-memory text (builder pattern)
    pub fn with_name(self, key: impl Into<String>) -> Self {
        match self {
            SourceInput::Text {
                text, extension, ..
            } => SourceInput::Text {
                text,
                extension,
                name: Some(key.into()),
            },
            file => file,
        }
    }

    /// Extension used to select the mapper
    pub fn extension(&self) -> String {
        match self {
            SourceInput::File(path) => path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
            SourceInput::Text { extension, .. } => {
                extension.trim().trim_start_matches('.').to_string()
            }
        }
    }

    /// Key under which bookmarks of this source are stored
    pub fn file_key(&self) -> Option<String> {
        match self {
            SourceInput::File(path) => Some(path.to_string_lossy().to_string()),
            SourceInput::Text { name, .. } => name.clone().filter(|n| !n.is_empty()),
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            SourceInput::File(path) => Some(path),
            SourceInput::Text { .. } => None,
        }
    }

    fn read(&self) -> Result<String, OutlineError> {
        match self {
            SourceInput::File(path) => Ok(fs::read_to_string(path)?),
            SourceInput::Text { text, .. } => Ok(text.clone()),
        }
    }

    /// Class name given to a Razor code section: the file stem
    fn component_name(&self) -> Option<String> {
        let key = self.file_key()?;
        let stem = Path::new(&key).file_stem()?.to_string_lossy().replace('-', "_");
        (!stem.is_empty()).then_some(stem)
    }
}

/// Main outline generator
pub struct OutlineGenerator {
    registry: MapperRegistry,
    factory: MapperFactory,
    bookmarks: Arc<dyn BookmarkStore>,
    retry: RetryPolicy,
    background_purge: bool,
}

impl OutlineGenerator {
    /// Create a generator with the default registry and retry policy
    pub fn new(bookmarks: Arc<dyn BookmarkStore>) -> Self {
        Self {
            registry: MapperRegistry::default(),
            factory: Arc::new(create_mapper),
            bookmarks,
            retry: RetryPolicy::default(),
            background_purge: true,
        }
    }

    /// Set the extension registry (builder pattern)
    pub fn with_registry(mut self, registry: MapperRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set how mappers are built for each attempt (builder pattern)
    pub fn with_mapper_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Language) -> Result<Box<dyn Mapper>, MapperError> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// Set the retry policy (builder pattern)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the bookmark purge on a background thread or inline (builder pattern)
    pub fn with_background_purge(mut self, background: bool) -> Self {
        self.background_purge = background;
        self
    }

    pub fn bookmarks(&self) -> &Arc<dyn BookmarkStore> {
        &self.bookmarks
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    /// Generate the outline for one source
    ///
    /// Unsupported extensions are reported without retrying. Any other failure
    /// is retried per the retry policy; the last error is returned verbatim.
    pub fn generate(&self, input: &SourceInput, options: &OutlineOptions) -> OutlineOutcome {
        let extension = input.extension();
        let Some(language) = self.registry.resolve(&extension) else {
            info!(extension = %extension, "no mapper registered for extension");
            return OutlineOutcome::Unsupported { extension };
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(input, language, options) {
                Ok(mut outline) => {
                    outline.attempts = attempt;
                    return OutlineOutcome::Ready(outline);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "outline attempt failed");
                    last_error = e.to_string();
                    if attempt < max_attempts && !self.retry.delay.is_zero() {
                        thread::sleep(self.retry.delay);
                    }
                }
            }
        }

        OutlineOutcome::Failed {
            message: last_error,
            attempts: max_attempts,
        }
    }

    fn attempt(
        &self,
        input: &SourceInput,
        language: Language,
        options: &OutlineOptions,
    ) -> Result<Outline, OutlineError> {
        let start = Instant::now();
        let source = input.read()?;

        let mut mapper = (self.factory)(language)?;
        debug!(language = language.display_name(), "mapping source");

        let mut map_options = MapOptions::new(options.show_method_signatures);
        if let Some(name) = input.component_name() {
            map_options = map_options.with_component_name(name);
        }
        let output = mapper.map(&source, &map_options)?;

        let mut forest = output.members;
        forest.sort_by_key(|m| m.start_line);
        debug!(members = forest.len(), errors = output.errors.len(), "mapped");

        if let Some(from_line) = output.code_start_line {
            let syntax = mapper.region_syntax();
            let placed = regions::resolve(&source, &syntax, from_line, &output.scopes, &mut forest);
            debug!(regions = placed, "regions resolved");
        }

        assign_ids(&mut forest);

        let file_key = input.file_key();
        if let Some(key) = &file_key {
            for root in forest.iter_mut() {
                root.visit_mut(&mut |m| m.color_tag = self.bookmarks.read(key, &m.id));
            }
        }
        let ids = collect_ids(&forest);

        let tree = nest(forest);
        let items = emit(&tree, options, mapper.encodes_containment());

        if let Some(key) = file_key {
            self.schedule_purge(key, ids);
        }

        Ok(Outline {
            path: input.path().map(Path::to_path_buf),
            language,
            total_lines: source.lines().count(),
            items,
            errors: output.errors,
            attempts: 1,
            metadata: OutlineMetadata {
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: chrono::Utc::now().to_rfc3339(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    /// Drop bookmarks for identities no longer present in the file
    fn schedule_purge(&self, file_key: String, ids: Vec<String>) {
        let store = Arc::clone(&self.bookmarks);
        let purge = move || match store.purge(&file_key, &ids) {
            Ok(0) => {}
            Ok(removed) => debug!(file = %file_key, removed, "purged stale bookmarks"),
            Err(e) => warn!(file = %file_key, error = %e, "bookmark purge failed"),
        };
        if self.background_purge {
            rayon::spawn(purge);
        } else {
            purge();
        }
    }
}

/// Move nested containers under the container their parent path names
///
/// Mappers emit nested containers as top-level entries; afterwards every
/// container owns its nested containers, ordered by line with the rest.
fn nest(forest: Vec<Member>) -> Vec<Member> {
    let owners: HashSet<ParentPath> = forest
        .iter()
        .filter(|m| m.kind.is_container())
        .map(Member::child_path)
        .collect();

    let (mut pool, mut roots): (Vec<Member>, Vec<Member>) = forest
        .into_iter()
        .partition(|m| m.kind.is_container() && owners.contains(&m.parent_path));

    for root in roots.iter_mut() {
        adopt(root, &mut pool);
    }
    // Orphans whose owner was itself adopted elsewhere stay visible
    roots.extend(pool);
    roots.sort_by_key(|m| m.start_line);
    roots
}

fn adopt(parent: &mut Member, pool: &mut Vec<Member>) {
    if !parent.kind.is_container() || pool.is_empty() {
        return;
    }
    let path = parent.child_path();
    let (mine, rest): (Vec<Member>, Vec<Member>) = std::mem::take(pool)
        .into_iter()
        .partition(|m| m.parent_path == path);
    *pool = rest;
    if mine.is_empty() {
        return;
    }
    for mut child in mine {
        adopt(&mut child, pool);
        parent.children.push(child);
    }
    parent.children.sort_by_key(|m| m.start_line);
}

/// Filter and order the nested forest into outline items
fn emit(forest: &[Member], options: &OutlineOptions, encodes_containment: bool) -> Vec<OutlineItem> {
    let class_filter = if encodes_containment {
        options.class_filter()
    } else {
        None
    };
    let mut emitter = Emitter {
        options,
        items: Vec::new(),
    };
    let loose_allowed = options.containers.others && class_filter.is_none();
    emitter.emit_level(forest, class_filter, loose_allowed);
    emitter.items
}

struct Emitter<'a> {
    options: &'a OutlineOptions,
    items: Vec<OutlineItem>,
}

impl Emitter<'_> {
    /// Emit one level: direct members, regions and nested containers
    fn emit_level(&mut self, members: &[Member], class_filter: Option<&str>, loose_allowed: bool) {
        if !self.options.sort_members {
            for member in members {
                if member.kind.is_container() {
                    self.emit_container(member, class_filter);
                } else if loose_allowed
                    && (member.kind == MemberKind::Region || self.leaf_visible(member))
                {
                    self.push(member);
                }
            }
            return;
        }

        if loose_allowed {
            for leaf in self.sorted_leaves(members) {
                self.push(leaf);
            }
        }
        let mut containers: Vec<&Member> = members.iter().filter(|m| m.kind.is_container()).collect();
        containers.sort_by(|a, b| compare_titles(&a.title(), &b.title()));
        for container in containers {
            self.emit_container(container, class_filter);
        }
    }

    /// Emit a container and its level
    ///
    /// Under a class filter every container is judged by its own title. A
    /// container that does not match but holds a matching nested container is
    /// kept as a bare header: none of its own members or regions are shown.
    fn emit_container(&mut self, container: &Member, class_filter: Option<&str>) {
        if !self.container_visible(container.kind) {
            return;
        }
        let own_members = match class_filter {
            None => true,
            Some(filter) if matches_filter(&container.title(), Some(filter)) => true,
            Some(filter) if self.has_matching_descendant(container, filter) => false,
            Some(_) => return,
        };
        self.push(container);
        self.emit_level(&container.children, class_filter, own_members);
    }

    /// Leaves grouped by category, each category ordered by title
    fn sorted_leaves<'m>(&self, members: &'m [Member]) -> Vec<&'m Member> {
        let visible: Vec<&Member> = members
            .iter()
            .filter(|m| !m.kind.is_container() && m.kind != MemberKind::Region)
            .filter(|m| self.leaf_visible(m))
            .collect();

        let mut callables: Vec<&Member> = visible.iter().copied().filter(|m| m.kind.is_callable()).collect();
        callables.sort_by(|a, b| {
            let a_ctor = a.kind == MemberKind::Constructor;
            let b_ctor = b.kind == MemberKind::Constructor;
            b_ctor
                .cmp(&a_ctor)
                .then_with(|| compare_titles(&a.title(), &b.title()))
        });

        let mut ordered = callables;
        for kind in [MemberKind::Property, MemberKind::Field] {
            let mut group: Vec<&Member> = visible.iter().copied().filter(|m| m.kind == kind).collect();
            group.sort_by(|a, b| compare_titles(&a.title(), &b.title()));
            ordered.extend(group);
        }
        ordered
    }

    fn leaf_visible(&self, member: &Member) -> bool {
        let toggle = match member.kind {
            MemberKind::Constructor | MemberKind::Method => self.options.methods,
            MemberKind::Property => self.options.properties,
            MemberKind::Field => self.options.fields,
            _ => return false,
        };
        toggle.allows(member.is_public) && matches_filter(&member.name, self.options.member_filter())
    }

    /// True when a visible nested container's title matches the class filter
    fn has_matching_descendant(&self, container: &Member, filter: &str) -> bool {
        container.children.iter().any(|child| {
            child.kind.is_container()
                && self.container_visible(child.kind)
                && (matches_filter(&child.title(), Some(filter))
                    || self.has_matching_descendant(child, filter))
        })
    }

    fn container_visible(&self, kind: MemberKind) -> bool {
        let toggles = &self.options.containers;
        match kind {
            MemberKind::Class => toggles.classes,
            MemberKind::Interface => toggles.interfaces,
            MemberKind::Struct => toggles.structs,
            _ => toggles.others,
        }
    }

    fn push(&mut self, member: &Member) {
        self.items.push(OutlineItem::from_member(member));
    }
}

/// Case-insensitive order, ties broken by exact text
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Viewer state around a generator
///
/// Every refresh replaces the whole item list. The error message holds the
/// last failure verbatim and is cleared by the next success.
pub struct OutlineSession {
    generator: OutlineGenerator,
    items: Vec<OutlineItem>,
    error_message: Option<String>,
}

impl OutlineSession {
    pub fn new(generator: OutlineGenerator) -> Self {
        Self {
            generator,
            items: Vec::new(),
            error_message: None,
        }
    }

    /// Regenerate the outline and replace the current state
    pub fn refresh(&mut self, input: &SourceInput, options: &OutlineOptions) -> OutlineOutcome {
        self.items.clear();
        let outcome = self.generator.generate(input, options);
        match &outcome {
            OutlineOutcome::Ready(outline) => {
                self.items = outline.items.clone();
                self.error_message = None;
            }
            OutlineOutcome::Unsupported { extension } => {
                self.error_message = Some(format!("Unsupported file type: .{}", extension));
            }
            OutlineOutcome::Failed { message, .. } => {
                self.error_message = Some(message.clone());
            }
        }
        outcome
    }

    pub fn items(&self) -> &[OutlineItem] {
        &self.items
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.error_message = None;
    }

    pub fn generator(&self) -> &OutlineGenerator {
        &self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::MemoryBookmarkStore;
    use crate::config::ContainerToggles;
    use crate::mappers::MapOutput;
    use crate::regions::RegionSyntax;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn generator() -> OutlineGenerator {
        OutlineGenerator::new(Arc::new(MemoryBookmarkStore::new()))
            .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
            .with_background_purge(false)
    }

    fn outline(text: &str, extension: &str, options: &OutlineOptions) -> Outline {
        generator()
            .generate(&SourceInput::text(text, extension), options)
            .into_outline()
            .unwrap()
    }

    fn titles(outline: &Outline) -> Vec<String> {
        outline.items.iter().map(|i| i.title.clone()).collect()
    }

    const REGIONS: &str = r#"
class Program
{
    public int PropB { get; set; }
    #region Fields
    int FieldCB;
    int FieldB;
    #endregion
    public int PropA { get; set; }
}
"#;

    const NESTED_REGIONS: &str = r#"
class Program
{
    #region Fields
    int FieldC;
    #region Constants
    const int Id = 1;
    #endregion
    int FieldB;
    #endregion
    public int PropA { get; set; }
}
"#;

    const NESTED_CLASSES: &str = r#"
class Root
{
    class l1_class2 { }
    class l1_class1
    {
        class l2_class2 { }
        class l2_class1 { }
    }
}
"#;

    const OUTER_INNER: &str = r#"
class Outer
{
    void OuterMethod() { }
    class Inner
    {
        void InnerMethod() { }
    }
}
"#;

    /// Fails its first `failures` calls, then maps a single class
    struct FlakyMapper {
        calls: Arc<AtomicUsize>,
        failures: usize,
    }

    impl Mapper for FlakyMapper {
        fn language(&self) -> Language {
            Language::CSharp
        }

        fn map(&mut self, _source: &str, _options: &MapOptions) -> Result<MapOutput, MapperError> {
            if self.calls.fetch_add(1, AtomicOrdering::SeqCst) < self.failures {
                return Err(MapperError::ParseError("file is locked".to_string()));
            }
            Ok(MapOutput::whole_file(vec![Member::new(
                MemberKind::Class,
                "Recovered",
                0,
            )]))
        }

        fn region_syntax(&self) -> RegionSyntax {
            RegionSyntax::DIRECTIVE
        }
    }

    fn flaky_generator(calls: &Arc<AtomicUsize>, failures: usize, delay: Duration) -> OutlineGenerator {
        let counter = Arc::clone(calls);
        OutlineGenerator::new(Arc::new(MemoryBookmarkStore::new()))
            .with_retry_policy(RetryPolicy::new(3, delay))
            .with_background_purge(false)
            .with_mapper_factory(move |language| match language {
                Language::CSharp => {
                    let mapper: Box<dyn Mapper> = Box::new(FlakyMapper {
                        calls: Arc::clone(&counter),
                        failures,
                    });
                    Ok(mapper)
                }
                other => Err(MapperError::UnsupportedLanguage(
                    other.display_name().to_string(),
                )),
            })
    }

    #[test]
    fn test_unsorted_keeps_declaration_order_with_regions() {
        let options = OutlineOptions::new().with_sort_members(false);
        let result = outline(REGIONS, "cs", &options);
        assert_eq!(
            titles(&result),
            vec!["Program", "PropB", "<Fields>", "FieldCB", "FieldB", "</Fields>", "PropA"]
        );
    }

    #[test]
    fn test_nested_regions_preserve_order() {
        let options = OutlineOptions::new().with_sort_members(false);
        let result = outline(NESTED_REGIONS, "cs", &options);
        assert_eq!(
            titles(&result),
            vec![
                "Program",
                "<Fields>",
                "FieldC",
                "<Constants>",
                "Id",
                "</Constants>",
                "FieldB",
                "</Fields>",
                "PropA",
            ]
        );

        let depths: Vec<usize> = result
            .items
            .iter()
            .filter_map(|i| i.region.as_ref().map(|r| r.depth))
            .collect();
        assert_eq!(depths, vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_sorted_mode_orders_categories_and_drops_regions() {
        let result = outline(REGIONS, "cs", &OutlineOptions::default());
        assert_eq!(
            titles(&result),
            vec!["Program", "PropA", "PropB", "FieldB", "FieldCB"]
        );
    }

    #[test]
    fn test_sorted_nested_containers_alphabetical_at_every_depth() {
        let result = outline(NESTED_CLASSES, "cs", &OutlineOptions::default());
        assert_eq!(
            titles(&result),
            vec!["Root", "l1_class1", "l2_class1", "l2_class2", "l1_class2"]
        );
        let depths: Vec<usize> = result.items.iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1]);
    }

    #[test]
    fn test_constructors_sort_before_methods() {
        let source = r#"
class Shop
{
    public void Buy() { }
    public Shop() { }
    public void Add() { }
}
"#;
        let result = outline(source, "cs", &OutlineOptions::default());
        assert_eq!(titles(&result), vec!["Shop", "Shop()", "Add()", "Buy()"]);
    }

    #[test]
    fn test_overload_ids_are_unique() {
        let source = r#"
static void Main()
{
}

class Program
{
    void Test() { }
    void Test(int a) { }
    void Test(int a, int b) { }
}
"#;
        let result = outline(source, "cs", &OutlineOptions::default());
        let ids: HashSet<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), result.items.len());
        assert_eq!(
            result.items.iter().filter(|i| i.kind.is_callable()).count(),
            4
        );
    }

    #[test]
    fn test_visibility_toggles_remove_exactly_one_category() {
        let source = r#"
class Mixed
{
    public int A;
    int B;
    public int P { get; set; }
    void M() { }
}
"#;
        let all = outline(source, "cs", &OutlineOptions::default());
        let filtered = outline(source, "cs", &OutlineOptions::new().with_fields(true, false));

        let all_titles = titles(&all);
        let filtered_titles = titles(&filtered);
        assert_eq!(all_titles.len(), filtered_titles.len() + 1);
        assert!(!filtered_titles.contains(&"B".to_string()));

        let none = outline(source, "cs", &OutlineOptions::new().with_methods(false, false));
        assert!(!titles(&none).contains(&"M()".to_string()));
    }

    #[test]
    fn test_name_filters_are_case_insensitive_substrings() {
        let source = r#"
namespace App
{
    class OrderService
    {
        public void PlaceOrder() { }
        public void Cancel() { }
    }
    class Logger
    {
        public void Write() { }
    }
}
"#;
        let options = OutlineOptions::new()
            .with_class_filter("service")
            .with_member_filter("ORDER");
        let result = outline(source, "cs", &options);
        assert_eq!(titles(&result), vec!["OrderService", "PlaceOrder()"]);
        assert_eq!(result.items[0].id, "App|OrderService");
    }

    #[test]
    fn test_class_filter_judges_each_container_by_its_own_title() {
        let unsorted = OutlineOptions::new().with_sort_members(false);

        let inner = outline(OUTER_INNER, "cs", &unsorted.clone().with_class_filter("inner"));
        assert_eq!(titles(&inner), vec!["Outer", "Inner", "InnerMethod()"]);
        let depths: Vec<usize> = inner.items.iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);

        let outer = outline(OUTER_INNER, "cs", &unsorted.with_class_filter("outer"));
        assert_eq!(titles(&outer), vec!["Outer", "OuterMethod()"]);

        let sorted = outline(OUTER_INNER, "cs", &OutlineOptions::new().with_class_filter("INNER"));
        assert_eq!(titles(&sorted), vec!["Outer", "Inner", "InnerMethod()"]);
    }

    #[test]
    fn test_class_filter_ignores_hidden_nested_matches() {
        let source = "class Host\n{\n    void Run() { }\n    interface IMatch { }\n}\n";
        let options = OutlineOptions::new()
            .with_class_filter("match")
            .with_containers(ContainerToggles {
                interfaces: false,
                ..ContainerToggles::default()
            });
        assert!(outline(source, "cs", &options).items.is_empty());
    }

    #[test]
    fn test_container_toggles() {
        let source = "interface IRun { void Run(); }\nstruct Point { public int X; }\nenum Mode { A }\n";
        let options = OutlineOptions::new().with_containers(ContainerToggles {
            interfaces: false,
            others: false,
            ..ContainerToggles::default()
        });
        let result = outline(source, "cs", &options);
        assert_eq!(titles(&result), vec!["Point", "X"]);
    }

    #[test]
    fn test_class_filter_skipped_for_python() {
        let source = "class Greeter:\n    def hello(self):\n        pass\n";
        let result = outline(source, "py", &OutlineOptions::new().with_class_filter("nomatch"));
        assert_eq!(titles(&result), vec!["Greeter", "hello(self)"]);
    }

    #[test]
    fn test_unsupported_extension_is_not_retried() {
        let outcome = generator().generate(&SourceInput::text("x", "txt"), &OutlineOptions::default());
        assert!(matches!(
            outcome,
            OutlineOutcome::Unsupported { ref extension } if extension == "txt"
        ));
    }

    #[test]
    fn test_retry_recovers_within_one_generate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_millis(10);
        let mut session = OutlineSession::new(flaky_generator(&calls, 4, delay));
        let input = SourceInput::text("class Recovered { }", "cs");
        let options = OutlineOptions::default();

        let first = session.refresh(&input, &options);
        assert!(matches!(first, OutlineOutcome::Failed { attempts: 3, .. }));
        assert_eq!(session.error_message(), Some("Failed to parse source code: file is locked"));

        let started = Instant::now();
        let second = session.refresh(&input, &options);
        assert!(started.elapsed() >= delay);
        match second {
            OutlineOutcome::Ready(result) => {
                assert_eq!(result.attempts, 2);
                assert_eq!(titles(&result), vec!["Recovered"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 5);
        assert_eq!(session.error_message(), None);
        assert_eq!(session.items().len(), 1);
    }

    #[test]
    fn test_factory_without_language_reports_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = flaky_generator(&calls, 0, Duration::ZERO);
        let outcome = generator.generate(&SourceInput::text("def a():\n", "py"), &OutlineOptions::default());
        match outcome {
            OutlineOutcome::Failed { message, attempts } => {
                assert_eq!(attempts, 3);
                assert!(message.starts_with("No mapper for language"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_missing_file_fails_after_retries() {
        let dir = TempDir::new().unwrap();
        let input = SourceInput::file(dir.path().join("Missing.cs"));
        let outcome = generator().generate(&input, &OutlineOptions::default());

        match outcome {
            OutlineOutcome::Failed { message, attempts } => {
                assert_eq!(attempts, 3);
                assert!(message.starts_with("IO error"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_bookmarks_joined_and_stale_ones_purged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Program.cs");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "class Program\n{{\n    void Run() {{ }}\n}}").unwrap();

        let store = Arc::new(MemoryBookmarkStore::new());
        let key = path.to_string_lossy().to_string();
        store.store(&key, "Program.Run()", "red").unwrap();
        store.store(&key, "Program.Gone()", "blue").unwrap();

        let generator = OutlineGenerator::new(store.clone()).with_background_purge(false);
        let result = generator
            .generate(&SourceInput::file(&path), &OutlineOptions::default())
            .into_outline()
            .unwrap();

        let run = result.items.iter().find(|i| i.name == "Run").unwrap();
        assert_eq!(run.color_tag.as_deref(), Some("red"));
        assert_eq!(result.path.as_deref(), Some(path.as_path()));
        assert_eq!(store.entries(&key).len(), 1);
    }

    #[test]
    fn test_razor_component_name_from_file_key() {
        let source = "<h1>Hi</h1>\n@code {\n    void Go() { }\n}\n";
        let input = SourceInput::text(source, "razor").with_name("Pages/nav-menu.razor");
        let result = generator()
            .generate(&input, &OutlineOptions::default())
            .into_outline()
            .unwrap();
        assert_eq!(titles(&result), vec!["nav_menu", "Go()"]);
        assert_eq!(result.items[1].start_line, 2);
    }

    #[test]
    fn test_python_regions_at_top_level() {
        let source = "# region Helpers\ndef a():\n    pass\n# endregion\n";
        let result = outline(source, "py", &OutlineOptions::new().with_sort_members(false));
        assert_eq!(titles(&result), vec!["<Helpers>", "a()", "</Helpers>"]);
    }

    #[test]
    fn test_python_prose_comment_is_not_a_region() {
        let source = "# Region lookup helpers are below\nclass A:\n    def m(self):\n        pass\n";
        let result = outline(source, "py", &OutlineOptions::new().with_sort_members(false));
        assert_eq!(titles(&result), vec!["A", "m(self)"]);
    }

    #[test]
    fn test_unclosed_region_stays_at_its_depth() {
        let source = "# region Helpers\nclass A:\n    def m(self):\n        pass\n";
        let result = outline(source, "py", &OutlineOptions::new().with_sort_members(false));
        assert_eq!(titles(&result), vec!["<Helpers>", "A", "m(self)", "</Helpers>"]);

        let regions: Vec<(&str, usize)> = result
            .items
            .iter()
            .filter(|i| i.kind == MemberKind::Region)
            .map(|i| (i.id.as_str(), i.depth))
            .collect();
        assert_eq!(regions, vec![("#region Helpers", 0), ("#endregion Helpers", 0)]);
    }

    #[test]
    fn test_namespace_regions_are_qualified() {
        let source = r#"
namespace App
{
    #region Types
    class X { }
    #endregion
}
namespace Other
{
    #region Types
    class Y { }
    #endregion
}
"#;
        let result = outline(source, "cs", &OutlineOptions::new().with_sort_members(false));
        let ids: Vec<&str> = result
            .items
            .iter()
            .filter(|i| i.kind == MemberKind::Region)
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "App.#region Types",
                "App.#endregion Types",
                "Other.#region Types",
                "Other.#endregion Types",
            ]
        );
    }

    #[test]
    fn test_classes_toggle_hides_script_classes() {
        let source = "class Widget {\n    render() {\n    }\n}\nfunction helper() {\n}\n";
        let options = OutlineOptions::new().with_containers(ContainerToggles {
            classes: false,
            ..ContainerToggles::default()
        });
        assert_eq!(titles(&outline(source, "js", &options)), vec!["helper()"]);
    }

    #[test]
    fn test_session_clears_error_on_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        let mut session = OutlineSession::new(generator());
        let options = OutlineOptions::default();

        session.refresh(&SourceInput::file(&path), &options);
        assert!(session.error_message().is_some());
        assert!(session.items().is_empty());

        fs::write(&path, "function start() {\n}\n").unwrap();
        session.refresh(&SourceInput::file(&path), &options);
        assert_eq!(session.error_message(), None);
        assert_eq!(session.items().len(), 1);

        session.clear();
        assert!(session.items().is_empty());
    }

    #[test]
    fn test_nest_moves_nested_containers_under_owner() {
        let outer = Member::new(MemberKind::Class, "Outer", 0).with_end_line(9);
        let inner = Member::new(MemberKind::Class, "Inner", 2)
            .with_parent(ParentPath::root().child("Outer"));
        let field = Member::new(MemberKind::Field, "x", 1).with_parent(ParentPath::root().child("Outer"));
        let outer = outer.with_children(vec![field]);

        let tree = nest(vec![outer, inner]);
        assert_eq!(tree.len(), 1);
        let names: Vec<&str> = tree[0].children.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["x", "Inner"]);
    }
}
