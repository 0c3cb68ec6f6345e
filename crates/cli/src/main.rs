//! codemap CLI
//!
//! Prints the code map of a single source file and manages the bookmarks
//! attached to its members.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codemap_core::{
    format_outline, BookmarkStore, JsonBookmarkStore, OutlineGenerator, OutlineOptions,
    OutlineOutcome, OutputFormat, SourceInput,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Code map for C#, Razor, Python, JavaScript/TypeScript and CSS files
#[derive(Parser)]
#[command(name = "codemap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Navigable outline of a source file: types, members and regions")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = r#"
codemap: Source Code Map

Lists the classes, methods, properties, fields, nested types and regions of a
source file in declaration or alphabetical order. Members keep a stable id
across edits so bookmarks stay attached to them.

Supports:
  - C# (.cs) and Razor components (.razor, @code section)
  - Python (.py, .pyw, .pyi)
  - JavaScript (.js, .mjs, .cjs, .jsx)
  - TypeScript (.ts, .mts, .cts, .tsx)
  - CSS (.css)

Examples:
  codemap src/Program.cs                          # JSON outline
  codemap --format ansi src/Program.cs            # Colorful terminal output
  codemap --no-sort --hide private-fields app.py  # Declaration order
  codemap --class-filter service Orders.cs        # Only matching types
  codemap bookmark set src/Program.cs "Program.Main()" red
"#)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub outline: OutlineArgs,

    /// Bookmark store (default: <data dir>/codemap/bookmarks.json)
    #[arg(long, global = true)]
    pub bookmarks: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options of an outline run
#[derive(clap::Args, Clone, Debug)]
pub struct OutlineArgs {
    /// Source file
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
    pub format: OutputFormatArg,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML file with outline options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep declaration order instead of sorting alphabetically
    #[arg(long)]
    pub no_sort: bool,

    /// Show `(...)` instead of parameter lists
    #[arg(long)]
    pub hide_signatures: bool,

    /// Only types whose name contains this text (case-insensitive)
    #[arg(long)]
    pub class_filter: Option<String>,

    /// Only members whose name contains this text (case-insensitive)
    #[arg(long)]
    pub member_filter: Option<String>,

    /// Hide a member category or container kind (can be specified multiple times)
    #[arg(long, value_enum, action = clap::ArgAction::Append)]
    pub hide: Vec<HideArg>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the outline of a file
    Outline(OutlineArgs),

    /// Manage member bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
}

/// Bookmark operations
#[derive(Subcommand)]
pub enum BookmarkAction {
    /// Attach a color tag to a member id
    Set {
        file: PathBuf,
        id: String,
        color: String,
    },

    /// Remove every bookmark of a file
    Clear { file: PathBuf },

    /// List the bookmarks of a file
    List { file: PathBuf },
}

/// Output format argument
#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Ansi,
    Summary,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
            OutputFormatArg::Summary => OutputFormat::Summary,
        }
    }
}

/// Toggle switched off by `--hide`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HideArg {
    PublicMethods,
    PrivateMethods,
    PublicProperties,
    PrivateProperties,
    PublicFields,
    PrivateFields,
    Classes,
    Interfaces,
    Structs,
    Others,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let bookmarks = bookmark_path(args.bookmarks.as_deref())?;
    match &args.command {
        Some(Commands::Outline(outline)) => run_outline(outline, &bookmarks),
        Some(Commands::Bookmark { action }) => run_bookmark(action, &bookmarks),
        None => run_outline(&args.outline, &bookmarks),
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn bookmark_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let base = dirs::data_local_dir().context("Could not determine the local data directory")?;
    Ok(base.join("codemap").join("bookmarks.json"))
}

/// Canonical form of a source path, so bookmark keys do not depend on the cwd
fn source_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Build outline options from the config file and flags
fn build_options(args: &OutlineArgs) -> Result<OutlineOptions> {
    let mut options = match &args.config {
        Some(path) => OutlineOptions::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OutlineOptions::default(),
    };

    if args.no_sort {
        options = options.with_sort_members(false);
    }
    if args.hide_signatures {
        options = options.with_signatures(false);
    }
    if let Some(filter) = &args.class_filter {
        options = options.with_class_filter(filter.clone());
    }
    if let Some(filter) = &args.member_filter {
        options = options.with_member_filter(filter.clone());
    }

    for hide in &args.hide {
        match hide {
            HideArg::PublicMethods => options.methods.public = false,
            HideArg::PrivateMethods => options.methods.private = false,
            HideArg::PublicProperties => options.properties.public = false,
            HideArg::PrivateProperties => options.properties.private = false,
            HideArg::PublicFields => options.fields.public = false,
            HideArg::PrivateFields => options.fields.private = false,
            HideArg::Classes => options.containers.classes = false,
            HideArg::Interfaces => options.containers.interfaces = false,
            HideArg::Structs => options.containers.structs = false,
            HideArg::Others => options.containers.others = false,
        }
    }

    Ok(options)
}

fn run_outline(args: &OutlineArgs, bookmarks: &Path) -> Result<()> {
    let Some(file) = &args.file else {
        bail!("No source file given (see --help)");
    };
    let options = build_options(args)?;

    let store = JsonBookmarkStore::open(bookmarks)
        .with_context(|| format!("Failed to open bookmark store {}", bookmarks.display()))?;
    // Purge inline: the process exits right after printing
    let generator = OutlineGenerator::new(Arc::new(store)).with_background_purge(false);

    let input = SourceInput::file(source_key(file));
    debug!(file = %file.display(), "generating outline");

    let outline = match generator.generate(&input, &options) {
        OutlineOutcome::Ready(outline) => outline,
        OutlineOutcome::Unsupported { extension } => {
            bail!("Unsupported file type '.{}': {}", extension, file.display())
        }
        OutlineOutcome::Failed { message, attempts } => {
            bail!(
                "Failed to map {} after {} attempt(s): {}",
                file.display(),
                attempts,
                message
            )
        }
    };

    let output = format_outline(&outline, args.format.clone().into())
        .context("Failed to format outline")?;
    write_output(&output, args.output.as_ref())?;

    Ok(())
}

fn run_bookmark(action: &BookmarkAction, bookmarks: &Path) -> Result<()> {
    let store = JsonBookmarkStore::open(bookmarks)
        .with_context(|| format!("Failed to open bookmark store {}", bookmarks.display()))?;

    match action {
        BookmarkAction::Set { file, id, color } => {
            let key = source_key(file).to_string_lossy().to_string();
            store
                .store(&key, id, color)
                .context("Failed to store bookmark")?;
        }
        BookmarkAction::Clear { file } => {
            let key = source_key(file).to_string_lossy().to_string();
            store.clear(&key).context("Failed to clear bookmarks")?;
        }
        BookmarkAction::List { file } => {
            let key = source_key(file).to_string_lossy().to_string();
            for (id, color) in store.entries(&key) {
                println!("{}\t{}", color, id);
            }
        }
    }

    Ok(())
}

fn write_output(output: &str, path: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, output).context("Failed to write output file")?;
    } else {
        println!("{}", output);
    }
    Ok(())
}
