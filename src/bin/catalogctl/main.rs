//! CLI tool to build and inspect a course catalog stored as an Automerge document.
//!
//! Usage:
//!   catalogctl [--doc catalog.automerge] [--owner NAME] <COMMAND>
//!
//! Modules and contents added without `--order` are appended to their course
//! or module.

mod input;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use coursebook::{CatalogManager, ContentItem, ContentKind, Course, ItemBody, Module, Subject};
use input::InputCatalog;

#[derive(Parser, Debug)]
#[command(
    name = "catalogctl",
    about = "Build and inspect a course catalog Automerge document",
    version
)]
struct Args {
    /// Catalog document path
    #[arg(short, long, env = "COURSEBOOK_DOC", default_value = "catalog.automerge", global = true)]
    doc: PathBuf,

    /// User name that owns created courses and content
    #[arg(short, long, env = "COURSEBOOK_OWNER", default_value = "admin", global = true)]
    owner: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "COURSEBOOK_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty catalog document
    Init {
        /// Overwrite an existing document
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// Import subjects, courses, modules and contents from JSON
    Import {
        /// Input JSON file path
        input: PathBuf,
    },
    /// Add a subject
    AddSubject { title: String, slug: String },
    /// Add a course to a subject
    AddCourse {
        /// Subject ID or slug
        subject: String,
        title: String,
        slug: String,
        #[arg(long, default_value = "")]
        overview: String,
    },
    /// Add a module to a course
    AddModule {
        course_id: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Explicit position (appended when omitted)
        #[arg(long)]
        order: Option<u32>,
    },
    /// Add a content item to a module
    AddContent {
        module_id: String,
        title: String,
        /// Text body, file path or video URL
        payload: String,
        /// text, file, image or video
        #[arg(long, default_value = "text")]
        kind: ContentKind,
        /// Explicit position (appended when omitted)
        #[arg(long)]
        order: Option<u32>,
    },
    /// Print the catalog tree
    List,
    /// Set module positions, e.g. `--set <module-id>=2`
    ReorderModules {
        #[arg(long = "set", value_parser = parse_position, required = true)]
        positions: Vec<(String, u32)>,
    },
    /// Set content positions, e.g. `--set <content-id>=2`
    ReorderContents {
        #[arg(long = "set", value_parser = parse_position, required = true)]
        positions: Vec<(String, u32)>,
    },
    /// Report shared positions and records whose parent is gone
    Verify,
    /// Print the catalog as JSON
    Export,
    /// Merge another catalog document into this one
    Merge { other: PathBuf },
}

fn parse_position(s: &str) -> Result<(String, u32), String> {
    let (id, position) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <id>=<position>, got '{}'", s))?;
    let position = position
        .parse()
        .map_err(|e| format!("invalid position '{}': {}", position, e))?;
    Ok((id.to_string(), position))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn load(path: &Path) -> Result<CatalogManager> {
    if !path.exists() {
        anyhow::bail!(
            "Catalog document does not exist: {} (run `catalogctl init`)",
            path.display()
        );
    }
    let bytes = std::fs::read(path).context("Failed to read catalog document")?;
    let manager = CatalogManager::from_bytes(&bytes).context("Failed to load catalog document")?;
    debug!(path = %path.display(), bytes = bytes.len(), "loaded catalog");
    Ok(manager)
}

fn store(manager: &mut CatalogManager, path: &Path) -> Result<()> {
    let bytes = manager.save();
    std::fs::write(path, &bytes).context("Failed to write catalog document")?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved catalog");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let doc = args.doc.as_path();
    let owner = args.owner.as_str();

    match args.command {
        Command::Init { force } => {
            if doc.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", doc.display());
            }
            store(&mut CatalogManager::new(), doc)?;
            println!("Created {}", doc.display());
        }

        Command::Import { input } => {
            let json = std::fs::read_to_string(&input).context("Failed to read input file")?;
            let catalog: InputCatalog = serde_json::from_str(&json).context("Failed to parse JSON")?;

            let mut manager = if doc.exists() { load(doc)? } else { CatalogManager::new() };
            let stats = catalog.import_into(&mut manager, owner)?;
            store(&mut manager, doc)?;

            info!(?stats, "import finished");
            println!("Imported {} → {}", input.display(), doc.display());
            println!("  Subjects: {}", stats.subjects);
            println!("  Courses:  {}", stats.courses);
            println!("  Modules:  {}", stats.modules);
            println!("  Contents: {}", stats.contents);
        }

        Command::AddSubject { title, slug } => {
            let mut manager = load(doc)?;
            let subject = manager.create_subject(Subject::new(title, slug))?;
            store(&mut manager, doc)?;
            println!("{}", subject.id);
        }

        Command::AddCourse {
            subject,
            title,
            slug,
            overview,
        } => {
            let mut manager = load(doc)?;
            let subject_id = manager
                .list_subjects()?
                .into_iter()
                .find(|s| s.id == subject || s.slug == subject)
                .map(|s| s.id)
                .with_context(|| format!("No subject with ID or slug '{}'", subject))?;
            let course = Course::new(owner, subject_id, title, slug)
                .with_overview(overview)
                .with_created_at(now_millis());
            let course = manager.create_course(course)?;
            store(&mut manager, doc)?;
            println!("{}", course.id);
        }

        Command::AddModule {
            course_id,
            title,
            description,
            order,
        } => {
            let mut manager = load(doc)?;
            let mut module = Module::new(course_id, title).with_description(description);
            module.order = order;
            let module = manager.create_module(owner, module)?;
            store(&mut manager, doc)?;
            println!("{} {}", module.id, module.order.unwrap_or_default());
        }

        Command::AddContent {
            module_id,
            title,
            payload,
            kind,
            order,
        } => {
            let mut manager = load(doc)?;
            let item = ContentItem::new(owner, title, ItemBody::from_kind(kind, payload))
                .with_timestamp(now_millis());
            let content = manager.create_content(owner, &module_id, item, order)?;
            store(&mut manager, doc)?;
            println!("{} {}", content.id, content.order.unwrap_or_default());
        }

        Command::List => {
            let mut manager = load(doc)?;
            print_tree(&mut manager)?;
        }

        Command::ReorderModules { positions } => {
            let mut manager = load(doc)?;
            let positions: HashMap<String, u32> = positions.into_iter().collect();
            let moved = manager.reorder_modules(owner, &positions)?;
            store(&mut manager, doc)?;
            println!("Moved {} module(s)", moved);
        }

        Command::ReorderContents { positions } => {
            let mut manager = load(doc)?;
            let positions: HashMap<String, u32> = positions.into_iter().collect();
            let moved = manager.reorder_contents(owner, &positions)?;
            store(&mut manager, doc)?;
            println!("Moved {} content(s)", moved);
        }

        Command::Verify => {
            let mut manager = load(doc)?;
            let report = manager.integrity_report()?;
            if report.is_empty() {
                println!("✓ No integrity problems");
                return Ok(());
            }
            for (entity, dup) in &report.duplicates {
                println!(
                    "{} position {} held {} times in scope {}",
                    entity, dup.position, dup.count, dup.scope
                );
            }
            for orphan in &report.orphans {
                println!("{} {} is orphaned: missing {}", orphan.entity, orphan.id, orphan.parent);
            }
            anyhow::bail!(
                "{} duplicate position(s), {} orphan(s) found",
                report.duplicates.len(),
                report.orphans.len()
            );
        }

        Command::Export => {
            let mut manager = load(doc)?;
            println!("{}", manager.to_json()?);
        }

        Command::Merge { other } => {
            let mut manager = load(doc)?;
            let mut other_manager = load(&other)?;
            manager
                .merge(&mut other_manager)
                .context("Failed to merge documents")?;
            store(&mut manager, doc)?;
            println!("Merged {} → {}", other.display(), doc.display());

            let problems = manager.integrity_report()?.len();
            if problems > 0 {
                println!(
                    "{} integrity problem(s) after merge; run `catalogctl verify`",
                    problems
                );
            }
        }
    }

    Ok(())
}

fn print_tree(manager: &mut CatalogManager) -> Result<()> {
    let state = manager.get_state()?;
    for subject in manager.list_subjects()? {
        println!("{} [{}]", subject, subject.slug);

        let mut courses: Vec<&Course> = state
            .courses
            .values()
            .filter(|c| c.subject_id == subject.id)
            .collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));

        for course in courses {
            println!("  {} [{}] by {} ({})", course.title, course.slug, course.owner, course.id);
            for module in manager.modules_of(&course.id)? {
                println!("    {} ({})", module, module.id);
                for (content, item) in manager.items_of(&module.id)? {
                    println!(
                        "      {}. [{}] {} ({})",
                        content.order.unwrap_or_default(),
                        content.kind,
                        item.title,
                        content.id
                    );
                }
            }
        }
    }
    Ok(())
}
