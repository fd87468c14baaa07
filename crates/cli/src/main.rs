//! arbor command-line tool.
//!
//! Provides subcommands for initializing a repository in a directory,
//! committing its files, moving between branches, inspecting history, and
//! merging branches with three-way conflict markers.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use arbor_core::config::{ArborConfig, StoreBackend, METADATA_DIR};
use arbor_core::objects::HEAD;
use arbor_core::repository::Repository;
use arbor_core::staging::FsStaging;
use arbor_core::store::{MemoryObjectStore, ObjectStore, SqliteObjectStore};

type CliRepo = Repository<Box<dyn ObjectStore>, FsStaging>;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// A small content-addressed version-control tool.
#[derive(Parser, Debug)]
#[command(name = "arbor", version, about = "Track, branch and merge a directory of text files")]
struct Cli {
    /// Repository root directory.
    #[arg(short, long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Minimum log level (overrides `logging.log_level` in the config).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the metadata directory and a default configuration.
    Init,

    /// Show files added, modified or deleted since the HEAD commit.
    Status,

    /// Record the working tree as a new commit.
    Commit {
        /// Commit message.
        #[arg(short, long)]
        message: String,

        /// Record a merge commit with this reference as the second parent.
        #[arg(long)]
        merge: Option<String>,
    },

    /// Create a branch at the HEAD commit.
    Branch {
        /// Branch name.
        name: String,
    },

    /// Switch the working tree to a branch or commit.
    Checkout {
        /// Branch name or commit id.
        reference: String,
    },

    /// Show commit history, breadth-first from a reference.
    Log {
        /// Starting reference (defaults to HEAD).
        reference: Option<String>,

        /// Maximum number of commits to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Merge a branch or commit into the working tree.
    Merge {
        /// Branch name or commit id to merge into HEAD.
        reference: String,

        /// Print the merge report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Restore one file from a commit into the working tree.
    Restore {
        /// Branch name or commit id to restore from.
        reference: String,

        /// Path of the file, relative to the repository root.
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is optional here: `init` runs before it exists.
    let config = ArborConfig::load_and_resolve(ArborConfig::path_for(&cli.repo)).ok();
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.logging.log_level.clone()))
        .unwrap_or_else(|| "warn".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init = cli.command {
        return cmd_init(&cli.repo);
    }

    let mut repo = open_repository(&cli.repo)?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Status => cmd_status(&repo),
        Commands::Commit { message, merge } => cmd_commit(&mut repo, &message, merge.as_deref()),
        Commands::Branch { name } => cmd_branch(&mut repo, &name),
        Commands::Checkout { reference } => cmd_checkout(&mut repo, &reference),
        Commands::Log { reference, limit } => {
            cmd_log(&repo, reference.as_deref().unwrap_or(HEAD), limit)
        }
        Commands::Merge { reference, json } => cmd_merge(&mut repo, &reference, json),
        Commands::Restore { reference, path } => cmd_restore(&mut repo, &reference, &path),
    }
}

// ---------------------------------------------------------------------------
// Repository helpers
// ---------------------------------------------------------------------------

fn load_config(root: &Path) -> Result<ArborConfig> {
    let path = ArborConfig::path_for(root);
    if !path.exists() {
        anyhow::bail!(
            "not an arbor repository: {} (run `arbor init` first)",
            root.display()
        );
    }
    ArborConfig::load_and_resolve(&path).context("failed to load configuration file")
}

fn open_store(root: &Path, config: &ArborConfig) -> Result<Box<dyn ObjectStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let db_path = config.store.database_path(root);
            debug!(path = %db_path.display(), "opening sqlite object store");
            let store = SqliteObjectStore::open(&db_path).context("failed to open object store")?;
            Ok(Box::new(store))
        }
        StoreBackend::Memory => {
            eprintln!(
                "{}",
                style::warn("store.backend is \"memory\": nothing will be persisted")
            );
            Ok(Box::new(MemoryObjectStore::new()))
        }
    }
}

fn open_repository(root: &Path) -> Result<CliRepo> {
    let config = load_config(root)?;
    let store = open_store(root, &config)?;
    Repository::init(store, FsStaging::new(root), config).context("failed to open repository")
}

/// `branch` or `detached at <id>`, for headings.
fn describe_head(repo: &CliRepo) -> Result<String> {
    Ok(match repo.current_branch()? {
        Some(branch) => branch,
        None => format!("detached at {}", style::short_id(repo.head()?.reference())),
    })
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(root: &Path) -> Result<()> {
    let metadata = root.join(METADATA_DIR);
    std::fs::create_dir_all(&metadata)
        .with_context(|| format!("failed to create {}", metadata.display()))?;

    let config_path = ArborConfig::path_for(root);
    let config = if config_path.exists() {
        println!("{}", style::dim("Configuration already exists, keeping it."));
        ArborConfig::load_and_resolve(&config_path).context("failed to load configuration file")?
    } else {
        let config = ArborConfig::default();
        let rendered = config.to_toml_string().context("failed to render configuration")?;
        std::fs::write(&config_path, rendered).context("failed to write config file")?;
        config
    };

    let branch = config.repository.default_branch.clone();
    let store = open_store(root, &config)?;
    Repository::init(store, FsStaging::new(root), config).context("failed to initialize repository")?;

    println!(
        "{}",
        style::success(&format!(
            "Initialized arbor repository in {} (branch {})",
            metadata.display(),
            branch
        ))
    );
    Ok(())
}

fn cmd_status(repo: &CliRepo) -> Result<()> {
    println!("{}", style::header(&format!("On {}", describe_head(repo)?)));
    if repo.head_commit()?.is_none() {
        println!("{}", style::dim("No commits yet"));
    }

    let status = repo.status().context("failed to compare working tree")?;
    if status.is_clean() {
        println!("Nothing to commit, working tree clean.");
        return Ok(());
    }

    println!();
    for path in &status.added {
        println!("{}", style::path_change('A', path));
    }
    for path in &status.modified {
        println!("{}", style::path_change('M', path));
    }
    for path in &status.deleted {
        println!("{}", style::path_change('D', path));
    }
    Ok(())
}

fn cmd_commit(repo: &mut CliRepo, message: &str, merge: Option<&str>) -> Result<()> {
    let commit = match merge {
        Some(other) => repo
            .commit_merge(message, other)
            .with_context(|| format!("failed to record merge with {}", other))?,
        None => repo.commit(message).context("failed to record commit")?,
    };
    println!(
        "[{} {}] {}",
        describe_head(repo)?,
        style::short_id(commit.id()),
        commit.summary()
    );
    Ok(())
}

fn cmd_branch(repo: &mut CliRepo, name: &str) -> Result<()> {
    let label = repo.create_branch(name)?;
    println!(
        "{}",
        style::success(&format!(
            "Created branch {} at {}",
            label.name(),
            style::short_id(label.reference())
        ))
    );
    Ok(())
}

fn cmd_checkout(repo: &mut CliRepo, reference: &str) -> Result<()> {
    let status = repo.status()?;
    if !status.is_clean() {
        println!(
            "{}",
            style::warn("Uncommitted changes in the working tree will be overwritten.")
        );
    }
    let commit = repo
        .checkout(reference)
        .with_context(|| format!("failed to check out {}", reference))?;
    println!(
        "{}",
        style::success(&format!(
            "Switched to {} ({})",
            describe_head(repo)?,
            style::short_id(commit.id())
        ))
    );
    Ok(())
}

fn cmd_log(repo: &CliRepo, reference: &str, limit: usize) -> Result<()> {
    let history = repo
        .history(reference)
        .with_context(|| format!("failed to read history of {}", reference))?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Date", "Author", "Message"]);

    for commit in history.take(limit) {
        let commit = commit?;
        let message = if commit.is_merge() {
            Cell::new(format!("{} (merge)", commit.summary())).fg(comfy_table::Color::Cyan)
        } else {
            Cell::new(commit.summary())
        };
        table.add_row(vec![
            Cell::new(commit.id().get(..12).unwrap_or(commit.id())).fg(comfy_table::Color::Yellow),
            Cell::new(commit.date().format("%Y-%m-%d %H:%M:%S")),
            Cell::new(commit.author()),
            message,
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn cmd_merge(repo: &mut CliRepo, reference: &str, json: bool) -> Result<()> {
    let head = repo
        .head_commit()?
        .ok_or_else(|| anyhow::anyhow!("no commits yet on the current branch"))?;
    let other = repo.require_commit(reference)?;
    let ancestor = repo.common_ancestor(head.id(), other.id())?;
    if ancestor.is_some_and(|c| c.id() == other.id()) {
        println!("Already up to date.");
        return Ok(());
    }

    let report = repo
        .merge(HEAD, reference)
        .with_context(|| format!("failed to merge {}", reference))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize merge report")?
        );
    } else {
        for path in &report.merged {
            println!("{}", style::path_change('M', path));
        }
        for path in &report.conflicted {
            println!("{}", style::path_change('C', path));
        }
    }

    if !report.is_clean() {
        anyhow::bail!(
            "merge produced conflicts in {} file(s); resolve them, then run `arbor commit --merge {}`",
            report.conflicted.len(),
            reference
        );
    }

    let commit = repo
        .commit_merge(&format!("Merge {}", reference), reference)
        .context("failed to record merge commit")?;
    if !json {
        println!(
            "{}",
            style::success(&format!("Merged {} as {}", reference, style::short_id(commit.id())))
        );
    }
    Ok(())
}

fn cmd_restore(repo: &mut CliRepo, reference: &str, path: &str) -> Result<()> {
    repo.restore(reference, path)
        .with_context(|| format!("failed to restore {} from {}", path, reference))?;
    println!("{}", style::success(&format!("Restored {} from {}", path, reference)));
    Ok(())
}
