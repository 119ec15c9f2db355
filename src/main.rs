//! ctxgraph - index a folder into a cached graph of summaries.
//!
//! Usage:
//!   ctxgraph scan [PATH]     Scan and hash a folder, report what is indexed
//!   ctxgraph status [PATH]   Compare the stored graph with the folder on disk
//!   ctxgraph show [PATH]     Print the stored graph with its summaries
//!   ctxgraph --help          Show help

mod logging;
mod settings;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};

use ctxgraph_core::{ContextGraph, GraphNode, NodeKind};
use ctxgraph_scan::{Skeleton, scan_tree};
use ctxgraph_sync::{DiffEntry, GraphDiff, GraphStore};

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "ctxgraph",
    version,
    about = "Index a folder into a cached graph of summaries",
    long_about = "ctxgraph scans a folder of notes, hashes every file and folder bottom-up \
                  and keeps a graph of summaries that only needs refreshing where \
                  content actually changed."
)]
struct Cli {
    /// Settings file (defaults to <config_dir>/ctxgraph/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding stored graphs
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a folder and show what would be indexed
    Scan {
        /// Folder to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum number of files and folders
        #[arg(short = 'n', long)]
        max_nodes: Option<usize>,

        /// Relative path to exclude (repeatable)
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,

        /// Print the scanned skeleton as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the stored graph with the folder on disk
    Status {
        /// Indexed folder
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the difference as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored graph
    Show {
        /// Indexed folder
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print the stored document as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let settings = Settings::load(cli.config.as_deref())?;
    tracing::debug!(?settings, "settings loaded");
    let store_dir = cli.store_dir.as_deref();

    match cli.command {
        Command::Scan {
            path,
            max_nodes,
            exclude,
            json,
        } => run_scan(&settings, &path, max_nodes, &exclude, json),
        Command::Status { path, json } => run_status(&settings, store_dir, &path, json),
        Command::Show { path, depth, json } => run_show(&settings, store_dir, &path, depth, json),
    }
}

/// Scan a folder and print counts, warnings and ignored entries.
fn run_scan(
    settings: &Settings,
    path: &Path,
    max_nodes: Option<usize>,
    exclude: &[String],
    json: bool,
) -> Result<()> {
    let root = path.canonicalize().context("Invalid path")?;
    let config = settings.scan_config(&root, max_nodes, exclude)?;

    eprintln!("Scanning {}...", root.display());
    let skeleton = scan_tree(&config).context("Scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&skeleton)?);
        return Ok(());
    }

    let total_bytes: u64 = skeleton.nodes.values().map(file_size).sum();

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", root.display(), format_size(total_bytes));
    println!(
        " {} files, {} folders (limit {})",
        skeleton.counts.files, skeleton.counts.folders, config.max_nodes
    );
    if let Some(hash) = skeleton.root().and_then(|r| r.content_hash) {
        println!(" Root hash {hash}");
    }
    println!(" Scanned in {:.2}s", skeleton.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(60));

    print_scan_issues(&skeleton);
    Ok(())
}

fn print_scan_issues(skeleton: &Skeleton) {
    if !skeleton.ignores.is_empty() {
        let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &skeleton.ignores {
            *by_reason.entry(entry.reason.as_str()).or_default() += 1;
        }

        println!();
        println!(" Ignored {} entries:", skeleton.ignores.len());
        for (reason, count) in by_reason {
            println!("   {reason:<24} {count:>6}");
        }
    }

    if !skeleton.errors.is_empty() {
        println!();
        println!(" {} unreadable file(s):", skeleton.errors.len());
        for error in &skeleton.errors {
            println!("   {error}");
        }
    }

    if skeleton.has_warnings() {
        println!();
        println!(" {} warning(s) during scan:", skeleton.warnings.len());
        for warning in &skeleton.warnings {
            println!("   {}", warning.message);
        }
    }
}

/// Report which nodes a sync would reuse, refresh or drop.
fn run_status(settings: &Settings, store_dir: Option<&Path>, path: &Path, json: bool) -> Result<()> {
    let root = path.canonicalize().context("Invalid path")?;
    let config = settings.scan_config(&root, None, &[])?;
    let store = settings.store_for(store_dir, &root);

    let previous = store.load();
    let skeleton = scan_tree(&config).context("Scan failed")?;
    let diff = GraphDiff::compute(
        &previous.map(|graph| graph.nodes).unwrap_or_default(),
        &skeleton,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    println!(" Store: {}", store.path().display());
    if let Some(error) = store.last_error() {
        println!(" Stored graph unusable: {error}");
    }

    println!(
        " {} unchanged, {} changed, {} new, {} deleted",
        diff.unchanged.len(),
        diff.changed.len(),
        diff.new.len(),
        diff.deleted.len()
    );

    print_entries("~", &diff.changed);
    print_entries("+", &diff.new);
    print_entries("-", &diff.deleted);

    if diff.is_clean() && diff.pending() == 0 {
        println!(" Graph is up to date.");
    } else {
        println!(" Up to {} node(s) need summarizing.", diff.pending());
    }
    Ok(())
}

fn print_entries(marker: &str, entries: &[DiffEntry]) {
    for entry in entries {
        println!("   {marker} {:<6} {}", entry.node_type.as_str(), display_path(&entry.relative_path));
    }
}

/// Print the stored graph as a tree with summaries.
fn run_show(
    settings: &Settings,
    store_dir: Option<&Path>,
    path: &Path,
    depth: Option<usize>,
    json: bool,
) -> Result<()> {
    let root = path.canonicalize().context("Invalid path")?;
    let store = settings.store_for(store_dir, &root);

    let Some(graph) = store.load() else {
        println!(" No graph stored for {}", root.display());
        println!(" Store: {}", store.path().display());
        if let Some(error) = store.last_error() {
            println!(" Last error: {error}");
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    println!("{}", "─".repeat(70));
    println!(" {}", graph.root_path.display());
    println!(
        " {} files, {} folders, model {}, generated {}",
        graph.counts.files,
        graph.counts.folders,
        graph.model,
        graph.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(" Store: {}", store.path().display());
    println!("{}", "─".repeat(70));

    if let Some(root_node) = graph.root() {
        print_node(&graph, root_node, 0, depth.unwrap_or(usize::MAX));
    }
    Ok(())
}

/// Print a node, its summary and its children.
fn print_node(graph: &ContextGraph, node: &GraphNode, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);

    let label = if node.is_folder() {
        format!("▼ {}/", node.name)
    } else {
        format!("  {}", node.name)
    };
    match &node.kind {
        NodeKind::File { size_bytes, .. } => {
            println!("{indent}{:<50} {:>10}", truncate(&label, 50), format_size(*size_bytes));
        }
        NodeKind::Folder { .. } => println!("{indent}{label}"),
    }

    if let Some(summary) = node.non_blank_summary() {
        let first_line = summary.lines().next().unwrap_or_default();
        println!("{indent}    {}", truncate(first_line, 90));
    }

    if node.is_folder() && depth < max_depth {
        for child in graph.children_of(node) {
            print_node(graph, child, depth + 1, max_depth);
        }
    }
}

fn file_size(node: &GraphNode) -> u64 {
    match node.kind {
        NodeKind::File { size_bytes, .. } => size_bytes,
        NodeKind::Folder { .. } => 0,
    }
}

fn display_path(relative_path: &str) -> &str {
    if relative_path.is_empty() { "." } else { relative_path }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("résumé notes", 6), "résum…");
    }

    #[test]
    fn test_display_path_for_root() {
        assert_eq!(display_path(""), ".");
        assert_eq!(display_path("sub/a.md"), "sub/a.md");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ctxgraph", "scan", "notes", "--exclude", "drafts", "-e", "tmp", "-vv", "--store-dir", "/s",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.store_dir, Some(PathBuf::from("/s")));
        match cli.command {
            Command::Scan { path, exclude, .. } => {
                assert_eq!(path, PathBuf::from("notes"));
                assert_eq!(exclude, vec!["drafts", "tmp"]);
            }
            _ => panic!("expected scan"),
        }
    }
}
