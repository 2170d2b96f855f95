mod error_formatter;
mod formatter;
mod title;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fathom::markup::Document;
use fathom::ResourceLimits;
use formatter::Formatter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Score and classify the nodes of HTML documents with rules.")]
#[command(
    long_about = "Fathom runs rulesets against documents, scoring and typing their nodes.\nThe CLI ships a title extraction ruleset and a selector inspector."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log what the engine does (rules run, plans made) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the best title of each document
    ///
    /// Scores og:title, twitter:title, hdl meta tags and <title> elements and
    /// reports the winner per file. Directories are searched for .html and
    /// .htm files.
    Title {
        /// Files or directories to read
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the elements of a document that match a selector
    ///
    /// Useful for checking what a dom() left-hand side will pick up.
    Select {
        /// The document to read
        file: PathBuf,
        /// A selector such as "div.content > p"
        selector: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Title { paths, json } => title_command(paths, *json),
        Commands::Select { file, selector } => select_command(file, selector),
    };

    if let Err(e) = result {
        if let Some(fathom_err) = e.downcast_ref::<fathom::FathomError>() {
            eprintln!("{}", error_formatter::format_error(fathom_err));
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "fathom=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn title_command(paths: &[PathBuf], json: bool) -> Result<()> {
    let rules = title::title_ruleset()?;
    let mut titles = Vec::new();
    for path in markup_files(paths)? {
        let doc = load_document(&path)?;
        let title = title::best_title(&doc, &rules)?;
        debug!(path = %path.display(), ?title, "picked title");
        titles.push((path, title));
    }

    let formatter = Formatter::default();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&formatter.titles_json(&titles))?
        );
    } else {
        print!("{}", formatter.format_titles(&titles));
    }
    Ok(())
}

fn select_command(file: &Path, selector: &str) -> Result<()> {
    let doc = load_document(file)?;
    let elements = doc.select(selector)?;
    print!(
        "{}",
        Formatter::default().format_selection(selector, &elements)
    );
    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    let source_id = path.to_string_lossy().to_string();
    Ok(Document::parse_with_limits(
        &source,
        &source_id,
        &ResourceLimits::default(),
    )?)
}

/// Expand directories into the markup files below them, in a stable order
fn markup_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            // Files named on the command line are taken as given
            if entry.file_type().is_file() && (entry.depth() == 0 || is_markup(entry.path())) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn is_markup(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("html") | Some("htm")
    )
}
