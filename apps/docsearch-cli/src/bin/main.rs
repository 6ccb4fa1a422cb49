use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use docsearch_core::config::{Config, Settings};
use docsearch_core::discovery::discover_files;
use docsearch_core::{BoolMode, ExtensionFilter, QueryRequest, SortMode};
use docsearch_extract::DocumentExtractor;
use docsearch_ingest::{IngestOutcome, IngestPipeline, ReindexResult, Reindexer};
use docsearch_text::{IndexStore, QueryEngine, SearchStatus, SnippetGenerator, StoreOptions};

#[derive(Parser)]
#[command(name = "docsearch", version, about = "Index and search local office documents")]
struct Cli {
    /// Index directory; overrides `index.dir`.
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from the given folders (or `ingest.roots`).
    Index {
        roots: Vec<PathBuf>,
        #[arg(long)]
        concurrency: Option<usize>,
        /// Re-run every N minutes until interrupted.
        #[arg(long, value_name = "MINUTES")]
        every: Option<u64>,
    },
    Search {
        query: String,
        /// Require every term to match.
        #[arg(long)]
        and: bool,
        #[arg(long, default_value = "relevance")]
        sort: SortMode,
        /// Keep only these extensions; repeatable.
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Remove every document from the index.
    Clear,
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let index_dir = cli.index_dir.clone().unwrap_or_else(|| settings.index_dir());

    match cli.command {
        Command::Index { roots, concurrency, every } => {
            let store = Arc::new(open_store(&settings, &index_dir)?);
            let roots = if roots.is_empty() { settings.roots() } else { roots };
            anyhow::ensure!(!roots.is_empty(), "no folders to index; pass ROOTS or set ingest.roots");
            let concurrency = concurrency.unwrap_or(settings.ingest.concurrency);
            anyhow::ensure!(concurrency > 0, "--concurrency must be at least 1");
            let extractor = Arc::new(DocumentExtractor::new(settings.extract.clone()));
            let reindexer = Reindexer::new(store, IngestPipeline::new(extractor).with_concurrency(concurrency));
            cancel_on_interrupt(&reindexer)?;

            let every = every.or(Some(settings.ingest.auto_index_minutes)).filter(|m| *m > 0);
            loop {
                run_index(&reindexer, &roots, &settings.ingest.extensions)?;
                let Some(minutes) = every else { break };
                println!("⏳ Next run in {minutes} minute(s)");
                std::thread::sleep(Duration::from_secs(minutes * 60));
            }
        }
        Command::Search { query, and, sort, extensions, json } => {
            let store = open_store(&settings, &index_dir)?;
            let filter = if extensions.is_empty() { ExtensionFilter::all() } else { ExtensionFilter::only(extensions) };
            let mode = if and { BoolMode::And } else { BoolMode::Or };
            let request = QueryRequest::new(query).mode(mode).sort(sort).extensions(filter);
            let response = QueryEngine::new(&store).search(&request)?;
            let snippets = SnippetGenerator::new(&request.query);

            if json {
                let hits = response
                    .hits
                    .iter()
                    .map(|hit| {
                        let mut value = serde_json::to_value(hit)?;
                        if let Some(obj) = value.as_object_mut() {
                            obj.remove("content");
                            obj.insert("snippet".into(), snippets.generate(&hit.document.content).into());
                        }
                        Ok(value)
                    })
                    .collect::<Result<Vec<_>, serde_json::Error>>()?;
                let status = match &response.status {
                    SearchStatus::Ok => "ok".to_string(),
                    SearchStatus::InvalidQuery(msg) => format!("invalid query: {msg}"),
                };
                let out = serde_json::json!({
                    "query": request.query,
                    "mode": mode.to_string(),
                    "sort": sort.to_string(),
                    "window": response.window,
                    "status": status,
                    "hits": hits,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            if let SearchStatus::InvalidQuery(msg) = &response.status {
                eprintln!("⚠️  Invalid query: {msg}");
                return Ok(());
            }
            println!("🔍 {} result(s) for \"{}\" [{mode}, {sort}]", response.hits.len(), request.query);
            if response.hits.len() < response.window {
                println!("   ({} of the top {} shown after extension filter)", response.hits.len(), response.window);
            }
            for hit in &response.hits {
                let score = hit.score.map(|s| format!("  score={s:.3}")).unwrap_or_default();
                println!(
                    "\n  {}. {}  ({}){score}",
                    hit.rank,
                    hit.document.filename,
                    hit.document.modified.format("%Y-%m-%d %H:%M")
                );
                println!("     {}", hit.document.path);
                println!("     📝 {}", snippets.generate(&hit.document.content));
            }
        }
        Command::Clear => {
            let store = open_store(&settings, &index_dir)?;
            store.clear().context("failed to clear index")?;
            println!("🧹 Cleared index at {}", index_dir.display());
        }
        Command::Stats => {
            let store = open_store(&settings, &index_dir)?;
            println!("📊 {} document(s) in {}", store.num_docs(), store.dir().display());
        }
    }
    Ok(())
}

fn open_store(settings: &Settings, dir: &std::path::Path) -> anyhow::Result<IndexStore> {
    let options = StoreOptions {
        writer_memory_bytes: settings.index.writer_memory_bytes,
        clear_retry_delay: Duration::from_millis(settings.index.clear_retry_delay_ms),
    };
    tracing::debug!(dir = %dir.display(), "Opening index");
    IndexStore::open_with(dir, options).with_context(|| format!("failed to open index at {}", dir.display()))
}

/// First Ctrl-C during a run cancels it: files already started are drained
/// and committed. Outside a run, Ctrl-C exits.
fn cancel_on_interrupt(reindexer: &Reindexer) -> anyhow::Result<()> {
    let session = reindexer.session();
    ctrlc::set_handler(move || {
        if session.request_cancel() {
            eprintln!("\n⏹  Cancelling; finishing files already started");
        } else {
            std::process::exit(130);
        }
    })
    .context("failed to install Ctrl-C handler")
}

fn run_index(reindexer: &Reindexer, roots: &[PathBuf], extensions: &[String]) -> anyhow::Result<()> {
    let paths = discover_files(roots, extensions);
    println!("📂 Found {} file(s) under {} folder(s)", paths.len(), roots.len());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files (eta {eta}) {msg}")?
            .progress_chars("#>-"),
    );
    let result = reindexer.reindex(&paths, |p| {
        pb.set_position(p.completed as u64);
        pb.set_message(p.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
    });
    pb.finish_and_clear();

    match result? {
        ReindexResult::Ran(IngestOutcome::Completed(s)) => {
            println!("✅ Indexed {} document(s) in {:.1}s ({} skipped)", s.indexed, s.elapsed.as_secs_f64(), s.failed);
        }
        ReindexResult::Ran(IngestOutcome::Cancelled(s)) => {
            println!("⏹  Cancelled after {} of {}; {} document(s) committed", s.reported, s.total, s.indexed);
        }
        ReindexResult::NothingToIndex => println!("ℹ️  Nothing to index; index cleared"),
        ReindexResult::CancelRequested => println!("⏹  Indexing already running; cancellation requested"),
    }
    Ok(())
}
