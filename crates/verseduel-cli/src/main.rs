use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use uuid::Uuid;
use verseduel_core::{
    Config, ConfigLoader, DuelLedger, DuelOutcome, DuelRunner, IngestDocument, MemoryRetriever,
    Retriever, append_session_record, chunk_text, init_metrics_from_env, init_telemetry,
    persist_trace, render_poems_text, write_outcome_artifacts,
};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "verseduel",
    version,
    about = "Grounded poem duels between two competing poets"
)]
struct Cli {
    /// Path to a config file (falls back to VERSEDUEL_CONFIG, then config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one duel over a grounding document or context string.
    Run(RunArgs),
    /// Run independent duels over a list of contexts, concurrently.
    Batch(BatchArgs),
    /// Aggregate a session ledger into win/score statistics.
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Theme/context the poems must stay grounded in. Defaults to the start
    /// of the first ingested document when --docs is given.
    #[arg(long)]
    context: Option<String>,

    /// File or directory of grounding documents to ingest before the duel.
    #[arg(long)]
    docs: Option<PathBuf>,

    /// Recurse into subdirectories when ingesting.
    #[arg(long, default_value_t = true)]
    recursive: bool,

    /// Shared turn budget across both poets (defaults to the config value).
    #[arg(long)]
    turns: Option<i32>,

    /// Directory to write poem_results.json, poems.txt and the trace into.
    #[arg(long, default_value = "results")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// File with one context per line (blank lines skipped).
    #[arg(long)]
    contexts: PathBuf,

    /// File or directory of grounding documents shared by every duel.
    #[arg(long)]
    docs: Option<PathBuf>,

    /// Shared turn budget across both poets (defaults to the config value).
    #[arg(long)]
    turns: Option<i32>,

    /// Maximum duels in flight at once.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// JSONL session ledger to aggregate (as written under data/records).
    #[arg(long)]
    ledger: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load(cli.config.clone())?;

    init_telemetry(&config.logging)?;
    init_metrics_from_env("verseduel-cli")?;

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Run(args) => run_command(args, &config).await?,
            Command::Batch(args) => batch_command(args, &config).await?,
            Command::Stats(args) => stats_command(args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

async fn run_command(args: RunArgs, config: &Config) -> Result<()> {
    let retriever = Arc::new(MemoryRetriever::new());
    let mut first_chunk = None;
    if let Some(path) = &args.docs {
        let documents = collect_documents(path, args.recursive, config)?;
        first_chunk = documents.first().map(|doc| doc.text.clone());
        ingest_documents(&retriever, documents).await?;
    }

    let context = match args.context {
        Some(context) => context,
        None => match first_chunk {
            // theme falls back to the opening of the source material
            Some(chunk) => chunk.chars().take(500).collect(),
            None => bail!("provide --context, or --docs to derive one"),
        },
    };

    let turns = args.turns.unwrap_or(config.session.default_turns);
    info!(context = %context, turns, "starting duel");

    let runner = DuelRunner::offline(retriever, config);
    let outcome = runner.run(&context, turns).await?;

    print_outcome(&outcome);
    append_session_record(&outcome);

    let artifacts = write_outcome_artifacts(&args.output, &outcome)?;
    let trace_path = persist_trace(&args.output, &outcome.session_id, &outcome.trace)?;
    info!(
        results = %artifacts.results_json.display(),
        poems = %artifacts.poems_text.display(),
        trace = %trace_path.display(),
        "duel artifacts written"
    );
    Ok(())
}

async fn batch_command(args: BatchArgs, config: &Config) -> Result<()> {
    let raw = fs::read_to_string(&args.contexts)
        .with_context(|| format!("failed to read contexts file {}", args.contexts.display()))?;
    let contexts: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if contexts.is_empty() {
        bail!("contexts file {} is empty", args.contexts.display());
    }

    let retriever = Arc::new(MemoryRetriever::new());
    if let Some(path) = &args.docs {
        let documents = collect_documents(path, true, config)?;
        ingest_documents(&retriever, documents).await?;
    }

    let turns = args.turns.unwrap_or(config.session.default_turns);
    info!(duels = contexts.len(), turns, concurrency = args.concurrency, "starting batch");

    let runner = Arc::new(DuelRunner::offline(retriever, config));
    let results = runner.run_batch(contexts, turns, args.concurrency).await;

    let mut failures = 0usize;
    for result in &results {
        match result {
            Ok(outcome) => {
                append_session_record(outcome);
                println!(
                    "{}  A {:>3} vs B {:>3}  winner: {}  ({})",
                    outcome.session_id,
                    outcome.report.score_a,
                    outcome.report.score_b,
                    outcome.report.winner.as_deref().unwrap_or("undecided"),
                    outcome.context
                );
            }
            Err(err) => {
                failures += 1;
                warn!(error = %err, "duel failed");
            }
        }
    }

    info!(
        completed = results.len() - failures,
        failed = failures,
        "batch finished"
    );
    if failures > 0 {
        bail!("{failures} of {} duel(s) failed", results.len());
    }
    Ok(())
}

fn stats_command(args: StatsArgs) -> Result<()> {
    let metrics = DuelLedger::analyze(&args.ledger)?;
    println!("{}", metrics.summary());
    for session_id in &metrics.degraded_sessions {
        println!("  degraded report: {session_id}");
    }
    Ok(())
}

async fn ingest_documents(
    retriever: &Arc<MemoryRetriever>,
    documents: Vec<IngestDocument>,
) -> Result<()> {
    if documents.is_empty() {
        warn!("no grounding documents matched ingestion criteria");
        return Ok(());
    }

    let count = documents.len();
    retriever.ingest(documents).await?;
    info!(chunks = count, "grounding documents ingested");
    Ok(())
}

fn collect_documents(path: &Path, recursive: bool, config: &Config) -> Result<Vec<IngestDocument>> {
    let mut docs = Vec::new();
    let entries: Box<dyn Iterator<Item = PathBuf>> = if path.is_file() {
        Box::new(std::iter::once(path.to_path_buf()))
    } else {
        let walker =
            WalkDir::new(path)
                .min_depth(0)
                .max_depth(if recursive { usize::MAX } else { 1 });
        Box::new(
            walker
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path()),
        )
    };

    for file in entries {
        let text = fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        if text.trim().is_empty() {
            continue;
        }
        let source = Some(file.display().to_string());
        for chunk in chunk_text(&text, config.retrieval.chunk_size, config.retrieval.chunk_overlap)
        {
            docs.push(IngestDocument {
                id: Uuid::new_v4().to_string(),
                text: chunk,
                source: source.clone(),
            });
        }
    }

    Ok(docs)
}

fn print_outcome(outcome: &DuelOutcome) {
    println!("{}", render_poems_text(outcome));
    if outcome.report.is_degraded() {
        println!(
            "note: {} report field(s) could not be parsed; see the raw judgment above",
            outcome.report.defaulted.len()
        );
    }
}
