use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use ctxai_embeddings::{create_provider, ProviderKind};
use ctxai_indexer::{query_index, Config, IndexPipeline, IndexSummary, Progress};
use ctxai_vector_store::VectorStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ctxai")]
#[command(about = "Semantic code indexing and search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project directory for semantic search
    Index(IndexArgs),

    /// Search an index for code matching a query
    Query(QueryArgs),

    /// Show statistics for an index
    Stats(StatsArgs),

    /// Delete an index
    Delete(DeleteArgs),

    /// Print the resolved configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Project directory to index
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Index name
    #[arg(short, long, default_value = "default")]
    name: String,

    /// Embedding backend: local|openai|huggingface|stub
    #[arg(long)]
    provider: Option<String>,

    /// Embedding model identifier
    #[arg(long)]
    model: Option<String>,

    /// Extra glob patterns a file must match (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Extra glob patterns that exclude files (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Do not honor .gitignore files
    #[arg(long)]
    no_ignore: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// What to search for
    query: String,

    /// Project directory holding the index
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Index name
    #[arg(short, long, default_value = "default")]
    name: String,

    /// How many results to return
    #[arg(short = 'k', long, default_value_t = 5)]
    top_k: usize,

    /// Embedding backend override, must match the indexed one
    #[arg(long)]
    provider: Option<String>,

    /// Emit results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// Project directory holding the index
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Index name
    #[arg(short, long, default_value = "default")]
    name: String,
}

#[derive(Args)]
struct DeleteArgs {
    /// Project directory holding the index
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Index name
    #[arg(short, long, default_value = "default")]
    name: String,
}

#[derive(Args)]
struct ConfigArgs {
    /// Project directory
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Index(args) => cmd_index(args).await,
        Commands::Query(args) => cmd_query(args).await,
        Commands::Stats(args) => cmd_stats(args).await,
        Commands::Delete(args) => cmd_delete(args).await,
        Commands::Config(args) => cmd_config(args).await,
    }
}

async fn load_config(
    root: &Path,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<Config> {
    let mut config = Config::load_or_init(root)
        .await
        .context("failed to load configuration")?;
    if let Some(provider) = provider {
        config.embedding.provider = parse_provider(provider)?;
    }
    if let Some(model) = model {
        config.embedding.model = model.to_string();
    }
    Ok(config)
}

fn parse_provider(name: &str) -> Result<ProviderKind> {
    Ok(match name {
        "local" => ProviderKind::Local,
        "openai" => ProviderKind::OpenAi,
        "huggingface" => ProviderKind::HuggingFace,
        "stub" => ProviderKind::Stub,
        other => bail!("unknown provider '{other}', expected local|openai|huggingface|stub"),
    })
}

async fn cmd_index(args: IndexArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;

    let mut config = load_config(&root, args.provider.as_deref(), args.model.as_deref()).await?;
    config.indexing.include.extend(args.include);
    config.indexing.exclude.extend(args.exclude);
    if args.no_ignore {
        config.indexing.follow_ignore_file = false;
    }

    let provider = create_provider(&config.embedding)?;
    eprintln!(
        "Indexing {} with {} ({} dims)",
        style(root.display()).cyan(),
        style(provider.model_id()).green(),
        provider.dimension()
    );

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg:12} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let progress_bar = bar.clone();

    let pipeline = IndexPipeline::new(&root, config, provider)?.with_progress(Box::new(
        move |p: Progress| {
            progress_bar.set_message(p.stage.as_str());
            progress_bar.set_length(p.total as u64);
            progress_bar.set_position(p.current as u64);
        },
    ));

    // Ctrl-C finishes the batch in flight, persists it and stops.
    let token = pipeline.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current batch...");
            token.cancel();
        }
    });

    let summary = pipeline.run(&args.name).await?;
    bar.finish_and_clear();
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &IndexSummary) {
    let headline = if summary.cancelled {
        style("Indexing cancelled").yellow()
    } else {
        style("Indexing complete").green()
    };
    eprintln!(
        "{headline} in {:.1}s",
        summary.duration_ms as f64 / 1000.0
    );
    eprintln!(
        "  {} files indexed ({} binary, {} oversized skipped)",
        summary.files_indexed, summary.files_skipped_binary, summary.files_skipped_oversized
    );
    eprintln!(
        "  {} chunks stored, {} failed, {} files fell back to text windows",
        summary.chunks_stored, summary.chunks_failed, summary.fallback_files
    );
    for warning in &summary.warnings {
        eprintln!("  {} {warning}", style("warning:").yellow());
    }
}

async fn cmd_query(args: QueryArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;
    let config = load_config(&root, args.provider.as_deref(), None).await?;
    let provider = create_provider(&config.embedding)?;

    let results = query_index(&root, provider.as_ref(), &args.name, &args.query, args.top_k)
        .await
        .context("query failed")?;

    if args.json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.chunk.source_path,
                    "start_line": r.chunk.start_line,
                    "end_line": r.chunk.end_line,
                    "kind": r.chunk.kind,
                    "symbol": r.chunk.symbol_name,
                    "distance": r.distance,
                    "content": r.chunk.content,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if results.is_empty() {
        eprintln!("No results. Has this project been indexed? Try `ctxai index`.");
        return Ok(());
    }

    for result in &results {
        let location = format!(
            "{}:{}-{}",
            result.chunk.source_path, result.chunk.start_line, result.chunk.end_line
        );
        let symbol = result.chunk.symbol_name.as_deref().unwrap_or("");
        println!(
            "{} {} {}",
            style(location).cyan(),
            style(format!("({:.3})", result.distance)).dim(),
            style(symbol).green()
        );
        for line in result.chunk.content.lines().take(3) {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

async fn cmd_stats(args: StatsArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;
    let store = VectorStore::open(ctxai_indexer::index_dir(&root, &args.name))
        .await
        .context("cannot open index")?;

    let stats = store.stats();
    let meta = store.meta();
    println!("Index: {}", args.name);
    println!(
        "  model: {}",
        meta.model_id.as_deref().unwrap_or("(empty index)")
    );
    if let Some(dimension) = meta.dimension {
        println!("  dimension: {dimension}");
    }
    println!("  records: {}", stats.total_records);
    println!("  files: {}", stats.unique_files);
    for (language, count) in &stats.languages {
        println!("    {language}: {count}");
    }
    Ok(())
}

async fn cmd_delete(args: DeleteArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;
    ctxai_indexer::delete_index(&root, &args.name)
        .await
        .context("cannot delete index")?;
    eprintln!("Deleted index {}", style(&args.name).cyan());
    Ok(())
}

async fn cmd_config(args: ConfigArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", args.path.display()))?;
    let config = Config::load_or_init(&root).await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
