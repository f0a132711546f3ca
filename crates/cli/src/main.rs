use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use config::{AppConfig, EmbedMode};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "kgmatch")]
#[command(about = "Prune knowledge graphs and rank them against a topic knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (default: ./kgmatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a knowledge graph from a text file or an image with the LLM
    Extract(ExtractArgs),

    /// Prune a knowledge graph (topology, attribute fusion, refinement)
    Prune(PruneArgs),

    /// Compare two knowledge graphs (entity/relationship/attribute counts)
    Compare(CompareArgs),

    /// Rank a pruned graph against a topic knowledge base
    #[command(name = "match")]
    Match(MatchArgs),

    /// Prune, compare and match in one go (optionally starting from an image), writing all
    /// artifacts to an output directory
    Run(RunArgs),

    /// Compute and cache missing knowledge-base embeddings
    #[command(name = "embed-kb")]
    EmbedKb(EmbedKbArgs),
}

#[derive(Args)]
struct ImageSource {
    /// Scene image (PNG, JPEG, WebP or GIF) summarized by the LLM before extraction
    #[arg(long)]
    image: Option<PathBuf>,

    /// Instruction sent along with the image
    #[arg(long, default_value = kgmatch_gemini::DEFAULT_IMAGE_PROMPT, requires = "image")]
    prompt: String,
}

#[derive(Args)]
struct ExtractArgs {
    /// Text file describing the scene
    #[arg(required_unless_present = "image", conflicts_with = "image")]
    input: Option<PathBuf>,

    #[command(flatten)]
    source: ImageSource,

    /// Output graph JSON (an image summary is written next to it as 1_summary.txt)
    #[arg(short, long, default_value = "KG_I.json")]
    out: PathBuf,
}

#[derive(Args)]
struct PruneArgs {
    /// Raw graph JSON
    input: PathBuf,

    /// Output graph JSON
    #[arg(short, long, default_value = commands::PRUNED_GRAPH_FILE)]
    out: PathBuf,

    /// Skip the LLM refinement stage
    #[arg(long)]
    no_refine: bool,
}

#[derive(Args)]
struct CompareArgs {
    /// Graph before pruning
    before: PathBuf,

    /// Graph after pruning
    after: PathBuf,

    /// Also write the comparison JSON to this file
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct MatchArgs {
    /// Pruned graph JSON
    #[arg(long, default_value = "KG_P.json")]
    kg: PathBuf,

    /// Knowledge base JSON (new topic embeddings are cached back into it)
    #[arg(long, default_value = "exam_kb.json")]
    kb: PathBuf,

    /// Directory receiving 6_core_concepts.json
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    /// Raw graph JSON
    #[arg(required_unless_present = "image", conflicts_with = "image")]
    input: Option<PathBuf>,

    #[command(flatten)]
    source: ImageSource,

    /// Knowledge base JSON (new topic embeddings are cached back into it)
    #[arg(long, default_value = "exam_kb.json")]
    kb: PathBuf,

    /// Directory receiving all artifacts
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,

    /// Skip the LLM refinement stage
    #[arg(long)]
    no_refine: bool,
}

#[derive(Args)]
struct EmbedKbArgs {
    /// Knowledge base JSON
    #[arg(long, default_value = "exam_kb.json")]
    kb: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper internals are noisy at debug level
    builder.filter_module("hyper_util", log::LevelFilter::Warn);
    builder.filter_module("reqwest", log::LevelFilter::Warn);
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env();
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode;
    }

    match cli.command {
        Commands::Extract(args) => commands::run_extract(args, &config).await?,
        Commands::Prune(args) => {
            if args.no_refine {
                config.pruning.refine = false;
            }
            commands::run_prune(args, &config).await?
        }
        Commands::Compare(args) => commands::run_compare(args).await?,
        Commands::Match(args) => commands::run_match(args, &config).await?,
        Commands::Run(args) => {
            if args.no_refine {
                config.pruning.refine = false;
            }
            commands::run_pipeline(args, &config).await?
        }
        Commands::EmbedKb(args) => commands::run_embed_kb(args, &config).await?,
    }

    Ok(())
}
