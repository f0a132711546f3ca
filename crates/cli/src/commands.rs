use crate::config::{AppConfig, EmbedMode};
use crate::{CompareArgs, EmbedKbArgs, ExtractArgs, ImageSource, MatchArgs, PruneArgs, RunArgs};
use anyhow::{Context as AnyhowContext, Result};
use kgmatch_embeddings::{EmbeddingProvider, StubEmbedder};
use kgmatch_gemini::{
    GeminiClient, GeminiEmbedder, GeminiExtractor, GeminiRefiner, GraphExtractor, ImageSummarizer,
};
use kgmatch_graph::{GraphComparison, KnowledgeGraph};
use kgmatch_matcher::{ensure_topic_embeddings, KnowledgeBase, TopicMatcher};
use kgmatch_pruning::{GraphRefiner, PrunedGraph, PruningPipeline};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SUMMARY_FILE: &str = "1_summary.txt";
pub const RAW_GRAPH_FILE: &str = "2_KG_I.json";
pub const PRUNED_GRAPH_FILE: &str = "3_KG_P.json";
pub const COMPARISON_FILE: &str = "4_comparison.json";

/// Service backends selected by the configuration
struct Services {
    client: Arc<GeminiClient>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Services {
    fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Arc::new(
            GeminiClient::new(config.gemini_config()).context("Failed to build Gemini client")?,
        );
        let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.mode {
            EmbedMode::Stub => Arc::new(StubEmbedder::new(config.embedding.dimension)),
            EmbedMode::Gemini => Arc::new(GeminiEmbedder::new(client.clone())),
        };
        if config.embedding.mode == EmbedMode::Gemini && !client.has_api_key() {
            log::warn!("GOOGLE_API_KEY is not set; Gemini calls will fail and stages will degrade");
        }
        log::debug!(
            "Embedding backend: {} ({})",
            config.embedding.mode.as_str(),
            embedder.model_id()
        );
        Ok(Self { client, embedder })
    }

    fn refiner(&self) -> Arc<dyn GraphRefiner> {
        Arc::new(GeminiRefiner::new(self.client.clone()))
    }

    fn pipeline(&self, config: &AppConfig) -> PruningPipeline {
        PruningPipeline::new(
            config.pruning_config(),
            self.embedder.clone(),
            Some(self.refiner()),
        )
    }

    fn matcher(&self, config: &AppConfig) -> TopicMatcher {
        TopicMatcher::new(config.match_config(), self.embedder.clone())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_file(path, serde_json::to_vec_pretty(value)?).await
}

/// Summarize `--image` into `dir/1_summary.txt`; `None` when no image was given
async fn summarize_image(
    services: &Services,
    source: &ImageSource,
    dir: &Path,
) -> Result<Option<(String, PathBuf)>> {
    let Some(image_path) = &source.image else {
        return Ok(None);
    };
    let image = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read {}", image_path.display()))?;

    let summary = ImageSummarizer::new(services.client.clone())
        .summarize(&image, &source.prompt)
        .await
        .context("Image summarization failed")?;
    let summary_path = dir.join(SUMMARY_FILE);
    write_file(&summary_path, summary.clone().into_bytes()).await?;
    log::info!(
        "Summary saved to {:?} ({} chars)",
        summary_path,
        summary.chars().count()
    );
    Ok(Some((summary, summary_path)))
}

async fn read_scene_text(input: Option<&Path>) -> Result<String> {
    let input = input.context("An input file or --image is required")?;
    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))
}

async fn extract_graph(services: &Services, text: &str) -> Result<KnowledgeGraph> {
    GeminiExtractor::new(services.client.clone())
        .extract(text)
        .await
        .context("Knowledge graph extraction failed")
}

async fn load_graph(path: &Path) -> Result<KnowledgeGraph> {
    KnowledgeGraph::load(path)
        .await
        .with_context(|| format!("Failed to load graph {}", path.display()))
}

async fn load_knowledge_base(path: &Path) -> Result<KnowledgeBase> {
    KnowledgeBase::load(path)
        .await
        .with_context(|| format!("Failed to load knowledge base {}", path.display()))
}

async fn prune_graph(
    services: &Services,
    config: &AppConfig,
    raw: &KnowledgeGraph,
) -> Result<PrunedGraph> {
    services
        .pipeline(config)
        .run(raw)
        .await
        .context("Pruning failed")
}

pub async fn run_extract(args: ExtractArgs, config: &AppConfig) -> Result<()> {
    let services = Services::from_config(config)?;
    let out_dir = args.out.parent().unwrap_or_else(|| Path::new(""));
    let (text, summary_path) = match summarize_image(&services, &args.source, out_dir).await? {
        Some((summary, path)) => (summary, Some(path)),
        None => (read_scene_text(args.input.as_deref()).await?, None),
    };

    let graph = extract_graph(&services, &text).await?;
    graph.save(&args.out).await?;

    print_json(&json!({
        "output": args.out.display().to_string(),
        "summary": summary_path.map(|p| p.display().to_string()),
        "entities": graph.entity_count(),
        "relationships": graph.relationship_count(),
    }))
}

pub async fn run_prune(args: PruneArgs, config: &AppConfig) -> Result<()> {
    let raw = load_graph(&args.input).await?;
    let services = Services::from_config(config)?;

    let pruned = prune_graph(&services, config, &raw).await?;
    pruned.graph.save(&args.out).await?;

    print_json(&json!({
        "output": args.out.display().to_string(),
        "report": pruned.report,
        "comparison": GraphComparison::between(&raw, &pruned.graph),
    }))
}

pub async fn run_compare(args: CompareArgs) -> Result<()> {
    let before = load_graph(&args.before).await?;
    let after = load_graph(&args.after).await?;
    let comparison = GraphComparison::between(&before, &after);

    if let Some(out) = &args.out {
        write_json(out, &comparison).await?;
    }
    print_json(&comparison)
}

pub async fn run_match(args: MatchArgs, config: &AppConfig) -> Result<()> {
    let services = Services::from_config(config)?;
    let result = services
        .matcher(config)
        .match_files(&args.kg, &args.kb, &args.out)
        .await
        .context("Topic matching failed")?;
    print_json(&result)
}

/// [summarize -> extract ->] prune -> compare -> match, writing every artifact into the output
/// directory
pub async fn run_pipeline(args: RunArgs, config: &AppConfig) -> Result<()> {
    let mut kb = load_knowledge_base(&args.kb).await?;
    let services = Services::from_config(config)?;
    let mut artifacts = Vec::new();

    let raw = match summarize_image(&services, &args.source, &args.out_dir).await? {
        Some((summary, summary_path)) => {
            log::info!("Step 0/3: extracting a knowledge graph from the image summary");
            let raw = extract_graph(&services, &summary).await?;
            let raw_path = args.out_dir.join(RAW_GRAPH_FILE);
            raw.save(&raw_path).await?;
            artifacts.push(summary_path);
            artifacts.push(raw_path);
            raw
        }
        None => {
            let input = args
                .input
                .as_deref()
                .context("An input graph or --image is required")?;
            load_graph(input).await?
        }
    };

    log::info!("Step 1/3: pruning");
    let pruned = prune_graph(&services, config, &raw).await?;
    let pruned_path = args.out_dir.join(PRUNED_GRAPH_FILE);
    pruned.graph.save(&pruned_path).await?;

    log::info!("Step 2/3: comparison");
    let comparison = GraphComparison::between(&raw, &pruned.graph);
    let comparison_path = args.out_dir.join(COMPARISON_FILE);
    write_json(&comparison_path, &comparison).await?;

    log::info!("Step 3/3: topic matching");
    let matcher = services.matcher(config);
    if matcher.embed_knowledge_base(&mut kb).await > 0 {
        kb.save(&args.kb).await?;
    }
    let result = matcher.rank(&pruned.graph, &kb).await?;
    let result_path = result.save(&args.out_dir).await?;
    artifacts.extend([pruned_path, comparison_path, result_path]);

    let artifacts: Vec<String> = artifacts
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    print_json(&json!({
        "pruning": pruned.report,
        "comparison": comparison,
        "selected": result.selected,
        "artifacts": artifacts,
    }))
}

pub async fn run_embed_kb(args: EmbedKbArgs, config: &AppConfig) -> Result<()> {
    let mut kb = load_knowledge_base(&args.kb).await?;
    let services = Services::from_config(config)?;

    let embedded = ensure_topic_embeddings(&mut kb, services.embedder.as_ref())
        .await
        .context("Knowledge base embedding failed")?;
    if embedded > 0 {
        kb.save(&args.kb).await?;
    }

    print_json(&json!({
        "knowledge_base": args.kb.display().to_string(),
        "embedded": embedded,
        "topics": kb.topic_count(),
    }))
}
