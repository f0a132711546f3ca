use anyhow::{Context as AnyhowContext, Result};
use clap::ValueEnum;
use kgmatch_gemini::{
    GeminiConfig, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use kgmatch_matcher::{CentralityMode, MatchConfig, ScoreWeights, SelectionThresholds};
use kgmatch_pruning::{
    FusionConfig, PruningConfig, TopologyConfig, DEFAULT_BLACKLIST, DEFAULT_FUSION_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "kgmatch.toml";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    /// Gemini `batchEmbedContents`
    #[default]
    Gemini,
    /// Deterministic offline embeddings
    Stub,
}

impl EmbedMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Stub => "stub",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingSection,
    pub llm: LlmSection,
    pub pruning: PruningSection,
    pub matching: MatchingSection,

    /// Only ever taken from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub mode: EmbedMode,
    pub model: String,
    /// Vector size of the stub backend
    pub dimension: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            mode: EmbedMode::default(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Empty means no explicit proxy
    pub proxy: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningSection {
    pub blacklist: Vec<String>,
    pub fusion_threshold: f32,
    pub max_topology_passes: usize,
    pub refine: bool,
}

impl Default for PruningSection {
    fn default() -> Self {
        Self {
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            fusion_threshold: DEFAULT_FUSION_THRESHOLD,
            max_topology_passes: TopologyConfig::default().max_passes,
            refine: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSection {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub threshold_high: f64,
    pub threshold_mid: f64,
    pub margin: f64,
    pub top_k: usize,
    pub centrality: CentralityMode,
}

impl Default for MatchingSection {
    fn default() -> Self {
        let weights = ScoreWeights::default();
        let thresholds = SelectionThresholds::default();
        Self {
            alpha: weights.alpha,
            beta: weights.beta,
            gamma: weights.gamma,
            threshold_high: thresholds.high,
            threshold_mid: thresholds.mid,
            margin: thresholds.margin,
            top_k: MatchConfig::default().top_k,
            centrality: CentralityMode::default(),
        }
    }
}

impl AppConfig {
    /// Read `path`, or `kgmatch.toml` when present, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::debug!("No {} found; using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Fold `GOOGLE_API_KEY`, `KGMATCH_EMBEDDING_MODE` and `KGMATCH_PROXY` into the config
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(mode) = lookup("KGMATCH_EMBEDDING_MODE") {
            match EmbedMode::from_str(mode.trim(), true) {
                Ok(mode) => self.embedding.mode = mode,
                Err(_) => log::warn!("Ignoring unknown KGMATCH_EMBEDDING_MODE '{}'", mode),
            }
        }
        if let Some(proxy) = lookup("KGMATCH_PROXY") {
            self.llm.proxy = proxy;
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        let proxy = self.llm.proxy.trim();
        GeminiConfig {
            api_key: self.api_key.clone(),
            base_url: self.llm.base_url.clone(),
            llm_model: self.llm.model.clone(),
            embedding_model: self.embedding.model.clone(),
            timeout_secs: self.llm.timeout_secs,
            proxy: (!proxy.is_empty()).then(|| proxy.to_string()),
        }
    }

    pub fn pruning_config(&self) -> PruningConfig {
        PruningConfig {
            topology: TopologyConfig {
                blacklist: self.pruning.blacklist.clone(),
                max_passes: self.pruning.max_topology_passes,
            },
            fusion: FusionConfig {
                threshold: self.pruning.fusion_threshold,
            },
            refine: self.pruning.refine,
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        let m = &self.matching;
        MatchConfig {
            weights: ScoreWeights {
                alpha: m.alpha,
                beta: m.beta,
                gamma: m.gamma,
            },
            thresholds: SelectionThresholds {
                high: m.threshold_high,
                mid: m.threshold_mid,
                margin: m.margin,
            },
            top_k: m.top_k,
            centrality: m.centrality,
        }
    }
}
