use serde::{Deserialize, Serialize};

/// Type-name substrings that mark low-information entities
/// (background, noise, environment description, modifier).
pub const DEFAULT_BLACKLIST: [&str; 4] = ["背景", "噪音", "环境描述", "修饰词"];

pub const DEFAULT_FUSION_THRESHOLD: f32 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Entities whose type contains one of these substrings and whose degree is at most 1
    /// are removed
    pub blacklist: Vec<String>,

    /// Upper bound on prune passes; each pass may orphan neighbours of removed nodes
    pub max_passes: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| (*s).to_string()).collect(),
            max_passes: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Attribute pairs strictly above this cosine similarity are fused
    pub threshold: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUSION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    pub topology: TopologyConfig,
    pub fusion: FusionConfig,

    /// Run the reasoning-service refinement stage
    pub refine: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            fusion: FusionConfig::default(),
            refine: true,
        }
    }
}
