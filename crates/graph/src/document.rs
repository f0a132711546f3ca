use crate::error::Result;
use crate::types::KnowledgeGraph;
use std::path::Path;

impl KnowledgeGraph {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Compact single-line JSON (used as the whole-graph text fragment)
    pub fn to_json_compact(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a graph document from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading graph from {:?}", path);
        let bytes = tokio::fs::read(path).await?;
        let graph: Self = serde_json::from_slice(&bytes)?;
        log::info!(
            "Loaded graph {:?}: {} entities, {} relationships",
            path,
            graph.entity_count(),
            graph.relationship_count()
        );
        Ok(graph)
    }

    /// Save as pretty JSON; written to a temp file first, then renamed into place
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        log::info!("Graph saved to {:?}", path);
        Ok(())
    }
}
