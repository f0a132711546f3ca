//! # kgmatch gemini
//!
//! Google Generative Language API client and the service adapters built on it:
//!
//! - [`GeminiEmbedder`]: `EmbeddingProvider` over `batchEmbedContents`
//! - [`GeminiRefiner`]: `GraphRefiner` over `generateContent` (JSON mode)
//! - [`GeminiExtractor`]: text to knowledge graph over `generateContent`
//! - [`ImageSummarizer`]: image plus prompt to scene text over `generateContent`
//!
//! The API key is part of [`GeminiConfig`]; nothing in this crate reads the environment.

mod client;
mod config;
mod embedder;
mod error;
mod extractor;
mod json;
mod refiner;
mod summarizer;
pub mod types;

pub use client::{model_path, GeminiClient, MAX_EMBED_BATCH};
pub use config::{
    GeminiConfig, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
pub use embedder::GeminiEmbedder;
pub use error::{GeminiError, Result};
pub use extractor::{extraction_prompt, GeminiExtractor, GraphExtractor};
pub use json::{parse_graph_json, strip_code_fences};
pub use refiner::GeminiRefiner;
pub use summarizer::{detect_image_mime_type, ImageSummarizer, DEFAULT_IMAGE_PROMPT};
