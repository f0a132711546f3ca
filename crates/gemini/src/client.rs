use crate::config::GeminiConfig;
use crate::error::{GeminiError, Result};
use crate::types::{
    ApiErrorBody, BatchEmbedContentsRequest, BatchEmbedContentsResponse, Content,
    EmbedContentRequest, GenerateContentRequest, GenerateContentResponse, Part, TaskType,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Upper bound on requests per `batchEmbedContents` call
pub const MAX_EMBED_BATCH: usize = 100;

/// Attempts for rate-limited or temporarily unavailable requests
const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE_MS: u64 = 500;

/// Async client for the two Gemini endpoints the pipeline uses
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish()
    }
}

impl GeminiClient {
    /// Build the HTTP client. A missing API key is not an error until a request is made.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            log::debug!("Routing Gemini requests through proxy {}", proxy);
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GeminiError::MissingApiKey)
    }

    /// `{base_url}/models/{model}:{method}`
    pub fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model_path(model),
            method
        )
    }

    /// Ask the LLM for a JSON answer and return the raw response text
    pub async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate(&GenerateContentRequest::json_prompt(prompt)).await
    }

    /// Free-text answer to a multi-part prompt (text and inline media)
    pub async fn generate_text(&self, parts: Vec<Part>) -> Result<String> {
        self.generate(&GenerateContentRequest::user_parts(parts)).await
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<String> {
        let url = self.endpoint(&self.config.llm_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, request).await?;
        if let Some(usage) = &response.usage_metadata {
            log::debug!(
                "generateContent used {} prompt + {} output tokens",
                usage.prompt_token_count,
                usage.candidates_token_count
            );
        }

        response.text().ok_or_else(|| {
            GeminiError::InvalidResponse(format!(
                "no text in response (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            ))
        })
    }

    /// Embed `texts` with the configured embedding model, one vector per text in order
    pub async fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = model_path(&self.config.embedding_model);
        let url = self.endpoint(&self.config.embedding_model, "batchEmbedContents");

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_EMBED_BATCH) {
            let request = BatchEmbedContentsRequest {
                requests: chunk
                    .iter()
                    .map(|text| EmbedContentRequest {
                        model: model.clone(),
                        content: Content::plain_text(text.clone()),
                        task_type: TaskType::SemanticSimilarity,
                    })
                    .collect(),
            };
            let response: BatchEmbedContentsResponse = self.post(&url, &request).await?;
            if response.embeddings.len() != chunk.len() {
                return Err(GeminiError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    response.embeddings.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        log::debug!("Embedded {} texts with {}", vectors.len(), model);
        Ok(vectors)
    }

    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let api_key = self.api_key()?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            log::debug!("POST {} (attempt {})", url, attempt);

            let response = self
                .http
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(body)
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                let bytes = response.bytes().await?;
                return Ok(serde_json::from_slice(&bytes)?);
            }

            let message = error_message(&response.text().await.unwrap_or_default());
            if is_retryable(status) && attempt < MAX_ATTEMPTS {
                let backoff = BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                log::warn!(
                    "Gemini returned {} ({}), retrying in {} ms",
                    status.as_u16(),
                    message,
                    backoff
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                continue;
            }

            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }
    }
}

/// Model resource path: `gemini-2.5-flash` -> `models/gemini-2.5-flash`
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{}: {}", status, parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
