use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeminiError>;

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("No Gemini API key configured (set GOOGLE_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Invalid Gemini response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
