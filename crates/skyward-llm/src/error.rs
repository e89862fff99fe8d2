use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model response had no message content")]
    MissingContent,
    #[error("no JSON object found in model reply")]
    NoJsonObject,
    #[error("malformed command JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("nothing to summarize")]
    EmptyInput,
    #[error("language model disabled")]
    Offline,
}
