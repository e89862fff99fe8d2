//! Skyward LLM - language-model access for command parsing and log summaries.
//!
//! Talks to an Ollama-compatible `/api/chat` endpoint. Command parsing always
//! produces a result: if the model is unreachable or its reply cannot be
//! decoded, the rule-based parser from `skyward-core` takes over.

pub mod client;
pub mod error;
pub mod parser;
pub mod summary;

pub use client::{ChatBackend, ChatMessage, ChatOptions, OfflineBackend, OllamaClient};
pub use error::LlmError;
pub use parser::{CommandParser, ParseOutcome, ParseSource};
pub use summary::Summarizer;
