//! Adapters - language model integrations for the orchestrator and operatives.

mod mistral;
pub mod operative;
pub mod orchestrator;
pub mod templates;

use async_trait::async_trait;

pub use mistral::MistralClient;
pub use operative::{OperativeAgent, OperativeResponse};
pub use orchestrator::{Orchestrator, RoutingDecision};
pub use templates::{render, DirTemplates, InlineTemplates, TemplateSource};

/// Failure from a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response contained no completion")]
    EmptyResponse,

    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// Text generation backend: system prompt and user message in, completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Free-text completion.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, GenerationError>;

    /// Completion constrained to a JSON object. Callers still parse
    /// defensively; the backend only promises to ask for JSON.
    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

/// Backend for sessions without credentials. Every call fails, so callers
/// fall through to their fixed content.
#[derive(Debug, Clone, Default)]
pub struct Offline {
    reason: String,
}

impl Offline {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl Generator for Offline {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(self.reason.clone()))
    }

    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, GenerationError> {
        self.complete(system, user, temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_always_fails() {
        let offline = Offline::new("no key");
        let err = offline.complete_json("sys", "user", 0.5).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(reason) if reason == "no key"));
    }
}
