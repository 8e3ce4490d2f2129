// ABOUTME: Generation backend capability and its Anthropic-backed implementation
// ABOUTME: Any non-conforming reply is an error so the caller can fall back to the template

use async_trait::async_trait;
use proposekit_ai::{AIService, AIServiceError};
use proposekit_core::ProposalContent;
use thiserror::Error;
use tracing::info;

use super::prompts::{proposal_content_prompt, GenerationBrief, SYSTEM_PROMPT};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation backend is not configured")]
    Unconfigured,

    #[error("Generation backend failed: {0}")]
    Backend(String),

    #[error("Generated content does not match the expected shape: {0}")]
    Malformed(String),

    #[error("Generation timed out after {0} seconds")]
    Timeout(u64),
}

/// Turns a structured brief into proposal content
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, brief: &GenerationBrief) -> Result<ProposalContent, GenerationError>;
}

/// Drafts content through the Anthropic Messages API
pub struct AnthropicBackend {
    service: AIService,
}

impl AnthropicBackend {
    pub fn new(service: AIService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(&self, brief: &GenerationBrief) -> Result<ProposalContent, GenerationError> {
        let response = self
            .service
            .generate_structured::<ProposalContent>(
                proposal_content_prompt(brief),
                Some(SYSTEM_PROMPT.to_string()),
            )
            .await
            .map_err(|e| match e {
                AIServiceError::NoApiKey => GenerationError::Unconfigured,
                AIServiceError::ParseError(message) => GenerationError::Malformed(message),
                other => GenerationError::Backend(other.to_string()),
            })?;

        info!(
            "Drafted proposal content with {} ({} tokens)",
            self.service.model(),
            response.usage.total_tokens()
        );
        Ok(response.data)
    }
}
