// ABOUTME: Content generator with caching and generative-to-template fallback
// ABOUTME: Never fails the viewing path; generative output is persisted into the proposal's cache slot

pub mod backend;
pub mod prompts;
pub mod template;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use proposekit_core::{ProposalContent, ProposalRecord};
use proposekit_storage::ProposalStorage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineResult;

pub use backend::{AnthropicBackend, GenerationBackend, GenerationError};
pub use prompts::GenerationBrief;
pub use template::{render_template, split_scope, DEFAULT_SCOPE_ITEM};

/// Which strategy produced a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Cached,
    Generative,
    Template,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Cached => "cached",
            ContentSource::Generative => "generative",
            ContentSource::Template => "template",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedContent {
    pub content: ProposalContent,
    pub source: ContentSource,
}

pub struct ContentGenerator {
    storage: Option<Arc<dyn ProposalStorage>>,
    backend: Option<Arc<dyn GenerationBackend>>,
    timeout: Duration,
}

impl ContentGenerator {
    pub fn new(
        storage: Option<Arc<dyn ProposalStorage>>,
        backend: Option<Arc<dyn GenerationBackend>>,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            backend,
            timeout,
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Cached content when present, otherwise freshly generated
    pub async fn content_for(&self, proposal: &ProposalRecord) -> GeneratedContent {
        if let Some(content) = &proposal.content {
            return GeneratedContent {
                content: content.clone(),
                source: ContentSource::Cached,
            };
        }

        // The caller's copy may be stale; another request could have filled the slot
        if let Some(storage) = &self.storage {
            match storage.get_content(&proposal.id).await {
                Ok(Some(content)) => {
                    return GeneratedContent {
                        content,
                        source: ContentSource::Cached,
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Could not read cached content for {}: {}", proposal.id, e),
            }
        }

        self.generate(proposal).await
    }

    /// Ignore any cache and run the strategies again
    pub async fn generate(&self, proposal: &ProposalRecord) -> GeneratedContent {
        match self.try_generative(proposal).await {
            Ok(content) => {
                self.persist(proposal, &content).await;
                GeneratedContent {
                    content,
                    source: ContentSource::Generative,
                }
            }
            Err(GenerationError::Unconfigured) => {
                debug!("No generation backend; using template for {}", proposal.id);
                self.template(proposal)
            }
            Err(e) => {
                warn!(
                    "Generative drafting failed for {}, falling back to template: {}",
                    proposal.id, e
                );
                self.template(proposal)
            }
        }
    }

    /// Generative strategy only, surfacing its failure instead of falling back
    pub async fn generate_strict(&self, proposal: &ProposalRecord) -> EngineResult<ProposalContent> {
        let content = self.try_generative(proposal).await?;
        self.persist(proposal, &content).await;
        Ok(content)
    }

    fn template(&self, proposal: &ProposalRecord) -> GeneratedContent {
        GeneratedContent {
            content: render_template(&proposal.details),
            source: ContentSource::Template,
        }
    }

    async fn try_generative(
        &self,
        proposal: &ProposalRecord,
    ) -> Result<ProposalContent, GenerationError> {
        let backend = self.backend.as_ref().ok_or(GenerationError::Unconfigured)?;
        let brief = GenerationBrief::from(&proposal.details);

        let content = tokio::time::timeout(self.timeout, backend.generate(&brief))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        if !content.is_complete() {
            return Err(GenerationError::Malformed(
                "one or more sections are empty".to_string(),
            ));
        }
        Ok(content)
    }

    async fn persist(&self, proposal: &ProposalRecord, content: &ProposalContent) {
        let Some(storage) = &self.storage else {
            return;
        };
        match storage
            .save_content(&proposal.id, content, proposal.content_revision, Utc::now())
            .await
        {
            Ok(true) => info!("Cached generated content for proposal {}", proposal.id),
            Ok(false) => warn!(
                "Proposal {} was edited while its content was being drafted; discarding the draft",
                proposal.id
            ),
            Err(e) => warn!(
                "Failed to cache generated content for {}: {}",
                proposal.id, e
            ),
        }
    }
}
