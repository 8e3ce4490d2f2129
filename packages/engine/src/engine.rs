// ABOUTME: Facade wiring storage, generator, lifecycle, change requests and public links together
// ABOUTME: Callers construct one Engine per store and reach every service through it

use std::sync::Arc;
use std::time::Duration;

use proposekit_storage::ProposalStorage;

use crate::actor::Actor;
use crate::change_requests::ChangeRequestLedger;
use crate::content::{ContentGenerator, GenerationBackend};
use crate::error::EngineResult;
use crate::events::EventLog;
use crate::followup::{followup_message, FollowupMessage};
use crate::lifecycle::ProposalLifecycle;
use crate::public::PublicLinks;
use crate::render::{renderer_for, Document, DocumentFormat, RenderMeta};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://proposekit.com";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub generation_timeout: Duration,
    pub public_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    storage: Arc<dyn ProposalStorage>,
    content: Arc<ContentGenerator>,
    events: EventLog,
    lifecycle: ProposalLifecycle,
    change_requests: ChangeRequestLedger,
    public: PublicLinks,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        storage: Arc<dyn ProposalStorage>,
        backend: Option<Arc<dyn GenerationBackend>>,
        config: EngineConfig,
    ) -> Self {
        let content = Arc::new(ContentGenerator::new(
            Some(storage.clone()),
            backend,
            config.generation_timeout,
        ));
        let events = EventLog::new(storage.clone());
        let lifecycle = ProposalLifecycle::new(storage.clone(), events.clone(), content.clone());
        let change_requests = ChangeRequestLedger::new(storage.clone(), events.clone());
        let public = PublicLinks::new(storage.clone(), lifecycle.clone(), content.clone());

        Self {
            storage,
            content,
            events,
            lifecycle,
            change_requests,
            public,
            config,
        }
    }

    pub fn storage(&self) -> &Arc<dyn ProposalStorage> {
        &self.storage
    }

    pub fn content(&self) -> &ContentGenerator {
        &self.content
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn lifecycle(&self) -> &ProposalLifecycle {
        &self.lifecycle
    }

    pub fn change_requests(&self) -> &ChangeRequestLedger {
        &self.change_requests
    }

    pub fn public(&self) -> &PublicLinks {
        &self.public
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Owner-side document export, generating content if the cache is empty
    pub async fn render(
        &self,
        actor: &Actor,
        id: &str,
        format: DocumentFormat,
    ) -> EngineResult<Document> {
        let proposal = self.lifecycle.get_proposal(actor, id).await?;
        let generated = self.content.content_for(&proposal).await;
        let meta = RenderMeta::for_proposal(&proposal);
        Ok(renderer_for(format).render(&generated.content, &meta))
    }

    pub async fn followup(&self, actor: &Actor, id: &str) -> EngineResult<FollowupMessage> {
        let proposal = self.lifecycle.get_proposal(actor, id).await?;
        Ok(followup_message(&proposal, &self.config.public_base_url))
    }
}
