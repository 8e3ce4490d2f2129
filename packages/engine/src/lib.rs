// ABOUTME: ProposeKit engine - proposal content generation and lifecycle
// ABOUTME: Content generator, status state machine, event log, change requests, public links and renderers

mod actor;
pub mod change_requests;
pub mod content;
mod engine;
mod error;
pub mod events;
pub mod followup;
pub mod lifecycle;
pub mod public;
pub mod render;
pub mod state_machine;

pub use actor::Actor;
pub use change_requests::{contract_summary, ChangeRequestLedger, ContractSummary, PublicChangeRequest};
pub use content::{
    AnthropicBackend, ContentGenerator, ContentSource, GeneratedContent, GenerationBackend,
    GenerationBrief, GenerationError,
};
pub use engine::{Engine, EngineConfig, DEFAULT_GENERATION_TIMEOUT, DEFAULT_PUBLIC_BASE_URL};
pub use error::{EngineError, EngineResult};
pub use events::EventLog;
pub use followup::{followup_message, FollowupMessage};
pub use lifecycle::{AcceptanceOutcome, PaymentOutcome, ProposalLifecycle};
pub use public::{DepositView, ProposalView, PublicLinks, PublicProposal};
pub use render::{
    DocumentFormat, Document, DocumentRenderer, HtmlRenderer, MarkdownRenderer, RenderMeta,
};
pub use state_machine::Transition;
