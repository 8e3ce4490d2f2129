// ABOUTME: Identity of whoever triggers an owner-side operation
// ABOUTME: Authenticated users must own the proposal; trusted payment confirmations may settle deposits

use proposekit_core::ProposalRecord;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Authenticated user, identified by user id
    User(String),
    /// Automated payment confirmation (e.g. a Pix provider webhook)
    PaymentProvider,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Actor::User(id.into())
    }

    /// Value written to event metadata as `by`
    pub fn label(&self) -> &str {
        match self {
            Actor::User(id) => id,
            Actor::PaymentProvider => "payment_provider",
        }
    }
}

/// Reject anyone but the proposal's owner
pub(crate) fn ensure_owner(proposal: &ProposalRecord, actor: &Actor) -> EngineResult<()> {
    match actor {
        Actor::User(id) if proposal.is_owned_by(id) => Ok(()),
        Actor::User(_) => Err(EngineError::Unauthorized(
            "Only the proposal owner can perform this action".to_string(),
        )),
        Actor::PaymentProvider => Err(EngineError::Unauthorized(
            "Payment confirmations cannot perform this action".to_string(),
        )),
    }
}

/// Owner, or a trusted payment confirmation
pub(crate) fn ensure_owner_or_provider(
    proposal: &ProposalRecord,
    actor: &Actor,
) -> EngineResult<()> {
    match actor {
        Actor::PaymentProvider => Ok(()),
        Actor::User(_) => ensure_owner(proposal, actor),
    }
}
