// ABOUTME: Named lifecycle operations on proposals: create, edit, share, accept, pay, kickoff, cancel, release
// ABOUTME: Every transition is a compare-and-swap on the status read at the start of the call

use std::sync::Arc;

use chrono::Utc;
use proposekit_core::{
    generate_id, generate_share_id, AcceptanceInput, Deposit, DepositMethod, EventType,
    ProposalAcceptance, ProposalCreateInput, ProposalEvent, ProposalRecord, ProposalStatus,
    ProposalStatusV2, ProposalUpdateInput,
};
use proposekit_storage::{
    DepositSettlement, NewAcceptance, PendingDeposit, ProposalStorage, StatusChange, StorageError,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::actor::{ensure_owner, ensure_owner_or_provider, Actor};
use crate::content::{ContentGenerator, GeneratedContent};
use crate::error::{EngineError, EngineResult};
use crate::events::EventLog;
use crate::state_machine::{target_status, view_target, Transition};

/// Attempts at drawing a fresh share id before giving up
pub(crate) const SHARE_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceOutcome {
    pub acceptance: ProposalAcceptance,
    pub status: ProposalStatusV2,
    pub deposit_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub proposal: ProposalRecord,
    pub deposit: Option<Deposit>,
    /// The proposal was already paid; nothing was written
    pub already_paid: bool,
}

#[derive(Clone)]
pub struct ProposalLifecycle {
    storage: Arc<dyn ProposalStorage>,
    events: EventLog,
    content: Arc<ContentGenerator>,
}

impl ProposalLifecycle {
    pub fn new(
        storage: Arc<dyn ProposalStorage>,
        events: EventLog,
        content: Arc<ContentGenerator>,
    ) -> Self {
        Self {
            storage,
            events,
            content,
        }
    }

    async fn load(&self, id: &str) -> EngineResult<ProposalRecord> {
        self.storage
            .get_proposal(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("proposal {}", id)))
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> EngineResult<ProposalRecord> {
        let proposal = self.load(id).await?;
        ensure_owner(&proposal, actor)?;
        Ok(proposal)
    }

    pub async fn create_proposal(
        &self,
        owner_id: &str,
        input: ProposalCreateInput,
    ) -> EngineResult<ProposalRecord> {
        let details = input.normalize()?;
        let now = Utc::now();
        let mut proposal = ProposalRecord {
            id: generate_id(),
            share_id: generate_share_id(),
            owner_id: owner_id.to_string(),
            details,
            status: ProposalStatus::Draft,
            status_v2: ProposalStatusV2::Draft,
            content: None,
            content_generated_at: None,
            content_revision: 0,
            created_at: now,
            updated_at: now,
            released_at: None,
            sent_at: None,
            viewed_at: None,
            approved_at: None,
            paid_at: None,
            kickoff_at: None,
            canceled_at: None,
        };

        for attempt in 1..=SHARE_ID_ATTEMPTS {
            match self.storage.insert_proposal(&proposal).await {
                Ok(()) => {
                    info!("Created proposal {} for owner {}", proposal.id, owner_id);
                    return Ok(proposal);
                }
                Err(StorageError::DuplicateShareId(_)) if attempt < SHARE_ID_ATTEMPTS => {
                    warn!("Share id collision on attempt {}, retrying", attempt);
                    proposal.share_id = generate_share_id();
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Conflict(
            "could not allocate a unique share id".to_string(),
        ))
    }

    pub async fn get_proposal(&self, actor: &Actor, id: &str) -> EngineResult<ProposalRecord> {
        self.load_owned(actor, id).await
    }

    pub async fn list_proposals(&self, owner_id: &str) -> EngineResult<Vec<ProposalRecord>> {
        Ok(self.storage.list_proposals_by_owner(owner_id).await?)
    }

    /// Edit fields before acceptance; narrative or commercial changes drop the cached content
    pub async fn update_proposal(
        &self,
        actor: &Actor,
        id: &str,
        input: ProposalUpdateInput,
    ) -> EngineResult<ProposalRecord> {
        let proposal = self.load_owned(actor, id).await?;
        let status = proposal.status_v2;
        ensure_editable(status, "edited")?;

        let next = input.apply(&proposal.details)?;
        let invalidate = proposal.details.affects_content(&next);
        let updated = self
            .storage
            .update_proposal_fields(id, status, &next, invalidate, Utc::now())
            .await?;

        if invalidate {
            debug!("Content cache cleared for proposal {}", id);
        }
        Ok(updated)
    }

    /// Drop the cache and draft the content again
    pub async fn regenerate(&self, actor: &Actor, id: &str) -> EngineResult<GeneratedContent> {
        let mut proposal = self.load_owned(actor, id).await?;
        ensure_editable(proposal.status_v2, "regenerated")?;
        proposal.content_revision = self.storage.clear_content(id).await?;
        proposal.content = None;

        let generated = self.content.generate(&proposal).await;
        self.events
            .record_after_transition(
                id,
                EventType::ContentRegenerated,
                json!({ "source": generated.source.as_str(), "by": actor.label() }),
            )
            .await;
        Ok(generated)
    }

    /// `draft → sent`; sharing an already shared proposal changes nothing
    pub async fn share(&self, actor: &Actor, id: &str) -> EngineResult<ProposalRecord> {
        let proposal = self.load_owned(actor, id).await?;
        match proposal.status_v2 {
            ProposalStatusV2::Draft => {}
            ProposalStatusV2::Canceled => {
                return Err(EngineError::PreconditionFailed(
                    "canceled proposals cannot be shared".to_string(),
                ))
            }
            _ => return Ok(proposal),
        }

        let to = target_status(Transition::Share, proposal.status_v2, false)?;
        let shared = self
            .storage
            .transition_status(id, StatusChange::new(proposal.status_v2, to), Utc::now())
            .await?;
        info!("Proposal {} shared", id);
        Ok(shared)
    }

    /// Record a public access: `view` event, plus `draft/sent → viewed`
    pub(crate) async fn record_view(&self, proposal: &ProposalRecord) -> ProposalStatusV2 {
        self.events
            .record_after_transition(
                &proposal.id,
                EventType::View,
                json!({ "source": "public_link" }),
            )
            .await;

        let Some(to) = view_target(proposal.status_v2) else {
            return proposal.status_v2;
        };
        let change = StatusChange::new(proposal.status_v2, to);
        match self
            .storage
            .transition_status(&proposal.id, change, Utc::now())
            .await
        {
            Ok(updated) => updated.status_v2,
            Err(StorageError::Conflict { actual, .. }) => actual,
            Err(e) => {
                warn!("Could not mark proposal {} as viewed: {}", proposal.id, e);
                proposal.status_v2
            }
        }
    }

    /// Signer accepts through the public link
    pub async fn accept(
        &self,
        share_id: &str,
        input: AcceptanceInput,
    ) -> EngineResult<AcceptanceOutcome> {
        let proposal = self
            .storage
            .get_proposal_by_share_id(share_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("share id {}", share_id)))?;
        if !proposal.is_publicly_visible() {
            return Err(EngineError::PreconditionFailed(
                "this proposal is not open for acceptance".to_string(),
            ));
        }

        let signer = input.signer()?;
        let details = &proposal.details;
        let to = target_status(Transition::Accept, proposal.status_v2, details.deposit_required)?;

        let (pending, deposit_amount) = if to == ProposalStatusV2::AwaitingDeposit {
            let amount = details.deposit_amount().ok_or_else(|| {
                EngineError::PreconditionFailed("deposit terms are incomplete".to_string())
            })?;
            let method = if details.payment.pix_key.is_some() {
                DepositMethod::PixManual
            } else {
                DepositMethod::Manual
            };
            let pending = PendingDeposit {
                id: generate_id(),
                deposit_type: details.deposit_type,
                amount,
                method,
            };
            (Some(pending), Some(amount))
        } else {
            (None, None)
        };

        let new_acceptance = NewAcceptance {
            id: generate_id(),
            signer_name: signer.name.clone(),
            signer_email: signer.email.clone(),
            signer_role: signer.role.clone(),
            acceptance_ip: input.acceptance_ip.clone(),
            acceptance_user_agent: input.user_agent.clone(),
        };

        let acceptance = self
            .storage
            .accept_proposal(
                &proposal.id,
                StatusChange::new(proposal.status_v2, to),
                &new_acceptance,
                pending.as_ref(),
                Utc::now(),
            )
            .await?;

        self.events
            .record_after_transition(
                &proposal.id,
                EventType::Approved,
                json!({
                    "source": "web_acceptance",
                    "signer": signer.email,
                    "signer_name": signer.name,
                }),
            )
            .await;

        info!("Proposal {} accepted, now {}", proposal.id, to);
        Ok(AcceptanceOutcome {
            acceptance,
            status: to,
            deposit_amount,
        })
    }

    /// Owner (or a trusted payment confirmation) records the deposit as paid
    pub async fn mark_deposit_paid(&self, actor: &Actor, id: &str) -> EngineResult<PaymentOutcome> {
        let proposal = self.load(id).await?;
        ensure_owner_or_provider(&proposal, actor)?;

        if proposal.status_v2 == ProposalStatusV2::Paid {
            debug!("Proposal {} already paid", id);
            return Ok(PaymentOutcome {
                proposal,
                deposit: None,
                already_paid: true,
            });
        }

        let details = &proposal.details;
        let to = target_status(Transition::MarkPaid, proposal.status_v2, details.deposit_required)?;
        let settlement = DepositSettlement {
            id: generate_id(),
            deposit_type: details.deposit_type.filter(|_| details.deposit_required),
            amount: details.deposit_amount().unwrap_or(Decimal::ZERO),
            method: match actor {
                Actor::PaymentProvider => DepositMethod::PixProvider,
                Actor::User(_) => DepositMethod::Manual,
            },
        };

        let deposit = self
            .storage
            .settle_deposit(
                id,
                StatusChange::new(proposal.status_v2, to),
                Some(&settlement),
                Utc::now(),
            )
            .await?;

        self.events
            .record_after_transition(
                id,
                EventType::MarkedPaid,
                json!({
                    "by": actor.label(),
                    "deposit_id": deposit.as_ref().map(|d| d.id.clone()),
                    "amount": deposit.as_ref().map(|d| d.amount.to_string()),
                }),
            )
            .await;

        info!("Proposal {} marked paid by {}", id, actor.label());
        Ok(PaymentOutcome {
            proposal: self.load(id).await?,
            deposit,
            already_paid: false,
        })
    }

    /// `paid → kickoff`
    pub async fn start_kickoff(&self, actor: &Actor, id: &str) -> EngineResult<ProposalRecord> {
        let proposal = self.load_owned(actor, id).await?;
        let to = target_status(
            Transition::Kickoff,
            proposal.status_v2,
            proposal.details.deposit_required,
        )?;
        let updated = self
            .storage
            .transition_status(id, StatusChange::new(proposal.status_v2, to), Utc::now())
            .await?;

        self.events
            .record_after_transition(id, EventType::Kickoff, json!({ "by": actor.label() }))
            .await;
        Ok(updated)
    }

    /// Any non-terminal state → `canceled`; open deposits are canceled too
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: &str,
        reason: Option<String>,
    ) -> EngineResult<ProposalRecord> {
        let proposal = self.load_owned(actor, id).await?;
        let to = target_status(
            Transition::Cancel,
            proposal.status_v2,
            proposal.details.deposit_required,
        )?;
        let updated = self
            .storage
            .cancel_proposal(id, StatusChange::new(proposal.status_v2, to), Utc::now())
            .await?;

        self.events
            .record_after_transition(
                id,
                EventType::Canceled,
                json!({
                    "by": actor.label(),
                    "previous_status": proposal.status_v2.as_str(),
                    "reason": reason,
                }),
            )
            .await;
        Ok(updated)
    }

    /// Legacy gate `draft → released`; one-way
    pub async fn release(&self, actor: &Actor, id: &str) -> EngineResult<ProposalRecord> {
        self.load_owned(actor, id).await?;
        if self.storage.release(id, Utc::now()).await? {
            self.events
                .record_after_transition(id, EventType::Released, json!({ "by": actor.label() }))
                .await;
            info!("Proposal {} released", id);
        }
        self.load(id).await
    }

    /// Owner-side audit timeline, newest first
    pub async fn timeline(&self, actor: &Actor, id: &str) -> EngineResult<Vec<ProposalEvent>> {
        self.load_owned(actor, id).await?;
        self.events.list(id).await
    }

    pub async fn acceptances(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EngineResult<Vec<ProposalAcceptance>> {
        self.load_owned(actor, id).await?;
        Ok(self.storage.list_acceptances(id).await?)
    }

    /// Most recent signature, if the proposal was accepted
    pub async fn latest_acceptance(
        &self,
        actor: &Actor,
        id: &str,
    ) -> EngineResult<Option<ProposalAcceptance>> {
        self.load_owned(actor, id).await?;
        Ok(self.storage.latest_acceptance(id).await?)
    }

    pub async fn deposits(&self, actor: &Actor, id: &str) -> EngineResult<Vec<Deposit>> {
        self.load_owned(actor, id).await?;
        Ok(self.storage.list_deposits(id).await?)
    }
}

/// Content and terms are frozen once the client signed or the proposal was canceled
fn ensure_editable(status: ProposalStatusV2, action: &str) -> EngineResult<()> {
    if status.is_accepted() || status == ProposalStatusV2::Canceled {
        return Err(EngineError::PreconditionFailed(format!(
            "proposals in status '{}' can no longer be {}",
            status, action
        )));
    }
    Ok(())
}
