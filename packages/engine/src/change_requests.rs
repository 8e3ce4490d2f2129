// ABOUTME: Change request ledger: scope/price amendments approved by the client on their own link
// ABOUTME: Contract value is derived at read time as base value plus approved and merged additions

use std::sync::Arc;

use chrono::Utc;
use proposekit_core::validation::normalize_signer;
use proposekit_core::{
    generate_id, generate_share_id, ChangeRequest, ChangeRequestCreateInput, ChangeRequestStatus,
    EventType, ProposalRecord, ProposalStatusV2,
};
use proposekit_storage::{ProposalStorage, StorageError};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::actor::{ensure_owner, Actor};
use crate::error::{EngineError, EngineResult};
use crate::events::EventLog;
use crate::lifecycle::SHARE_ID_ATTEMPTS;

/// Shown when the owner gave no reason for the amendment
pub const DEFAULT_REASON: &str = "Expansão de escopo solicitada.";

/// Base value, accepted additions and their sum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub base_value: Decimal,
    pub approved_additions: Decimal,
    pub pending_additions: Decimal,
    pub total: Decimal,
}

/// Aggregate contract value; draft amendments contribute nothing
pub fn contract_summary(base_value: Decimal, change_requests: &[ChangeRequest]) -> ContractSummary {
    let (approved, pending) = change_requests.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(approved, pending), cr| {
            if cr.status.counts_toward_contract() {
                (approved + cr.added_total, pending)
            } else {
                (approved, pending + cr.added_total)
            }
        },
    );
    ContractSummary {
        base_value,
        approved_additions: approved,
        pending_additions: pending,
        total: base_value + approved,
    }
}

/// What the client sees on an amendment link
#[derive(Debug, Clone, Serialize)]
pub struct PublicChangeRequest {
    pub share_id: String,
    pub client_name: String,
    pub proposal_title: String,
    pub title: String,
    pub reason: String,
    pub added_scope: serde_json::Value,
    pub added_pricing: serde_json::Value,
    pub added_total: Decimal,
    pub status: ChangeRequestStatus,
}

#[derive(Clone)]
pub struct ChangeRequestLedger {
    storage: Arc<dyn ProposalStorage>,
    events: EventLog,
}

impl ChangeRequestLedger {
    pub fn new(storage: Arc<dyn ProposalStorage>, events: EventLog) -> Self {
        Self { storage, events }
    }

    async fn load_proposal(&self, id: &str) -> EngineResult<ProposalRecord> {
        self.storage
            .get_proposal(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("proposal {}", id)))
    }

    async fn load_by_share_id(&self, share_id: &str) -> EngineResult<ChangeRequest> {
        self.storage
            .get_change_request_by_share_id(share_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("change request {}", share_id)))
    }

    /// Owner drafts an amendment with its own public share id
    pub async fn create(
        &self,
        actor: &Actor,
        proposal_id: &str,
        input: ChangeRequestCreateInput,
    ) -> EngineResult<ChangeRequest> {
        let proposal = self.load_proposal(proposal_id).await?;
        ensure_owner(&proposal, actor)?;
        if proposal.status_v2 == ProposalStatusV2::Canceled {
            return Err(EngineError::PreconditionFailed(
                "canceled proposals cannot receive change requests".to_string(),
            ));
        }

        let amendment = input.normalize()?;
        let mut change_request = ChangeRequest {
            id: generate_id(),
            share_id: generate_share_id(),
            proposal_id: proposal_id.to_string(),
            title: amendment.title,
            reason: amendment.reason,
            added_scope: amendment.added_scope,
            added_pricing: amendment.added_pricing,
            added_total: amendment.added_total,
            status: ChangeRequestStatus::Draft,
            created_by: actor.label().to_string(),
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            merged_at: None,
        };

        let mut attempt = 1;
        loop {
            match self.storage.insert_change_request(&change_request).await {
                Ok(()) => break,
                Err(StorageError::DuplicateShareId(_)) if attempt < SHARE_ID_ATTEMPTS => {
                    warn!("Change request share id collision on attempt {}", attempt);
                    change_request.share_id = generate_share_id();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.events
            .record_after_transition(
                proposal_id,
                EventType::ChangeRequestCreated,
                json!({
                    "cr_id": change_request.id,
                    "share_id": change_request.share_id,
                    "added_total": change_request.added_total.to_string(),
                }),
            )
            .await;

        info!(
            "Change request {} created for proposal {}",
            change_request.id, proposal_id
        );
        Ok(change_request)
    }

    /// Client approves on the amendment's own link; only drafts can be approved
    pub async fn approve(
        &self,
        share_id: &str,
        name: &str,
        email: &str,
    ) -> EngineResult<ChangeRequest> {
        let change_request = self.load_by_share_id(share_id).await?;
        if change_request.status != ChangeRequestStatus::Draft {
            return Err(EngineError::PreconditionFailed(format!(
                "change request is already {}",
                change_request.status
            )));
        }
        let signer = normalize_signer(name, email, None)?;

        let approved = self
            .storage
            .transition_change_request(
                &change_request.id,
                ChangeRequestStatus::Draft,
                ChangeRequestStatus::Approved,
                Some(&signer.email),
                Utc::now(),
            )
            .await?;

        self.events
            .record_after_transition(
                &approved.proposal_id,
                EventType::ChangeRequestApproved,
                json!({
                    "cr_id": approved.id,
                    "signed_by": signer.email,
                    "signer_name": signer.name,
                }),
            )
            .await;
        Ok(approved)
    }

    /// Owner folds an approved amendment into the contract
    pub async fn merge(&self, actor: &Actor, share_id: &str) -> EngineResult<ChangeRequest> {
        let change_request = self.load_by_share_id(share_id).await?;
        let proposal = self.load_proposal(&change_request.proposal_id).await?;
        ensure_owner(&proposal, actor)?;
        if change_request.status != ChangeRequestStatus::Approved {
            return Err(EngineError::PreconditionFailed(format!(
                "only approved change requests can be merged, this one is {}",
                change_request.status
            )));
        }

        let merged = self
            .storage
            .transition_change_request(
                &change_request.id,
                ChangeRequestStatus::Approved,
                ChangeRequestStatus::Merged,
                None,
                Utc::now(),
            )
            .await?;

        self.events
            .record_after_transition(
                &merged.proposal_id,
                EventType::ChangeRequestMerged,
                json!({ "cr_id": merged.id, "by": actor.label() }),
            )
            .await;
        Ok(merged)
    }

    pub async fn list(&self, actor: &Actor, proposal_id: &str) -> EngineResult<Vec<ChangeRequest>> {
        let proposal = self.load_proposal(proposal_id).await?;
        ensure_owner(&proposal, actor)?;
        Ok(self.storage.list_change_requests(proposal_id).await?)
    }

    pub async fn contract_value(
        &self,
        actor: &Actor,
        proposal_id: &str,
    ) -> EngineResult<ContractSummary> {
        let proposal = self.load_proposal(proposal_id).await?;
        ensure_owner(&proposal, actor)?;
        let change_requests = self.storage.list_change_requests(proposal_id).await?;
        Ok(contract_summary(
            proposal.details.project_value,
            &change_requests,
        ))
    }

    /// Public amendment page data, addressed only by the amendment's share id
    pub async fn open(&self, share_id: &str) -> EngineResult<PublicChangeRequest> {
        let change_request = self.load_by_share_id(share_id).await?;
        let proposal = self.load_proposal(&change_request.proposal_id).await?;
        Ok(PublicChangeRequest {
            share_id: change_request.share_id,
            client_name: proposal.details.client_name.clone(),
            proposal_title: proposal.display_title().to_string(),
            title: change_request.title,
            reason: change_request
                .reason
                .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            added_scope: change_request.added_scope,
            added_pricing: change_request.added_pricing,
            added_total: change_request.added_total,
            status: change_request.status,
        })
    }
}
