// ABOUTME: Persistence layer for proposals, events, acceptances, deposits and change requests
// ABOUTME: Defines the ProposalStorage trait and its SQLite implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proposekit_core::{
    ChangeRequest, ChangeRequestStatus, Deposit, DepositMethod, DepositType, EventType,
    ProposalAcceptance, ProposalContent, ProposalDetails, ProposalEvent, ProposalRecord,
    ProposalStatusV2,
};
use rust_decimal::Decimal;

mod error;
mod rows;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use sqlite::{SqliteStorage, StorageConfig};

/// Compare-and-swap on `status_v2`: applies only while the row still holds `from`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ProposalStatusV2,
    pub to: ProposalStatusV2,
}

impl StatusChange {
    pub fn new(from: ProposalStatusV2, to: ProposalStatusV2) -> Self {
        Self { from, to }
    }
}

/// Signature row written together with the acceptance transition
#[derive(Debug, Clone)]
pub struct NewAcceptance {
    pub id: String,
    pub signer_name: String,
    pub signer_email: String,
    pub signer_role: Option<String>,
    pub acceptance_ip: Option<String>,
    pub acceptance_user_agent: Option<String>,
}

/// Deposit opened when an acceptance moves the proposal to `awaiting_deposit`
#[derive(Debug, Clone)]
pub struct PendingDeposit {
    pub id: String,
    pub deposit_type: Option<DepositType>,
    pub amount: Decimal,
    pub method: DepositMethod,
}

/// How to record the deposit when a proposal is marked paid
///
/// An open pending deposit is settled in place; otherwise a paid row is
/// inserted from these values.
#[derive(Debug, Clone)]
pub struct DepositSettlement {
    pub id: String,
    pub deposit_type: Option<DepositType>,
    pub amount: Decimal,
    pub method: DepositMethod,
}

#[async_trait]
pub trait ProposalStorage: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;

    // Proposals
    async fn insert_proposal(&self, proposal: &ProposalRecord) -> StorageResult<()>;
    async fn get_proposal(&self, id: &str) -> StorageResult<Option<ProposalRecord>>;
    async fn get_proposal_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ProposalRecord>>;
    async fn list_proposals_by_owner(&self, owner_id: &str) -> StorageResult<Vec<ProposalRecord>>;

    /// Overwrite the editable fields while `status_v2` still equals `expected`
    ///
    /// When `clear_content` is set the cached content is dropped in the same statement.
    async fn update_proposal_fields(
        &self,
        id: &str,
        expected: ProposalStatusV2,
        details: &ProposalDetails,
        clear_content: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord>;

    /// Guarded lifecycle step; also stamps the timestamp column of the target status
    async fn transition_status(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord>;

    /// Flip the legacy gate to `released`; returns false when it already was
    async fn release(&self, id: &str, at: DateTime<Utc>) -> StorageResult<bool>;

    /// Transition, signature and optional pending deposit in one transaction
    async fn accept_proposal(
        &self,
        id: &str,
        change: StatusChange,
        acceptance: &NewAcceptance,
        deposit: Option<&PendingDeposit>,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalAcceptance>;

    /// Transition to `paid` and settle the deposit in one transaction
    async fn settle_deposit(
        &self,
        id: &str,
        change: StatusChange,
        settlement: Option<&DepositSettlement>,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Deposit>>;

    /// Transition to `canceled` and void pending deposits in one transaction
    async fn cancel_proposal(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord>;

    // Generated content cache
    async fn get_content(&self, id: &str) -> StorageResult<Option<ProposalContent>>;

    /// Fill the cache slot unless it was invalidated after `expected_revision` was read
    ///
    /// Returns false when the revision moved on and nothing was written.
    async fn save_content(
        &self,
        id: &str,
        content: &ProposalContent,
        expected_revision: i64,
        generated_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Drop the cached content; returns the new revision
    async fn clear_content(&self, id: &str) -> StorageResult<i64>;

    // Events
    async fn append_event(
        &self,
        proposal_id: &str,
        event_type: &EventType,
        metadata: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalEvent>;

    /// Newest first; insertion order breaks timestamp ties
    async fn list_events(&self, proposal_id: &str) -> StorageResult<Vec<ProposalEvent>>;

    // Acceptances and deposits
    async fn latest_acceptance(
        &self,
        proposal_id: &str,
    ) -> StorageResult<Option<ProposalAcceptance>>;
    async fn list_acceptances(&self, proposal_id: &str) -> StorageResult<Vec<ProposalAcceptance>>;
    async fn list_deposits(&self, proposal_id: &str) -> StorageResult<Vec<Deposit>>;

    // Change requests
    async fn insert_change_request(&self, change_request: &ChangeRequest) -> StorageResult<()>;
    async fn get_change_request_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ChangeRequest>>;
    async fn list_change_requests(&self, proposal_id: &str) -> StorageResult<Vec<ChangeRequest>>;

    /// Guarded amendment step; `approved_by` is stored when moving to `approved`
    async fn transition_change_request(
        &self,
        id: &str,
        from: ChangeRequestStatus,
        to: ChangeRequestStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<ChangeRequest>;
}
