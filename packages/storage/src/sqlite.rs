// ABOUTME: SQLite implementation of ProposalStorage
// ABOUTME: Lifecycle writes are guarded updates so concurrent callers cannot both win the same transition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proposekit_core::{
    ChangeRequest, ChangeRequestStatus, Deposit, DepositStatus, EventType, ProposalAcceptance,
    ProposalContent, ProposalDetails, ProposalEvent, ProposalRecord, ProposalStatus,
    ProposalStatusV2,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::is_unique_violation;
use crate::rows::{
    content_from_row, decimal_text, row_to_acceptance, row_to_change_request, row_to_deposit,
    row_to_event, row_to_proposal, timestamp,
};
use crate::{
    DepositSettlement, NewAcceptance, PendingDeposit, ProposalStorage, StatusChange,
    StorageError, StorageResult,
};

const IN_MEMORY: &str = ":memory:";

/// Connection settings for the SQLite pool
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: String,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
    pub enable_wal: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "proposekit.db".to_string(),
            max_connections: 5,
            busy_timeout_seconds: 30,
            enable_wal: true,
        }
    }
}

impl StorageConfig {
    pub fn new(database_path: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_path: database_path.into(),
            max_connections,
            ..Default::default()
        }
    }

    /// Private in-memory database; a single connection keeps every query on the same database
    pub fn in_memory() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            max_connections: 1,
            busy_timeout_seconds: 5,
            enable_wal: false,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }
}

/// Timestamp column stamped when a proposal reaches `status`
fn timestamp_column(status: ProposalStatusV2) -> Option<&'static str> {
    match status {
        ProposalStatusV2::Draft => None,
        ProposalStatusV2::Sent => Some("sent_at"),
        ProposalStatusV2::Viewed => Some("viewed_at"),
        ProposalStatusV2::Approved | ProposalStatusV2::AwaitingDeposit => Some("approved_at"),
        ProposalStatusV2::Paid => Some("paid_at"),
        ProposalStatusV2::Kickoff => Some("kickoff_at"),
        ProposalStatusV2::Canceled => Some("canceled_at"),
    }
}

fn change_request_timestamp_column(status: ChangeRequestStatus) -> Option<&'static str> {
    match status {
        ChangeRequestStatus::Draft => None,
        ChangeRequestStatus::Approved => Some("approved_at"),
        ChangeRequestStatus::Merged => Some("merged_at"),
    }
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) the database described by `config`
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true);
            if config.enable_wal {
                options.journal_mode(SqliteJournalMode::Wal)
            } else {
                options
            }
        };

        let options = options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        debug!("Opening database at: {}", config.database_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.busy_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    async fn current_status(&self, id: &str) -> StorageResult<Option<ProposalStatusV2>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status_v2 FROM proposals WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        status.map(|s| s.parse().map_err(StorageError::from)).transpose()
    }

    /// Explain a guarded update that touched no rows
    async fn lost_guard(&self, id: &str, expected: ProposalStatusV2) -> StorageError {
        match self.current_status(id).await {
            Ok(Some(actual)) => StorageError::Conflict {
                id: id.to_string(),
                expected,
                actual,
            },
            Ok(None) => StorageError::NotFound(id.to_string()),
            Err(e) => e,
        }
    }

    async fn require_proposal(&self, id: &str) -> StorageResult<ProposalRecord> {
        self.get_proposal(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Guarded status update inside an open transaction
    async fn transition_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let column = timestamp_column(change.to).ok_or_else(|| {
            StorageError::InvalidData(format!("Cannot move proposal {} back to draft", id))
        })?;
        let now = timestamp(at);
        let sql = format!(
            "UPDATE proposals SET status_v2 = ?, updated_at = ?, {col} = COALESCE({col}, ?) \
             WHERE id = ? AND status_v2 = ?",
            col = column
        );

        let result = sqlx::query(&sql)
            .bind(change.to.as_str())
            .bind(&now)
            .bind(&now)
            .bind(id)
            .bind(change.from.as_str())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status_v2 FROM proposals WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?;
            return Err(match actual {
                Some(actual) => StorageError::Conflict {
                    id: id.to_string(),
                    expected: change.from,
                    actual: actual.parse()?,
                },
                None => StorageError::NotFound(id.to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProposalStorage for SqliteStorage {
    async fn initialize(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn insert_proposal(&self, proposal: &ProposalRecord) -> StorageResult<()> {
        let d = &proposal.details;
        let content = proposal
            .content
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO proposals (
                id, share_id, owner_id,
                client_name, public_title, title, objective, urgency_reason, cost_of_inaction,
                previous_attempts, scope, out_of_scope, revision_policy, decision_maker,
                communication, dependencies, project_value, payment_conditions, deadline,
                mode, closing_enabled, deposit_required, deposit_type, deposit_value,
                pix_key, pix_receiver_name, pix_receiver_document, upsell_options,
                status, status_v2, content, content_generated_at, content_revision,
                created_at, updated_at, released_at, sent_at, viewed_at,
                approved_at, paid_at, kickoff_at, canceled_at
            ) VALUES (
                ?, ?, ?,
                ?, ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?, ?,
                ?, ?, ?, ?
            )
            "#,
        )
        .bind(&proposal.id)
        .bind(&proposal.share_id)
        .bind(&proposal.owner_id)
        .bind(&d.client_name)
        .bind(&d.public_title)
        .bind(&d.title)
        .bind(&d.objective)
        .bind(&d.urgency_reason)
        .bind(&d.cost_of_inaction)
        .bind(&d.previous_attempts)
        .bind(&d.scope)
        .bind(&d.out_of_scope)
        .bind(&d.revision_policy)
        .bind(&d.decision_maker)
        .bind(&d.communication)
        .bind(&d.dependencies)
        .bind(decimal_text(d.project_value))
        .bind(&d.payment_conditions)
        .bind(&d.deadline)
        .bind(d.mode.as_str())
        .bind(d.closing_enabled)
        .bind(d.deposit_required)
        .bind(d.deposit_type.map(|t| t.as_str()))
        .bind(d.deposit_value.map(decimal_text))
        .bind(&d.payment.pix_key)
        .bind(&d.payment.pix_receiver_name)
        .bind(&d.payment.pix_receiver_document)
        .bind(serde_json::to_string(&d.upsell_options)?)
        .bind(proposal.status.as_str())
        .bind(proposal.status_v2.as_str())
        .bind(content)
        .bind(proposal.content_generated_at.map(timestamp))
        .bind(proposal.content_revision)
        .bind(timestamp(proposal.created_at))
        .bind(timestamp(proposal.updated_at))
        .bind(proposal.released_at.map(timestamp))
        .bind(proposal.sent_at.map(timestamp))
        .bind(proposal.viewed_at.map(timestamp))
        .bind(proposal.approved_at.map(timestamp))
        .bind(proposal.paid_at.map(timestamp))
        .bind(proposal.kickoff_at.map(timestamp))
        .bind(proposal.canceled_at.map(timestamp))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Inserted proposal {}", proposal.id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::DuplicateShareId(proposal.share_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_proposal(&self, id: &str) -> StorageResult<Option<ProposalRecord>> {
        let row = sqlx::query("SELECT * FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_proposal).transpose()
    }

    async fn get_proposal_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ProposalRecord>> {
        let row = sqlx::query("SELECT * FROM proposals WHERE share_id = ?")
            .bind(share_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_proposal).transpose()
    }

    async fn list_proposals_by_owner(&self, owner_id: &str) -> StorageResult<Vec<ProposalRecord>> {
        let rows =
            sqlx::query("SELECT * FROM proposals WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_proposal).collect()
    }

    async fn update_proposal_fields(
        &self,
        id: &str,
        expected: ProposalStatusV2,
        details: &ProposalDetails,
        clear_content: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        let d = details;
        let result = sqlx::query(
            r#"
            UPDATE proposals SET
                client_name = ?, public_title = ?, title = ?, objective = ?,
                urgency_reason = ?, cost_of_inaction = ?, previous_attempts = ?,
                scope = ?, out_of_scope = ?, revision_policy = ?, decision_maker = ?,
                communication = ?, dependencies = ?, project_value = ?,
                payment_conditions = ?, deadline = ?, mode = ?, closing_enabled = ?,
                deposit_required = ?, deposit_type = ?, deposit_value = ?,
                pix_key = ?, pix_receiver_name = ?, pix_receiver_document = ?,
                upsell_options = ?,
                content = CASE WHEN ? THEN NULL ELSE content END,
                content_generated_at = CASE WHEN ? THEN NULL ELSE content_generated_at END,
                content_revision = content_revision + CASE WHEN ? THEN 1 ELSE 0 END,
                updated_at = ?
            WHERE id = ? AND status_v2 = ?
            "#,
        )
        .bind(&d.client_name)
        .bind(&d.public_title)
        .bind(&d.title)
        .bind(&d.objective)
        .bind(&d.urgency_reason)
        .bind(&d.cost_of_inaction)
        .bind(&d.previous_attempts)
        .bind(&d.scope)
        .bind(&d.out_of_scope)
        .bind(&d.revision_policy)
        .bind(&d.decision_maker)
        .bind(&d.communication)
        .bind(&d.dependencies)
        .bind(decimal_text(d.project_value))
        .bind(&d.payment_conditions)
        .bind(&d.deadline)
        .bind(d.mode.as_str())
        .bind(d.closing_enabled)
        .bind(d.deposit_required)
        .bind(d.deposit_type.map(|t| t.as_str()))
        .bind(d.deposit_value.map(decimal_text))
        .bind(&d.payment.pix_key)
        .bind(&d.payment.pix_receiver_name)
        .bind(&d.payment.pix_receiver_document)
        .bind(serde_json::to_string(&d.upsell_options)?)
        .bind(clear_content)
        .bind(clear_content)
        .bind(clear_content)
        .bind(timestamp(at))
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.lost_guard(id, expected).await);
        }
        self.require_proposal(id).await
    }

    async fn transition_status(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        let mut tx = self.pool.begin().await?;
        Self::transition_in_tx(&mut tx, id, change, at).await?;
        tx.commit().await?;

        debug!(
            "Proposal {} moved {} -> {}",
            id,
            change.from.as_str(),
            change.to.as_str()
        );
        self.require_proposal(id).await
    }

    async fn release(&self, id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let now = timestamp(at);
        let result = sqlx::query(
            "UPDATE proposals SET status = ?, released_at = ?, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(ProposalStatus::Released.as_str())
        .bind(&now)
        .bind(&now)
        .bind(id)
        .bind(ProposalStatus::Draft.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.current_status(id).await? {
            Some(_) => Ok(false),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn accept_proposal(
        &self,
        id: &str,
        change: StatusChange,
        acceptance: &NewAcceptance,
        deposit: Option<&PendingDeposit>,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalAcceptance> {
        let now = timestamp(at);
        let mut tx = self.pool.begin().await?;
        Self::transition_in_tx(&mut tx, id, change, at).await?;

        sqlx::query(
            r#"
            INSERT INTO proposal_acceptances (
                id, proposal_id, signer_name, signer_email, signer_role,
                accepted_at, acceptance_ip, acceptance_user_agent
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&acceptance.id)
        .bind(id)
        .bind(&acceptance.signer_name)
        .bind(&acceptance.signer_email)
        .bind(&acceptance.signer_role)
        .bind(&now)
        .bind(&acceptance.acceptance_ip)
        .bind(&acceptance.acceptance_user_agent)
        .execute(&mut *tx)
        .await?;

        if let Some(deposit) = deposit {
            sqlx::query(
                r#"
                INSERT INTO deposits (id, proposal_id, deposit_type, amount, status, method, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&deposit.id)
            .bind(id)
            .bind(deposit.deposit_type.map(|t| t.as_str()))
            .bind(decimal_text(deposit.amount))
            .bind(DepositStatus::Pending.as_str())
            .bind(deposit.method.as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ProposalAcceptance {
            id: acceptance.id.clone(),
            proposal_id: id.to_string(),
            signer_name: acceptance.signer_name.clone(),
            signer_email: acceptance.signer_email.clone(),
            signer_role: acceptance.signer_role.clone(),
            accepted_at: at,
            acceptance_ip: acceptance.acceptance_ip.clone(),
            acceptance_user_agent: acceptance.acceptance_user_agent.clone(),
        })
    }

    async fn settle_deposit(
        &self,
        id: &str,
        change: StatusChange,
        settlement: Option<&DepositSettlement>,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Deposit>> {
        let now = timestamp(at);
        let mut tx = self.pool.begin().await?;
        Self::transition_in_tx(&mut tx, id, change, at).await?;

        let Some(settlement) = settlement else {
            tx.commit().await?;
            return Ok(None);
        };

        let pending: Option<String> = sqlx::query_scalar(
            "SELECT id FROM deposits WHERE proposal_id = ? AND status = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(id)
        .bind(DepositStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let deposit_id = match pending {
            Some(deposit_id) => {
                sqlx::query("UPDATE deposits SET status = ?, paid_at = ? WHERE id = ?")
                    .bind(DepositStatus::Paid.as_str())
                    .bind(&now)
                    .bind(&deposit_id)
                    .execute(&mut *tx)
                    .await?;
                deposit_id
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO deposits (
                        id, proposal_id, deposit_type, amount, status, method, created_at, paid_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&settlement.id)
                .bind(id)
                .bind(settlement.deposit_type.map(|t| t.as_str()))
                .bind(decimal_text(settlement.amount))
                .bind(DepositStatus::Paid.as_str())
                .bind(settlement.method.as_str())
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
                settlement.id.clone()
            }
        };

        let row = sqlx::query("SELECT * FROM deposits WHERE id = ?")
            .bind(&deposit_id)
            .fetch_one(&mut *tx)
            .await?;
        let deposit = row_to_deposit(&row)?;

        tx.commit().await?;
        Ok(Some(deposit))
    }

    async fn cancel_proposal(
        &self,
        id: &str,
        change: StatusChange,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalRecord> {
        let mut tx = self.pool.begin().await?;
        Self::transition_in_tx(&mut tx, id, change, at).await?;

        let result =
            sqlx::query("UPDATE deposits SET status = ? WHERE proposal_id = ? AND status = ?")
                .bind(DepositStatus::Canceled.as_str())
                .bind(id)
                .bind(DepositStatus::Pending.as_str())
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;

        if result.rows_affected() > 0 {
            debug!(
                "Canceled {} pending deposit(s) for {}",
                result.rows_affected(),
                id
            );
        }
        self.require_proposal(id).await
    }

    async fn get_content(&self, id: &str) -> StorageResult<Option<ProposalContent>> {
        let row = sqlx::query("SELECT content FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        content_from_row(&row)
    }

    async fn save_content(
        &self,
        id: &str,
        content: &ProposalContent,
        expected_revision: i64,
        generated_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE proposals SET content = ?, content_generated_at = ? \
             WHERE id = ? AND content_revision = ?",
        )
        .bind(serde_json::to_string(content)?)
        .bind(timestamp(generated_at))
        .bind(id)
        .bind(expected_revision)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.current_status(id).await? {
            Some(_) => Ok(false),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn clear_content(&self, id: &str) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE proposals SET content = NULL, content_generated_at = NULL, \
             content_revision = content_revision + 1 WHERE id = ? RETURNING content_revision",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn append_event(
        &self,
        proposal_id: &str,
        event_type: &EventType,
        metadata: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> StorageResult<ProposalEvent> {
        let result = sqlx::query(
            "INSERT INTO proposal_events (proposal_id, event_type, occurred_at, metadata) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(proposal_id)
        .bind(event_type.as_str())
        .bind(timestamp(at))
        .bind(serde_json::to_string(metadata)?)
        .execute(&self.pool)
        .await?;

        Ok(ProposalEvent {
            id: result.last_insert_rowid(),
            proposal_id: proposal_id.to_string(),
            event_type: event_type.clone(),
            occurred_at: at,
            metadata: metadata.clone(),
        })
    }

    async fn list_events(&self, proposal_id: &str) -> StorageResult<Vec<ProposalEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM proposal_events WHERE proposal_id = ? \
             ORDER BY occurred_at DESC, seq DESC",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_event).collect()
    }

    async fn latest_acceptance(
        &self,
        proposal_id: &str,
    ) -> StorageResult<Option<ProposalAcceptance>> {
        let row = sqlx::query(
            "SELECT * FROM proposal_acceptances WHERE proposal_id = ? \
             ORDER BY accepted_at DESC, rowid DESC LIMIT 1",
        )
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_acceptance).transpose()
    }

    async fn list_acceptances(&self, proposal_id: &str) -> StorageResult<Vec<ProposalAcceptance>> {
        let rows = sqlx::query(
            "SELECT * FROM proposal_acceptances WHERE proposal_id = ? \
             ORDER BY accepted_at DESC, rowid DESC",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_acceptance).collect()
    }

    async fn list_deposits(&self, proposal_id: &str) -> StorageResult<Vec<Deposit>> {
        let rows = sqlx::query(
            "SELECT * FROM deposits WHERE proposal_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_deposit).collect()
    }

    async fn insert_change_request(&self, change_request: &ChangeRequest) -> StorageResult<()> {
        let cr = change_request;
        let result = sqlx::query(
            r#"
            INSERT INTO change_requests (
                id, share_id, proposal_id, title, reason, added_scope, added_pricing,
                added_total, status, created_by, created_at, approved_at, approved_by, merged_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cr.id)
        .bind(&cr.share_id)
        .bind(&cr.proposal_id)
        .bind(&cr.title)
        .bind(&cr.reason)
        .bind(serde_json::to_string(&cr.added_scope)?)
        .bind(serde_json::to_string(&cr.added_pricing)?)
        .bind(decimal_text(cr.added_total))
        .bind(cr.status.as_str())
        .bind(&cr.created_by)
        .bind(timestamp(cr.created_at))
        .bind(cr.approved_at.map(timestamp))
        .bind(&cr.approved_by)
        .bind(cr.merged_at.map(timestamp))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::DuplicateShareId(cr.share_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_change_request_by_share_id(
        &self,
        share_id: &str,
    ) -> StorageResult<Option<ChangeRequest>> {
        let row = sqlx::query("SELECT * FROM change_requests WHERE share_id = ?")
            .bind(share_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_change_request).transpose()
    }

    async fn list_change_requests(&self, proposal_id: &str) -> StorageResult<Vec<ChangeRequest>> {
        let rows = sqlx::query(
            "SELECT * FROM change_requests WHERE proposal_id = ? ORDER BY created_at, rowid",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_change_request).collect()
    }

    async fn transition_change_request(
        &self,
        id: &str,
        from: ChangeRequestStatus,
        to: ChangeRequestStatus,
        approved_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<ChangeRequest> {
        let column = change_request_timestamp_column(to).ok_or_else(|| {
            StorageError::InvalidData(format!("Cannot move change request {} back to draft", id))
        })?;
        let sql = format!(
            "UPDATE change_requests SET status = ?, {col} = ?, \
             approved_by = COALESCE(?, approved_by) WHERE id = ? AND status = ?",
            col = column
        );

        let result = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(timestamp(at))
            .bind(approved_by)
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT * FROM change_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::ChangeRequestConflict {
                id: id.to_string(),
                expected: from.as_str().to_string(),
            });
        }
        row_to_change_request(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_forward_status_has_a_timestamp() {
        for status in [
            ProposalStatusV2::Sent,
            ProposalStatusV2::Viewed,
            ProposalStatusV2::Approved,
            ProposalStatusV2::AwaitingDeposit,
            ProposalStatusV2::Paid,
            ProposalStatusV2::Kickoff,
            ProposalStatusV2::Canceled,
        ] {
            assert!(timestamp_column(status).is_some(), "{status}");
        }
        assert_eq!(timestamp_column(ProposalStatusV2::Draft), None);
    }

    #[test]
    fn test_in_memory_config_uses_single_connection() {
        let config = StorageConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(!StorageConfig::default().is_in_memory());
    }
}
