// ABOUTME: Conversions between SQLite rows and domain records
// ABOUTME: Timestamps are fixed-width RFC 3339 text and money is decimal text so both sort and round-trip exactly

use chrono::{DateTime, SecondsFormat, Utc};
use proposekit_core::{
    ChangeRequest, Deposit, PaymentDetails, ProposalAcceptance, ProposalContent, ProposalDetails,
    ProposalEvent, ProposalRecord,
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use crate::{StorageError, StorageResult};

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidData(format!("Invalid {} timestamp: {}", column, value)))
}

fn get_timestamp(row: &SqliteRow, column: &str) -> StorageResult<DateTime<Utc>> {
    let value: String = row.try_get(column)?;
    parse_timestamp(column, &value)
}

fn get_optional_timestamp(row: &SqliteRow, column: &str) -> StorageResult<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(column)?;
    value.map(|v| parse_timestamp(column, &v)).transpose()
}

pub(crate) fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}

fn parse_decimal(column: &str, value: &str) -> StorageResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| StorageError::InvalidData(format!("Invalid {} amount: {}", column, value)))
}

fn get_decimal(row: &SqliteRow, column: &str) -> StorageResult<Decimal> {
    let value: String = row.try_get(column)?;
    parse_decimal(column, &value)
}

fn get_optional_decimal(row: &SqliteRow, column: &str) -> StorageResult<Option<Decimal>> {
    let value: Option<String> = row.try_get(column)?;
    value.map(|v| parse_decimal(column, &v)).transpose()
}

fn get_json(row: &SqliteRow, column: &str) -> StorageResult<serde_json::Value> {
    let value: String = row.try_get(column)?;
    Ok(serde_json::from_str(&value)?)
}

pub(crate) fn content_from_row(row: &SqliteRow) -> StorageResult<Option<ProposalContent>> {
    let content: Option<String> = row.try_get("content")?;
    match content {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub(crate) fn row_to_proposal(row: &SqliteRow) -> StorageResult<ProposalRecord> {
    let mode: String = row.try_get("mode")?;
    let deposit_type: Option<String> = row.try_get("deposit_type")?;
    let upsell_options: String = row.try_get("upsell_options")?;
    let status: String = row.try_get("status")?;
    let status_v2: String = row.try_get("status_v2")?;

    let details = ProposalDetails {
        client_name: row.try_get("client_name")?,
        public_title: row.try_get("public_title")?,
        title: row.try_get("title")?,
        objective: row.try_get("objective")?,
        urgency_reason: row.try_get("urgency_reason")?,
        cost_of_inaction: row.try_get("cost_of_inaction")?,
        previous_attempts: row.try_get("previous_attempts")?,
        scope: row.try_get("scope")?,
        out_of_scope: row.try_get("out_of_scope")?,
        revision_policy: row.try_get("revision_policy")?,
        decision_maker: row.try_get("decision_maker")?,
        communication: row.try_get("communication")?,
        dependencies: row.try_get("dependencies")?,
        project_value: get_decimal(row, "project_value")?,
        payment_conditions: row.try_get("payment_conditions")?,
        deadline: row.try_get("deadline")?,
        mode: mode.parse()?,
        closing_enabled: row.try_get("closing_enabled")?,
        deposit_required: row.try_get("deposit_required")?,
        deposit_type: deposit_type.map(|t| t.parse()).transpose()?,
        deposit_value: get_optional_decimal(row, "deposit_value")?,
        payment: PaymentDetails {
            pix_key: row.try_get("pix_key")?,
            pix_receiver_name: row.try_get("pix_receiver_name")?,
            pix_receiver_document: row.try_get("pix_receiver_document")?,
        },
        upsell_options: serde_json::from_str(&upsell_options)?,
    };

    Ok(ProposalRecord {
        id: row.try_get("id")?,
        share_id: row.try_get("share_id")?,
        owner_id: row.try_get("owner_id")?,
        details,
        status: status.parse()?,
        status_v2: status_v2.parse()?,
        content: content_from_row(row)?,
        content_generated_at: get_optional_timestamp(row, "content_generated_at")?,
        content_revision: row.try_get("content_revision")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
        released_at: get_optional_timestamp(row, "released_at")?,
        sent_at: get_optional_timestamp(row, "sent_at")?,
        viewed_at: get_optional_timestamp(row, "viewed_at")?,
        approved_at: get_optional_timestamp(row, "approved_at")?,
        paid_at: get_optional_timestamp(row, "paid_at")?,
        kickoff_at: get_optional_timestamp(row, "kickoff_at")?,
        canceled_at: get_optional_timestamp(row, "canceled_at")?,
    })
}

pub(crate) fn row_to_event(row: &SqliteRow) -> StorageResult<ProposalEvent> {
    let event_type: String = row.try_get("event_type")?;
    Ok(ProposalEvent {
        id: row.try_get("seq")?,
        proposal_id: row.try_get("proposal_id")?,
        event_type: event_type.into(),
        occurred_at: get_timestamp(row, "occurred_at")?,
        metadata: get_json(row, "metadata")?,
    })
}

pub(crate) fn row_to_acceptance(row: &SqliteRow) -> StorageResult<ProposalAcceptance> {
    Ok(ProposalAcceptance {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        signer_name: row.try_get("signer_name")?,
        signer_email: row.try_get("signer_email")?,
        signer_role: row.try_get("signer_role")?,
        accepted_at: get_timestamp(row, "accepted_at")?,
        acceptance_ip: row.try_get("acceptance_ip")?,
        acceptance_user_agent: row.try_get("acceptance_user_agent")?,
    })
}

pub(crate) fn row_to_deposit(row: &SqliteRow) -> StorageResult<Deposit> {
    let deposit_type: Option<String> = row.try_get("deposit_type")?;
    let status: String = row.try_get("status")?;
    let method: String = row.try_get("method")?;
    Ok(Deposit {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        deposit_type: deposit_type.map(|t| t.parse()).transpose()?,
        amount: get_decimal(row, "amount")?,
        status: status.parse()?,
        method: method.parse()?,
        created_at: get_timestamp(row, "created_at")?,
        paid_at: get_optional_timestamp(row, "paid_at")?,
    })
}

pub(crate) fn row_to_change_request(row: &SqliteRow) -> StorageResult<ChangeRequest> {
    let status: String = row.try_get("status")?;
    Ok(ChangeRequest {
        id: row.try_get("id")?,
        share_id: row.try_get("share_id")?,
        proposal_id: row.try_get("proposal_id")?,
        title: row.try_get("title")?,
        reason: row.try_get("reason")?,
        added_scope: get_json(row, "added_scope")?,
        added_pricing: get_json(row, "added_pricing")?,
        added_total: get_decimal(row, "added_total")?,
        status: status.parse()?,
        created_by: row.try_get("created_by")?,
        created_at: get_timestamp(row, "created_at")?,
        approved_at: get_optional_timestamp(row, "approved_at")?,
        approved_by: row.try_get("approved_by")?,
        merged_at: get_optional_timestamp(row, "merged_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_timestamps_are_fixed_width() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let later = early + chrono::Duration::microseconds(1);
        assert_eq!(timestamp(early), "2024-01-02T03:04:05.000000Z");
        assert!(timestamp(early) < timestamp(later));
        assert_eq!(parse_timestamp("t", &timestamp(later)).unwrap(), later);
    }

    #[test]
    fn test_decimal_text_strips_trailing_zeros() {
        assert_eq!(decimal_text(dec!(1000.00)), "1000");
        assert_eq!(decimal_text(dec!(12.50)), "12.5");
        assert_eq!(parse_decimal("v", "12.5").unwrap(), dec!(12.5));
        assert!(parse_decimal("v", "abc").is_err());
    }
}
