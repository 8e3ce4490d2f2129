// ABOUTME: Proposal data model shared by storage, engine and CLI
// ABOUTME: Records, lifecycle enums, generated content, events, acceptances, deposits and change requests

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::money;

/// Returned when a stored tag does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum persisted as text
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Whether the proposal is a plain document or carries the closing kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalMode {
    #[default]
    Proposal,
    Closing,
}

text_enum!(ProposalMode, "proposal mode", {
    Proposal => "proposal",
    Closing => "closing",
});

/// Legacy release gate controlling downloads and public visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    #[default]
    Draft,
    Released,
}

text_enum!(ProposalStatus, "proposal status", {
    Draft => "draft",
    Released => "released",
});

/// Closing-kit lifecycle of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatusV2 {
    #[default]
    Draft,
    Sent,
    Viewed,
    Approved,
    AwaitingDeposit,
    Paid,
    Kickoff,
    Canceled,
}

text_enum!(ProposalStatusV2, "proposal lifecycle status", {
    Draft => "draft",
    Sent => "sent",
    Viewed => "viewed",
    Approved => "approved",
    AwaitingDeposit => "awaiting_deposit",
    Paid => "paid",
    Kickoff => "kickoff",
    Canceled => "canceled",
});

impl ProposalStatusV2 {
    /// Position along the forward path; `None` for the canceled escape
    pub fn rank(&self) -> Option<u8> {
        match self {
            ProposalStatusV2::Draft => Some(0),
            ProposalStatusV2::Sent => Some(1),
            ProposalStatusV2::Viewed => Some(2),
            ProposalStatusV2::Approved => Some(3),
            ProposalStatusV2::AwaitingDeposit => Some(4),
            ProposalStatusV2::Paid => Some(5),
            ProposalStatusV2::Kickoff => Some(6),
            ProposalStatusV2::Canceled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatusV2::Kickoff | ProposalStatusV2::Canceled)
    }

    /// True once the counterpart has signed
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            ProposalStatusV2::Approved
                | ProposalStatusV2::AwaitingDeposit
                | ProposalStatusV2::Paid
                | ProposalStatusV2::Kickoff
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositType {
    Percent,
    Fixed,
}

text_enum!(DepositType, "deposit type", {
    Percent => "percent",
    Fixed => "fixed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositMethod {
    PixManual,
    PixProvider,
    Manual,
}

text_enum!(DepositMethod, "deposit method", {
    PixManual => "pix_manual",
    PixProvider => "pix_provider",
    Manual => "manual",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Paid,
    Canceled,
}

text_enum!(DepositStatus, "deposit status", {
    Pending => "pending",
    Paid => "paid",
    Canceled => "canceled",
});

/// Amendment lifecycle: `draft → approved → merged`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Draft,
    Approved,
    Merged,
}

text_enum!(ChangeRequestStatus, "change request status", {
    Draft => "draft",
    Approved => "approved",
    Merged => "merged",
});

impl ChangeRequestStatus {
    /// Whether the amendment's `added_total` belongs to the contract value
    pub fn counts_toward_contract(&self) -> bool {
        matches!(self, ChangeRequestStatus::Approved | ChangeRequestStatus::Merged)
    }
}

/// Where the client sends the deposit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub pix_key: Option<String>,
    pub pix_receiver_name: Option<String>,
    pub pix_receiver_document: Option<String>,
}

/// Optional extra offered to the viewer next to the main proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellOption {
    pub title: String,
    pub value: Decimal,
}

/// Every owner-editable field of a proposal, already normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDetails {
    pub client_name: String,
    pub public_title: Option<String>,
    pub title: Option<String>,
    pub objective: Option<String>,
    pub urgency_reason: Option<String>,
    pub cost_of_inaction: Option<String>,
    pub previous_attempts: Option<String>,
    pub scope: Option<String>,
    pub out_of_scope: Option<String>,
    pub revision_policy: Option<String>,
    pub decision_maker: Option<String>,
    pub communication: Option<String>,
    pub dependencies: Option<String>,

    pub project_value: Decimal,
    pub payment_conditions: Option<String>,
    pub deadline: Option<String>,

    pub mode: ProposalMode,
    pub closing_enabled: bool,
    pub deposit_required: bool,
    pub deposit_type: Option<DepositType>,
    pub deposit_value: Option<Decimal>,
    pub payment: PaymentDetails,

    pub upsell_options: Vec<UpsellOption>,
}

impl ProposalDetails {
    /// Whether switching from `self` to `other` changes anything the content generator reads
    pub fn affects_content(&self, other: &ProposalDetails) -> bool {
        self.client_name != other.client_name
            || self.title != other.title
            || self.objective != other.objective
            || self.urgency_reason != other.urgency_reason
            || self.cost_of_inaction != other.cost_of_inaction
            || self.previous_attempts != other.previous_attempts
            || self.scope != other.scope
            || self.out_of_scope != other.out_of_scope
            || self.revision_policy != other.revision_policy
            || self.decision_maker != other.decision_maker
            || self.communication != other.communication
            || self.dependencies != other.dependencies
            || self.project_value != other.project_value
            || self.payment_conditions != other.payment_conditions
            || self.deadline != other.deadline
    }

    /// Deposit owed before kickoff, rounded to cents
    ///
    /// `None` when no deposit is required or the terms are incomplete.
    pub fn deposit_amount(&self) -> Option<Decimal> {
        if !self.deposit_required {
            return None;
        }
        let value = self.deposit_value?;
        match self.deposit_type? {
            DepositType::Percent => Some(money::percent_of(self.project_value, value)),
            DepositType::Fixed => Some(value.round_dp(2)),
        }
    }
}

/// One commercial offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: String,
    pub share_id: String,
    pub owner_id: String,

    #[serde(flatten)]
    pub details: ProposalDetails,

    pub status: ProposalStatus,
    pub status_v2: ProposalStatusV2,

    pub content: Option<ProposalContent>,
    pub content_generated_at: Option<DateTime<Utc>>,
    /// Bumped whenever the cached content is invalidated
    #[serde(default)]
    pub content_revision: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub kickoff_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl ProposalRecord {
    /// Full content may be served on the public link
    pub fn is_publicly_visible(&self) -> bool {
        self.status == ProposalStatus::Released
            || (self.details.mode == ProposalMode::Closing
                && self.status_v2 != ProposalStatusV2::Draft)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Title shown to the client
    pub fn display_title(&self) -> &str {
        self.details
            .public_title
            .as_deref()
            .or(self.details.title.as_deref())
            .unwrap_or("Proposta Comercial")
    }
}

/// Structured narrative consumed read-only by the renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalContent {
    pub introduction: String,
    pub context: String,
    pub scope: Vec<String>,
    pub out_of_scope: Option<String>,
    pub operation: String,
    pub investment: String,
    pub commercial_conditions: String,
    pub timeline: String,
    pub next_steps: String,
}

impl ProposalContent {
    /// Every section present and non-blank; `out_of_scope` may be absent but never blank
    pub fn is_complete(&self) -> bool {
        let filled = |s: &str| !s.trim().is_empty();

        filled(&self.introduction)
            && filled(&self.context)
            && !self.scope.is_empty()
            && self.scope.iter().all(|item| filled(item))
            && self.out_of_scope.as_deref().map_or(true, filled)
            && filled(&self.operation)
            && filled(&self.investment)
            && filled(&self.commercial_conditions)
            && filled(&self.timeline)
            && filled(&self.next_steps)
    }
}

/// Audit tag for a proposal event; unknown tags are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    View,
    Approved,
    MarkedPaid,
    Canceled,
    Released,
    Kickoff,
    ContentRegenerated,
    ChangeRequestCreated,
    ChangeRequestApproved,
    ChangeRequestMerged,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::View => "view",
            EventType::Approved => "approved",
            EventType::MarkedPaid => "marked_paid",
            EventType::Canceled => "canceled",
            EventType::Released => "released",
            EventType::Kickoff => "kickoff",
            EventType::ContentRegenerated => "content_regenerated",
            EventType::ChangeRequestCreated => "change_request_created",
            EventType::ChangeRequestApproved => "change_request_approved",
            EventType::ChangeRequestMerged => "change_request_merged",
            EventType::Other(tag) => tag,
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag {
            "view" => EventType::View,
            "approved" => EventType::Approved,
            "marked_paid" => EventType::MarkedPaid,
            "canceled" => EventType::Canceled,
            "released" => EventType::Released,
            "kickoff" => EventType::Kickoff,
            "content_regenerated" => EventType::ContentRegenerated,
            "change_request_created" => EventType::ChangeRequestCreated,
            "change_request_approved" => EventType::ChangeRequestApproved,
            "change_request_merged" => EventType::ChangeRequestMerged,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        EventType::from(tag.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalEvent {
    pub id: i64,
    pub proposal_id: String,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Digital signature captured from the public acceptance form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAcceptance {
    pub id: String,
    pub proposal_id: String,
    pub signer_name: String,
    pub signer_email: String,
    pub signer_role: Option<String>,
    pub accepted_at: DateTime<Utc>,
    pub acceptance_ip: Option<String>,
    pub acceptance_user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub proposal_id: String,
    pub deposit_type: Option<DepositType>,
    pub amount: Decimal,
    pub status: DepositStatus,
    pub method: DepositMethod,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Scope/price amendment issued after the proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: String,
    pub share_id: String,
    pub proposal_id: String,
    pub title: String,
    pub reason: Option<String>,
    pub added_scope: serde_json::Value,
    pub added_pricing: serde_json::Value,
    pub added_total: Decimal,
    pub status: ChangeRequestStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Identity of whoever signs on a public link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}
