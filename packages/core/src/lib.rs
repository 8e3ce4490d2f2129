// ABOUTME: Core proposal types, money handling and validation for ProposeKit
// ABOUTME: Foundational package shared by storage, engine and CLI; performs no I/O

pub mod inputs;
pub mod money;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export main types
pub use types::{
    ChangeRequest, ChangeRequestStatus, Deposit, DepositMethod, DepositStatus, DepositType,
    EventType, PaymentDetails, ProposalAcceptance, ProposalContent, ProposalDetails,
    ProposalEvent, ProposalMode, ProposalRecord, ProposalStatus, ProposalStatusV2, Signer,
    UnknownVariant, UpsellOption,
};

// Re-export inputs
pub use inputs::{
    AcceptanceInput, ChangeRequestCreateInput, NewChangeRequest, ProposalCreateInput,
    ProposalUpdateInput, DEFAULT_CLIENT_NAME,
};

// Re-export utilities
pub use money::{format_brl, format_currency, parse_currency, percent_of, MoneyInput};
pub use utils::{generate_id, generate_share_id};
pub use validation::{ValidationError, ValidationErrors};
