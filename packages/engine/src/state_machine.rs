// ABOUTME: Legal status_v2 transitions, in one place
// ABOUTME: Each named transition checks its own precondition and returns the target status

use proposekit_core::ProposalStatusV2;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Share,
    Accept,
    MarkPaid,
    Kickoff,
    Cancel,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Share => "share",
            Transition::Accept => "accept",
            Transition::MarkPaid => "mark paid",
            Transition::Kickoff => "kickoff",
            Transition::Cancel => "cancel",
        }
    }
}

fn rejected(transition: Transition, current: ProposalStatusV2, requirement: &str) -> EngineError {
    EngineError::PreconditionFailed(format!(
        "cannot {} a proposal in status '{}': {}",
        transition.name(),
        current,
        requirement
    ))
}

/// Target status for `transition` from `current`, or the violated precondition
pub fn target_status(
    transition: Transition,
    current: ProposalStatusV2,
    deposit_required: bool,
) -> EngineResult<ProposalStatusV2> {
    use ProposalStatusV2::*;

    match (transition, current) {
        (Transition::Share, Draft) => Ok(Sent),
        (Transition::Share, _) => Err(rejected(transition, current, "only drafts can be shared")),

        (Transition::Accept, Sent | Viewed) if deposit_required => Ok(AwaitingDeposit),
        (Transition::Accept, Sent | Viewed) => Ok(Approved),
        (Transition::Accept, _) => Err(rejected(
            transition,
            current,
            "the proposal must be sent or viewed",
        )),

        (Transition::MarkPaid, AwaitingDeposit) => Ok(Paid),
        (Transition::MarkPaid, Approved) if !deposit_required => Ok(Paid),
        (Transition::MarkPaid, Approved) => Err(rejected(
            transition,
            current,
            "a required deposit must be awaited first",
        )),
        (Transition::MarkPaid, _) => Err(rejected(
            transition,
            current,
            "the proposal must be accepted first",
        )),

        (Transition::Kickoff, Paid) => Ok(Kickoff),
        (Transition::Kickoff, _) => Err(rejected(
            transition,
            current,
            "the deposit must be paid first",
        )),

        (Transition::Cancel, status) if !status.is_terminal() => Ok(Canceled),
        (Transition::Cancel, _) => Err(rejected(
            transition,
            current,
            "the proposal is already closed",
        )),
    }
}

/// Opening the public link moves early proposals to `viewed`; later states are left alone
pub fn view_target(current: ProposalStatusV2) -> Option<ProposalStatusV2> {
    match current {
        ProposalStatusV2::Draft | ProposalStatusV2::Sent => Some(ProposalStatusV2::Viewed),
        _ => None,
    }
}
