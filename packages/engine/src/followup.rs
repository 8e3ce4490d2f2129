// ABOUTME: Status-keyed follow-up message for the issuer to send to the client
// ABOUTME: Builds the text and a wa.me share link; delivery happens elsewhere

use proposekit_core::{ProposalRecord, ProposalStatusV2};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowupMessage {
    pub message: String,
    pub whatsapp_link: String,
}

pub fn proposal_link(base_url: &str, share_id: &str) -> String {
    format!("{}/p/{}", base_url.trim_end_matches('/'), share_id)
}

pub fn change_request_link(base_url: &str, share_id: &str) -> String {
    format!("{}/cr/{}", base_url.trim_end_matches('/'), share_id)
}

pub fn followup_message(proposal: &ProposalRecord, base_url: &str) -> FollowupMessage {
    let client = &proposal.details.client_name;
    let link = proposal_link(base_url, &proposal.share_id);

    let message = match proposal.status_v2 {
        ProposalStatusV2::Viewed => format!(
            "Olá {}, vi que acessou a proposta. Ficou com alguma dúvida? Segue o link: {}",
            client, link
        ),
        ProposalStatusV2::Approved | ProposalStatusV2::AwaitingDeposit => format!(
            "Olá {}, parabéns pela decisão! Para iniciarmos, segue o link para pagamento da entrada: {}/deposit",
            client, link
        ),
        ProposalStatusV2::Paid => format!(
            "Olá {}, pagamento confirmado! Vamos agendar nosso Kickoff?",
            client
        ),
        _ => format!("Olá {}, segue nossa proposta comercial: {}", client, link),
    };

    FollowupMessage {
        whatsapp_link: format!("https://wa.me/?text={}", urlencoding::encode(&message)),
        message,
    }
}
