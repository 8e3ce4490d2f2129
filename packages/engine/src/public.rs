// ABOUTME: Public-link views addressed only by share id
// ABOUTME: Invisible proposals get a restricted placeholder, never partial content

use std::sync::Arc;

use proposekit_core::{
    format_currency, PaymentDetails, ProposalContent, ProposalMode, ProposalRecord,
    ProposalStatusV2, UpsellOption,
};
use proposekit_storage::ProposalStorage;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::content::{ContentGenerator, ContentSource};
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::ProposalLifecycle;

pub const RESTRICTED_TITLE: &str = "Acesso Restrito.";
pub const RESTRICTED_MESSAGE: &str = "Esta proposta está em fase de processamento interno.";
pub const MISSING_PIX_KEY: &str = "Chave Pix não cadastrada";
pub const DEFAULT_RECEIVER: &str = "Beneficiário";

#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    pub share_id: String,
    pub title: String,
    pub client_name: String,
    pub status: ProposalStatusV2,
    pub mode: ProposalMode,
    pub closing_enabled: bool,
    pub deposit_required: bool,
    pub deposit_amount: Option<Decimal>,
    pub project_value: Decimal,
    pub upsell_options: Vec<UpsellOption>,
    pub content: ProposalContent,
    pub content_source: ContentSource,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublicProposal {
    Restricted {
        share_id: String,
        title: &'static str,
        message: &'static str,
    },
    Full(Box<ProposalView>),
}

impl PublicProposal {
    pub fn is_restricted(&self) -> bool {
        matches!(self, PublicProposal::Restricted { .. })
    }
}

/// Data behind the deposit payment page
#[derive(Debug, Clone, Serialize)]
pub struct DepositView {
    pub share_id: String,
    pub client_name: String,
    pub amount: Decimal,
    pub amount_formatted: String,
    pub pix_key: String,
    pub receiver_name: String,
    pub receiver_document: Option<String>,
    pub is_paid: bool,
    pub heading: &'static str,
}

impl DepositView {
    fn new(proposal: &ProposalRecord, amount: Decimal) -> Self {
        let PaymentDetails {
            pix_key,
            pix_receiver_name,
            pix_receiver_document,
        } = proposal.details.payment.clone();
        let is_paid = matches!(
            proposal.status_v2,
            ProposalStatusV2::Paid | ProposalStatusV2::Kickoff
        );
        Self {
            share_id: proposal.share_id.clone(),
            client_name: proposal.details.client_name.clone(),
            amount,
            amount_formatted: format_currency(amount),
            pix_key: pix_key.unwrap_or_else(|| MISSING_PIX_KEY.to_string()),
            receiver_name: pix_receiver_name.unwrap_or_else(|| DEFAULT_RECEIVER.to_string()),
            receiver_document: pix_receiver_document,
            is_paid,
            heading: if is_paid {
                "Pagamento Confirmado"
            } else {
                "Entrada do Projeto"
            },
        }
    }
}

#[derive(Clone)]
pub struct PublicLinks {
    storage: Arc<dyn ProposalStorage>,
    lifecycle: ProposalLifecycle,
    content: Arc<ContentGenerator>,
}

impl PublicLinks {
    pub fn new(
        storage: Arc<dyn ProposalStorage>,
        lifecycle: ProposalLifecycle,
        content: Arc<ContentGenerator>,
    ) -> Self {
        Self {
            storage,
            lifecycle,
            content,
        }
    }

    async fn load(&self, share_id: &str) -> EngineResult<ProposalRecord> {
        self.storage
            .get_proposal_by_share_id(share_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("share id {}", share_id)))
    }

    /// Client opens the proposal link
    pub async fn open(&self, share_id: &str) -> EngineResult<PublicProposal> {
        let proposal = self.load(share_id).await?;
        if !proposal.is_publicly_visible() {
            return Ok(PublicProposal::Restricted {
                share_id: proposal.share_id,
                title: RESTRICTED_TITLE,
                message: RESTRICTED_MESSAGE,
            });
        }

        let status = self.lifecycle.record_view(&proposal).await;
        let generated = self.content.content_for(&proposal).await;
        let details = &proposal.details;

        Ok(PublicProposal::Full(Box::new(ProposalView {
            share_id: proposal.share_id.clone(),
            title: proposal.display_title().to_string(),
            client_name: details.client_name.clone(),
            status,
            mode: details.mode,
            closing_enabled: details.closing_enabled,
            deposit_required: details.deposit_required,
            deposit_amount: details.deposit_amount(),
            project_value: details.project_value,
            upsell_options: details.upsell_options.clone(),
            content: generated.content,
            content_source: generated.source,
        })))
    }

    /// Deposit page; only for visible proposals that require a deposit
    pub async fn deposit_view(&self, share_id: &str) -> EngineResult<DepositView> {
        let proposal = self.load(share_id).await?;
        if !proposal.is_publicly_visible() {
            return Err(EngineError::PreconditionFailed(
                "this proposal is not publicly available".to_string(),
            ));
        }
        let amount = proposal.details.deposit_amount().ok_or_else(|| {
            EngineError::PreconditionFailed("this proposal does not require a deposit".to_string())
        })?;
        Ok(DepositView::new(&proposal, amount))
    }
}
