// ABOUTME: Prompts and the structured brief sent to the generative backend
// ABOUTME: The brief carries pre-formatted currency so generated prose never shows raw numbers

use proposekit_core::{format_currency, ProposalDetails};
use serde::Serialize;

/// Structured input handed to a generation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationBrief {
    pub client_name: String,
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
    pub project_value: String,
    pub payment_conditions: Option<String>,
    pub deadline: Option<String>,
}

impl From<&ProposalDetails> for GenerationBrief {
    fn from(details: &ProposalDetails) -> Self {
        Self {
            client_name: details.client_name.clone(),
            title: details.title.clone(),
            objective: details.objective.clone(),
            urgency_reason: details.urgency_reason.clone(),
            cost_of_inaction: details.cost_of_inaction.clone(),
            previous_attempts: details.previous_attempts.clone(),
            scope: details.scope.clone(),
            out_of_scope: details.out_of_scope.clone(),
            revision_policy: details.revision_policy.clone(),
            decision_maker: details.decision_maker.clone(),
            communication: details.communication.clone(),
            dependencies: details.dependencies.clone(),
            project_value: format_currency(details.project_value),
            payment_conditions: details.payment_conditions.clone(),
            deadline: details.deadline.clone(),
        }
    }
}

pub const SYSTEM_PROMPT: &str = "Você é um consultor comercial sênior que redige propostas \
comerciais em português do Brasil. Transforme respostas curtas em prosa profissional, clara e \
persuasiva, sem inventar entregáveis, prazos ou valores que não foram informados. Responda \
apenas com um objeto JSON válido, sem comentários.";

/// User prompt asking for a JSON object in the `ProposalContent` shape
pub fn proposal_content_prompt(brief: &GenerationBrief) -> String {
    let brief_json = serde_json::to_string_pretty(brief).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Escreva o conteúdo de uma proposta comercial a partir do briefing abaixo.

Briefing:
{brief_json}

Retorne um objeto JSON com exatamente estas chaves:
{{
  "introduction": "parágrafo de abertura dirigido ao cliente",
  "context": "contexto e objetivo do projeto",
  "scope": ["um item por entregável listado no briefing"],
  "outOfScope": "o que não está incluso, ou null se o briefing não informar",
  "operation": "como o projeto será conduzido e comunicado",
  "investment": "frase com o valor total exatamente como em project_value",
  "commercialConditions": "condições de pagamento",
  "timeline": "prazo estimado",
  "nextSteps": "próximos passos para iniciar"
}}

Regras:
- Use somente entregáveis presentes no briefing; não crie itens novos.
- Campos ausentes devem ser tratados com frases neutras, nunca com valores inventados.
- Valores monetários devem aparecer no formato de project_value."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposekit_core::{PaymentDetails, ProposalMode};
    use rust_decimal_macros::dec;

    #[test]
    fn test_prompt_embeds_formatted_value_and_schema_keys() {
        let details = ProposalDetails {
            client_name: "Acme".to_string(),
            public_title: None,
            title: Some("Loja virtual".to_string()),
            objective: None,
            urgency_reason: None,
            cost_of_inaction: None,
            previous_attempts: None,
            scope: Some("Catálogo, Checkout".to_string()),
            out_of_scope: None,
            revision_policy: None,
            decision_maker: None,
            communication: None,
            dependencies: None,
            project_value: dec!(15000),
            payment_conditions: None,
            deadline: None,
            mode: ProposalMode::Proposal,
            closing_enabled: false,
            deposit_required: false,
            deposit_type: None,
            deposit_value: None,
            payment: PaymentDetails::default(),
            upsell_options: Vec::new(),
        };

        let prompt = proposal_content_prompt(&GenerationBrief::from(&details));
        assert!(prompt.contains("R$ 15.000,00"));
        assert!(prompt.contains("\"outOfScope\""));
        assert!(prompt.contains("\"commercialConditions\""));
        assert!(prompt.contains("Catálogo, Checkout"));
    }
}
