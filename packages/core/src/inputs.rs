// ABOUTME: Boundary input structs for proposal, acceptance and change-request operations
// ABOUTME: Each input normalizes once (text trimming, currency parsing) into a validated value

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::MoneyInput;
use crate::types::{
    DepositType, PaymentDetails, ProposalDetails, ProposalMode, Signer, UpsellOption,
};
use crate::validation::{
    normalize_signer, normalize_text, validate_details, ValidationError, ValidationErrors,
};

/// Placeholder used when the issuer never named the client
pub const DEFAULT_CLIENT_NAME: &str = "Cliente não identificado";

/// Fields gathered by the guided flow when a proposal is created
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalCreateInput {
    pub client_name: Option<String>,
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

    pub project_value: Option<MoneyInput>,
    pub payment_conditions: Option<String>,
    pub deadline: Option<String>,

    pub mode: Option<ProposalMode>,
    pub closing_enabled: bool,
    pub deposit_required: bool,
    pub deposit_type: Option<DepositType>,
    pub deposit_value: Option<MoneyInput>,
    pub payment: PaymentDetails,

    pub upsell_options: Vec<UpsellOption>,
}

impl ProposalCreateInput {
    /// Normalize into storable details; the project value is mandatory
    pub fn normalize(self) -> Result<ProposalDetails, ValidationErrors> {
        let mut errors = Vec::new();

        let project_value = match &self.project_value {
            None => {
                errors.push(ValidationError::new(
                    "project_value",
                    "Project value is required",
                ));
                Decimal::ZERO
            }
            Some(input) => resolve_money("project_value", input, &mut errors),
        };

        let deposit_value = self
            .deposit_value
            .as_ref()
            .map(|input| resolve_money("deposit_value", input, &mut errors));

        let details = ProposalDetails {
            client_name: normalize_text(self.client_name)
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            public_title: normalize_text(self.public_title),
            title: normalize_text(self.title),
            objective: normalize_text(self.objective),
            urgency_reason: normalize_text(self.urgency_reason),
            cost_of_inaction: normalize_text(self.cost_of_inaction),
            previous_attempts: normalize_text(self.previous_attempts),
            scope: normalize_text(self.scope),
            out_of_scope: normalize_text(self.out_of_scope),
            revision_policy: normalize_text(self.revision_policy),
            decision_maker: normalize_text(self.decision_maker),
            communication: normalize_text(self.communication),
            dependencies: normalize_text(self.dependencies),
            project_value,
            payment_conditions: normalize_text(self.payment_conditions),
            deadline: normalize_text(self.deadline),
            mode: self.mode.unwrap_or_default(),
            closing_enabled: self.closing_enabled,
            deposit_required: self.deposit_required,
            deposit_type: self.deposit_type,
            deposit_value,
            payment: normalize_payment(self.payment),
            upsell_options: normalize_upsells(self.upsell_options),
        };

        errors.extend(validate_details(&details));
        ValidationErrors::check(errors, details)
    }
}

/// Partial edit of a proposal; a blank string clears an optional text field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalUpdateInput {
    pub client_name: Option<String>,
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

    pub project_value: Option<MoneyInput>,
    pub payment_conditions: Option<String>,
    pub deadline: Option<String>,

    pub mode: Option<ProposalMode>,
    pub closing_enabled: Option<bool>,
    pub deposit_required: Option<bool>,
    pub deposit_type: Option<DepositType>,
    pub deposit_value: Option<MoneyInput>,
    pub payment: Option<PaymentDetails>,

    pub upsell_options: Option<Vec<UpsellOption>>,
}

impl ProposalUpdateInput {
    /// Apply on top of the current details and validate the result as a whole
    pub fn apply(self, current: &ProposalDetails) -> Result<ProposalDetails, ValidationErrors> {
        let mut errors = Vec::new();
        let mut next = current.clone();

        if let Some(client_name) = self.client_name {
            match normalize_text(Some(client_name)) {
                Some(name) => next.client_name = name,
                None => errors.push(ValidationError::new(
                    "client_name",
                    "Client name cannot be empty",
                )),
            }
        }

        let texts = [
            (self.public_title, &mut next.public_title),
            (self.title, &mut next.title),
            (self.objective, &mut next.objective),
            (self.urgency_reason, &mut next.urgency_reason),
            (self.cost_of_inaction, &mut next.cost_of_inaction),
            (self.previous_attempts, &mut next.previous_attempts),
            (self.scope, &mut next.scope),
            (self.out_of_scope, &mut next.out_of_scope),
            (self.revision_policy, &mut next.revision_policy),
            (self.decision_maker, &mut next.decision_maker),
            (self.communication, &mut next.communication),
            (self.dependencies, &mut next.dependencies),
            (self.payment_conditions, &mut next.payment_conditions),
            (self.deadline, &mut next.deadline),
        ];
        for (input, slot) in texts {
            if input.is_some() {
                *slot = normalize_text(input);
            }
        }

        if let Some(input) = &self.project_value {
            next.project_value = resolve_money("project_value", input, &mut errors);
        }
        if let Some(input) = &self.deposit_value {
            next.deposit_value = Some(resolve_money("deposit_value", input, &mut errors));
        }
        if let Some(mode) = self.mode {
            next.mode = mode;
        }
        if let Some(closing_enabled) = self.closing_enabled {
            next.closing_enabled = closing_enabled;
        }
        if let Some(deposit_required) = self.deposit_required {
            next.deposit_required = deposit_required;
        }
        if let Some(deposit_type) = self.deposit_type {
            next.deposit_type = Some(deposit_type);
        }
        if let Some(payment) = self.payment {
            next.payment = normalize_payment(payment);
        }
        if let Some(upsell_options) = self.upsell_options {
            next.upsell_options = normalize_upsells(upsell_options);
        }

        errors.extend(validate_details(&next));
        ValidationErrors::check(errors, next)
    }
}

/// Digital acceptance submitted on the public link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceInput {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub acceptance_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AcceptanceInput {
    pub fn signer(&self) -> Result<Signer, ValidationErrors> {
        normalize_signer(&self.name, &self.email, self.role.as_deref())
    }
}

/// Amendment drafted by the proposal owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestCreateInput {
    pub title: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub added_scope: serde_json::Value,
    #[serde(default)]
    pub added_pricing: Option<serde_json::Value>,
    pub added_total: MoneyInput,
}

/// Validated amendment ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeRequest {
    pub title: String,
    pub reason: Option<String>,
    pub added_scope: serde_json::Value,
    pub added_pricing: serde_json::Value,
    pub added_total: Decimal,
}

impl ChangeRequestCreateInput {
    pub fn normalize(self) -> Result<NewChangeRequest, ValidationErrors> {
        let mut errors = Vec::new();

        let title = normalize_text(Some(self.title)).unwrap_or_default();
        if title.is_empty() {
            errors.push(ValidationError::new("title", "Change request title is required"));
        }

        if self.added_scope.is_null() {
            errors.push(ValidationError::new(
                "added_scope",
                "Added scope must describe the amendment",
            ));
        }

        let added_total = resolve_money("added_total", &self.added_total, &mut errors);

        ValidationErrors::check(
            errors,
            NewChangeRequest {
                title,
                reason: normalize_text(self.reason),
                added_scope: self.added_scope,
                added_pricing: self.added_pricing.unwrap_or(serde_json::Value::Null),
                added_total,
            },
        )
    }
}

fn resolve_money(field: &str, input: &MoneyInput, errors: &mut Vec<ValidationError>) -> Decimal {
    match input.resolve() {
        Some(value) if value.is_sign_negative() => {
            errors.push(ValidationError::new(field, "Amount cannot be negative"));
            value
        }
        Some(value) => value,
        None => {
            errors.push(ValidationError::new(field, "Amount could not be parsed"));
            Decimal::ZERO
        }
    }
}

fn normalize_payment(payment: PaymentDetails) -> PaymentDetails {
    PaymentDetails {
        pix_key: normalize_text(payment.pix_key),
        pix_receiver_name: normalize_text(payment.pix_receiver_name),
        pix_receiver_document: normalize_text(payment.pix_receiver_document),
    }
}

fn normalize_upsells(options: Vec<UpsellOption>) -> Vec<UpsellOption> {
    options
        .into_iter()
        .map(|option| UpsellOption {
            title: option.title.trim().to_string(),
            value: option.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_input() -> ProposalCreateInput {
        ProposalCreateInput {
            client_name: Some("  Acme Ltda ".to_string()),
            project_value: Some(MoneyInput::Text("R$ 1.000,00".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_project_value() {
        let input = ProposalCreateInput::default();
        let errors = input.normalize().unwrap_err();
        assert!(errors.has_field("project_value"));
    }

    #[test]
    fn test_create_normalizes_text_and_money() {
        let mut input = base_input();
        input.scope = Some("   ".to_string());

        let details = input.normalize().unwrap();
        assert_eq!(details.client_name, "Acme Ltda");
        assert_eq!(details.project_value, dec!(1000));
        assert_eq!(details.scope, None);
        assert_eq!(details.mode, ProposalMode::Proposal);
    }

    #[test]
    fn test_create_rejects_negative_text_amount() {
        let mut input = base_input();
        input.project_value = Some(MoneyInput::Text("-R$ 500,00".to_string()));
        let errors = input.normalize().unwrap_err();
        assert!(errors.has_field("project_value"));
    }

    #[test]
    fn test_create_defaults_client_name() {
        let mut input = base_input();
        input.client_name = None;
        assert_eq!(input.normalize().unwrap().client_name, DEFAULT_CLIENT_NAME);
    }

    #[test]
    fn test_deposit_terms_validated() {
        let mut input = base_input();
        input.deposit_required = true;
        input.deposit_type = Some(DepositType::Percent);
        input.deposit_value = Some(MoneyInput::Amount(dec!(150)));

        let errors = input.normalize().unwrap_err();
        assert!(errors.has_field("deposit_value"));

        let mut missing_type = base_input();
        missing_type.deposit_required = true;
        missing_type.deposit_value = Some(MoneyInput::Amount(dec!(30)));
        assert!(missing_type.normalize().unwrap_err().has_field("deposit_type"));
    }

    #[test]
    fn test_update_clears_blank_fields_and_keeps_others() {
        let mut input = base_input();
        input.objective = Some("Aumentar vendas".to_string());
        input.deadline = Some("30 dias".to_string());
        let current = input.normalize().unwrap();

        let update = ProposalUpdateInput {
            objective: Some(String::new()),
            project_value: Some(MoneyInput::Amount(dec!(2500))),
            ..Default::default()
        };
        let next = update.apply(&current).unwrap();

        assert_eq!(next.objective, None);
        assert_eq!(next.deadline.as_deref(), Some("30 dias"));
        assert_eq!(next.project_value, dec!(2500));
        assert!(current.affects_content(&next));
    }

    #[test]
    fn test_update_rejects_blank_client_name() {
        let current = base_input().normalize().unwrap();
        let update = ProposalUpdateInput {
            client_name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&current).unwrap_err().has_field("client_name"));
    }

    #[test]
    fn test_change_request_requires_title_and_amount() {
        let input = ChangeRequestCreateInput {
            title: " ".to_string(),
            reason: None,
            added_scope: serde_json::json!(["Landing page extra"]),
            added_pricing: None,
            added_total: MoneyInput::Text("n/a".to_string()),
        };
        let errors = input.normalize().unwrap_err();
        assert!(errors.has_field("title"));
        assert!(errors.has_field("added_total"));
    }

    #[test]
    fn test_acceptance_signer_validation() {
        let input = AcceptanceInput {
            name: "Maria".to_string(),
            email: " Maria@Cliente.com ".to_string(),
            ..Default::default()
        };
        assert_eq!(input.signer().unwrap().email, "maria@cliente.com");

        let invalid = AcceptanceInput {
            name: String::new(),
            email: "nope".to_string(),
            ..Default::default()
        };
        let errors = invalid.signer().unwrap_err();
        assert!(errors.has_field("name"));
        assert!(errors.has_field("email"));
    }
}
