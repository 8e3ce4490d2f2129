// ABOUTME: Validation errors and field normalization helpers
// ABOUTME: Checks closing-kit deposit terms, upsell options and signer identity

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::types::{DepositType, ProposalDetails, Signer};

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All field errors found in one input; never empty
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when no errors were collected
    pub fn check<T>(errors: Vec<ValidationError>, value: T) -> Result<T, ValidationErrors> {
        if errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

/// Trim free text; blank collapses to `None`
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Cross-field checks on a fully assembled set of proposal details
pub fn validate_details(details: &ProposalDetails) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if details.client_name.trim().is_empty() {
        errors.push(ValidationError::new("client_name", "Client name cannot be empty"));
    }

    if details.project_value.is_sign_negative() {
        errors.push(ValidationError::new(
            "project_value",
            "Project value cannot be negative",
        ));
    }

    if details.deposit_required {
        match (details.deposit_type, details.deposit_value) {
            (None, _) => errors.push(ValidationError::new(
                "deposit_type",
                "Deposit type is required when a deposit is required",
            )),
            (_, None) => errors.push(ValidationError::new(
                "deposit_value",
                "Deposit value is required when a deposit is required",
            )),
            (Some(_), Some(value)) if value <= Decimal::ZERO => errors.push(
                ValidationError::new("deposit_value", "Deposit value must be positive"),
            ),
            (Some(DepositType::Percent), Some(value)) if value > Decimal::ONE_HUNDRED => {
                errors.push(ValidationError::new(
                    "deposit_value",
                    "Deposit percentage cannot exceed 100",
                ))
            }
            (Some(DepositType::Fixed), Some(value)) if value > details.project_value => {
                errors.push(ValidationError::new(
                    "deposit_value",
                    "Fixed deposit cannot exceed the project value",
                ))
            }
            _ => {}
        }
    }

    for (index, option) in details.upsell_options.iter().enumerate() {
        if option.title.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("upsell_options[{}].title", index),
                "Upsell title cannot be empty",
            ));
        }
        if option.value.is_sign_negative() {
            errors.push(ValidationError::new(
                format!("upsell_options[{}].value", index),
                "Upsell value cannot be negative",
            ));
        }
    }

    errors
}

/// Validate and normalize whoever signs a public link
pub fn normalize_signer(
    name: &str,
    email: &str,
    role: Option<&str>,
) -> Result<Signer, ValidationErrors> {
    let mut errors = Vec::new();
    let name = name.trim();
    let email = email.trim().to_lowercase();

    if name.is_empty() {
        errors.push(ValidationError::new("name", "Signer name is required"));
    }

    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !well_formed {
        errors.push(ValidationError::new("email", "A valid signer email is required"));
    }

    ValidationErrors::check(
        errors,
        Signer {
            name: name.to_string(),
            email,
            role: normalize_text(role.map(str::to_string)),
        },
    )
}
