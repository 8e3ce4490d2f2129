// ABOUTME: Currency parsing and pt-BR formatting for proposal values
// ABOUTME: All monetary display goes through format_currency so generated text never shows raw numbers

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Monetary value as submitted by a form: either a number or free text like "R$ 1.500,00"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoneyInput {
    Amount(Decimal),
    Text(String),
}

impl MoneyInput {
    pub fn resolve(&self) -> Option<Decimal> {
        match self {
            MoneyInput::Amount(value) => Some(*value),
            MoneyInput::Text(text) => parse_currency(text),
        }
    }
}

impl From<Decimal> for MoneyInput {
    fn from(value: Decimal) -> Self {
        MoneyInput::Amount(value)
    }
}

/// Parse a loosely formatted currency string
///
/// A comma is read as the decimal separator (pt-BR). Without a comma, a single
/// dot followed by at most two digits is a decimal point; any other dots are
/// thousands separators. Currency symbols are dropped; a `-` before the first
/// digit makes the amount negative.
pub fn parse_currency(text: &str) -> Option<Decimal> {
    let negative = text
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| c == '-');
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if let Some(pos) = cleaned.rfind(',') {
        let integer = cleaned[..pos].replace(['.', ','], "");
        let fraction = &cleaned[pos + 1..];
        join_parts(&integer, fraction)
    } else if cleaned.matches('.').count() == 1 {
        let (integer, fraction) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
        if fraction.len() <= 2 {
            join_parts(integer, fraction)
        } else {
            cleaned.replace('.', "")
        }
    } else {
        cleaned.replace('.', "")
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative && !value.is_zero() {
        -value
    } else {
        value
    })
}

fn join_parts(integer: &str, fraction: &str) -> String {
    let integer = if integer.is_empty() { "0" } else { integer };
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Format with pt-BR grouping and exactly two decimals: `1234.5` → `1.234,50`
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits = integer.len();
    let mut grouped = String::with_capacity(digits + digits / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Currency string used in every generated section: `R$ 1.234,50`
pub fn format_currency(value: Decimal) -> String {
    format!("R$ {}", format_brl(value))
}

/// `percent`% of `base`, rounded to cents
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    (base * percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
