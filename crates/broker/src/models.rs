//! Wire models for brokerage provider responses.
//!
//! Providers disagree on everything: field names, number encodings, nesting.
//! These structs keep the known fields typed and capture the rest through
//! `#[serde(flatten)]` so reconciliation can store a lossless metadata
//! snapshot.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Upper bound on nested `converted` money objects walked by
/// [`usd_amount`]; guarantees termination on cyclic-looking payloads.
const MAX_CONVERSION_DEPTH: usize = 4;

/// An account as reported by a brokerage API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerAccount {
    /// Provider-assigned identifier; accounts without one are skipped.
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub currency: Option<String>,
    /// Everything else the provider sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl BrokerAccount {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "Unnamed account".to_string())
    }

    /// Full provider payload as a metadata snapshot.
    pub fn meta_snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A position as reported by a brokerage API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: Option<String>,
    /// Number or numeric string depending on the provider.
    pub quantity: Option<Value>,
    /// Number, numeric string, or a nested [`Money`] object.
    pub cost_basis: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl BrokerPosition {
    pub fn meta_snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Quantity as a finite decimal, if the provider sent something usable.
    pub fn parsed_quantity(&self) -> Option<Decimal> {
        self.quantity.as_ref().and_then(parse_decimal_value)
    }

    /// Cost basis as a decimal: plain numbers and numeric strings are taken
    /// as-is, money objects go through USD extraction.
    pub fn parsed_cost_basis(&self) -> Option<Decimal> {
        let value = self.cost_basis.as_ref()?;
        if let Some(amount) = parse_decimal_value(value) {
            return Some(amount);
        }
        serde_json::from_value::<Money>(value.clone())
            .ok()
            .and_then(|money| usd_amount(&money))
    }
}

/// A money amount, possibly wrapping a conversion into another currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub converted: Option<Box<Money>>,
}

/// Walk a money object's `converted` chain and return the first USD amount.
pub fn usd_amount(money: &Money) -> Option<Decimal> {
    let mut current = money;
    for _ in 0..MAX_CONVERSION_DEPTH {
        if current.currency.eq_ignore_ascii_case("USD") {
            return Some(current.amount);
        }
        match &current.converted {
            Some(next) => current = next,
            None => return None,
        }
    }
    None
}

/// Parse a JSON number or numeric string into a finite decimal.
///
/// JSON numbers go through f64, which `Decimal::from_f64` rejects when
/// non-finite; strings like "NaN" simply fail to parse. Either way the
/// caller skips the row.
pub fn parse_decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Decimal::from_str(trimmed).ok()
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn quantity_parses_numbers_and_strings() {
        let from_number = BrokerPosition {
            symbol: Some("AAPL".into()),
            quantity: Some(json!(2.5)),
            cost_basis: None,
            extra: Default::default(),
        };
        assert_eq!(from_number.parsed_quantity(), Some(dec!(2.5)));

        let from_string = BrokerPosition {
            symbol: Some("AAPL".into()),
            quantity: Some(json!(" 2 ")),
            cost_basis: None,
            extra: Default::default(),
        };
        assert_eq!(from_string.parsed_quantity(), Some(dec!(2)));
    }

    #[test]
    fn unusable_quantities_are_none() {
        for quantity in [json!("NaN"), json!("not a number"), json!(""), json!(true)] {
            let position = BrokerPosition {
                symbol: Some("AAPL".into()),
                quantity: Some(quantity),
                cost_basis: None,
                extra: Default::default(),
            };
            assert_eq!(position.parsed_quantity(), None);
        }
    }

    #[test]
    fn cost_basis_accepts_money_objects() {
        let position = BrokerPosition {
            symbol: Some("SHOP".into()),
            quantity: Some(json!(1)),
            cost_basis: Some(json!({
                "amount": 130.0,
                "currency": "CAD",
                "converted": { "amount": 95.5, "currency": "USD" }
            })),
            extra: Default::default(),
        };
        assert_eq!(position.parsed_cost_basis(), Some(dec!(95.5)));
    }

    #[test]
    fn usd_extraction_is_depth_bounded() {
        // Five levels of non-USD nesting: deeper than the walk goes.
        let mut money = Money {
            amount: dec!(1),
            currency: "EUR".into(),
            converted: None,
        };
        for _ in 0..5 {
            money = Money {
                amount: dec!(1),
                currency: "EUR".into(),
                converted: Some(Box::new(money)),
            };
        }
        assert_eq!(usd_amount(&money), None);

        let direct = Money {
            amount: dec!(42),
            currency: "usd".into(),
            converted: None,
        };
        assert_eq!(usd_amount(&direct), Some(dec!(42)));
    }

    #[test]
    fn broker_account_keeps_unknown_fields() {
        let json = r#"{
            "id": "A1",
            "name": "Main",
            "type": "MARGIN",
            "currency": "USD",
            "institution_name": "Example Broker",
            "cash_restrictions": []
        }"#;
        let account: BrokerAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.id.as_deref(), Some("A1"));
        assert!(account.extra.contains_key("institution_name"));

        let snapshot = account.meta_snapshot();
        assert_eq!(snapshot["institution_name"], "Example Broker");
    }
}
