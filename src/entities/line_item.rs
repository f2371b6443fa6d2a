use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::utils::serde_helpers::nil_uuid_as_none;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LineAmountType {
    #[serde(alias = "EXCLUSIVE")]
    Exclusive,
    #[serde(alias = "INCLUSIVE")]
    Inclusive,
    #[serde(alias = "NOTAX")]
    NoTax,
}

/// One line of an invoice or credit note.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    #[serde(
        rename = "LineItemID",
        default,
        deserialize_with = "nil_uuid_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_item_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_type: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_amount: Option<Decimal>,
    /// Tracking, discounts and anything else the line carries.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LineItem {
    #[must_use]
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_amount: Decimal) -> Self {
        Self {
            description: Some(description.into()),
            quantity: Some(quantity),
            unit_amount: Some(unit_amount),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_account_code(mut self, account_code: impl Into<String>) -> Self {
        self.account_code = Some(account_code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn amounts_are_sent_as_numbers() {
        let line = LineItem::new("Consulting", dec!(2), dec!(50.5)).with_account_code("200");
        let json = serde_json::to_value(&line).unwrap();

        assert_eq!(
            json,
            json!({
                "Description": "Consulting",
                "Quantity": 2.0,
                "UnitAmount": 50.5,
                "AccountCode": "200"
            })
        );
    }

    #[test]
    fn unknown_fields_survive() {
        let line: LineItem = serde_json::from_value(json!({
            "LineItemID": Uuid::new_v4(),
            "LineAmount": 99.5,
            "DiscountRate": 10
        }))
        .unwrap();
        assert_eq!(line.line_amount, Some(dec!(99.5)));
        assert_eq!(line.fields.get("DiscountRate"), Some(&json!(10)));
    }
}
