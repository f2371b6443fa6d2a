use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::contact::Contact;
use super::line_item::LineItem;
use super::{Document, Resource};
use crate::utils::serde_helpers::nil_uuid_as_none;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    #[serde(rename = "ACCPAYCREDIT")]
    AccountsPayableCredit,
    #[serde(rename = "ACCRECCREDIT")]
    AccountsReceivableCredit,
    #[serde(untagged)]
    Other(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreditNote {
    #[serde(
        rename = "CreditNoteID",
        default,
        deserialize_with = "nil_uuid_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub credit_note_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<Type>,
    /// Shares the invoice status values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<super::invoice::Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_note_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub remaining_credit: Option<Decimal>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CreditNote {
    #[must_use]
    pub fn new(r#type: Type, contact: Contact, line_items: Vec<LineItem>) -> Self {
        Self {
            r#type: Some(r#type),
            contact: Some(contact),
            line_items,
            ..Self::default()
        }
    }
}

impl Resource for CreditNote {
    const NAME: &'static str = "CreditNote";
    const COLLECTION: &'static str = "CreditNotes";
    const ID_FIELD: &'static str = "CreditNoteID";

    fn id(&self) -> Option<Uuid> {
        self.credit_note_id
    }
}

impl Document for CreditNote {}
