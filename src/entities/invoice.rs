use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use super::contact::Contact;
use super::line_item::{LineAmountType, LineItem};
use super::{Document, Resource};
use crate::utils::date_format::xero_datetime_format_option;
use crate::utils::serde_helpers::nil_uuid_as_none;

/// Sales invoice or purchase bill.
///
/// Values the client does not know are kept verbatim in `Other`, so the server
/// rather than the client decides whether they are valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    #[serde(rename = "ACCPAY")]
    AccountsPayable,
    #[serde(rename = "ACCREC")]
    AccountsReceivable,
    #[serde(untagged)]
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Draft,
    Submitted,
    Deleted,
    Authorised,
    Paid,
    Voided,
    #[serde(untagged)]
    Other(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Deleted => "DELETED",
            Self::Authorised => "AUTHORISED",
            Self::Paid => "PAID",
            Self::Voided => "VOIDED",
            Self::Other(status) => status,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(
        rename = "InvoiceID",
        default,
        deserialize_with = "nil_uuid_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub invoice_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<Type>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_amount_types: Option<LineAmountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
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
    pub amount_due: Option<Decimal>,
    #[serde(
        rename = "UpdatedDateUTC",
        default,
        with = "xero_datetime_format_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_date_utc: Option<OffsetDateTime>,
    /// Every other field, passed through untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Invoice {
    /// A draft sales invoice for `contact`.
    #[must_use]
    pub fn receivable(contact: Contact, line_items: Vec<LineItem>) -> Self {
        Self {
            r#type: Some(Type::AccountsReceivable),
            contact: Some(contact),
            line_items,
            ..Self::default()
        }
    }

    /// A draft purchase bill from `contact`.
    #[must_use]
    pub fn payable(contact: Contact, line_items: Vec<LineItem>) -> Self {
        Self {
            r#type: Some(Type::AccountsPayable),
            contact: Some(contact),
            line_items,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets a field the struct does not model, e.g. `DueDate`.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl Resource for Invoice {
    const NAME: &'static str = "Invoice";
    const COLLECTION: &'static str = "Invoices";
    const ID_FIELD: &'static str = "InvoiceID";

    fn id(&self) -> Option<Uuid> {
        self.invoice_id
    }
}

impl Document for Invoice {}

/// The body of `Invoices/{id}/OnlineInvoice`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OnlineInvoices {
    #[serde(default)]
    pub online_invoices: Vec<OnlineInvoice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OnlineInvoice {
    pub online_invoice_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn new_invoice_serializes_without_identifier() {
        let invoice = Invoice::receivable(
            Contact::by_id(Uuid::nil()),
            vec![LineItem::new("Widget", dec!(1), dec!(20)).with_account_code("200")],
        )
        .with_field("DueDate", "2024-05-01");
        let json = serde_json::to_value(&invoice).unwrap();

        assert_eq!(json["Type"], "ACCREC");
        assert!(json.get("InvoiceID").is_none());
        assert_eq!(json["LineItems"][0]["AccountCode"], "200");
        assert_eq!(json["DueDate"], "2024-05-01");
    }

    #[test]
    fn unrecognised_type_is_sent_verbatim() {
        let invoice = Invoice {
            r#type: Some(Type::Other("Busted".into())),
            ..Invoice::default()
        };
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["Type"], "Busted");

        let back: Invoice = serde_json::from_value(json).unwrap();
        assert_eq!(back.r#type, Some(Type::Other("Busted".into())));
    }

    #[test]
    fn server_shape_deserializes() {
        let id = Uuid::new_v4();
        let invoice: Invoice = serde_json::from_value(json!({
            "InvoiceID": id,
            "Type": "ACCREC",
            "Status": "DRAFT",
            "InvoiceNumber": "INV-0042",
            "Total": 40.0,
            "AmountDue": 40.0,
            "UpdatedDateUTC": "/Date(1529443543581+0000)/",
            "BrandingThemeID": Uuid::nil()
        }))
        .unwrap();

        assert_eq!(invoice.id(), Some(id));
        assert_eq!(invoice.status, Some(Status::Draft));
        assert_eq!(invoice.total, Some(dec!(40)));
        assert!(invoice.updated_date_utc.is_some());
        assert!(invoice.fields.contains_key("BrandingThemeID"));
    }
}
