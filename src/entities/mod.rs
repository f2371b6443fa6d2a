use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::decoder::Envelope;
use crate::error::{Error, Result, ValidationError};

pub mod contact;
pub mod credit_note;
pub mod invoice;
pub mod line_item;

/// An accounting entity addressable through a collection endpoint.
pub trait Resource: Serialize + DeserializeOwned + Debug + Send + Sync {
    /// Singular name used in errors and logs, e.g. `Invoice`.
    const NAME: &'static str;
    /// Collection path segment and wrapper key, e.g. `Invoices`.
    const COLLECTION: &'static str;
    /// Identifier field name, e.g. `InvoiceID`.
    const ID_FIELD: &'static str;

    /// The server-assigned identifier, `None` before creation.
    fn id(&self) -> Option<Uuid>;
}

/// A resource with a PDF rendition.
pub trait Document: Resource {}

/// What happened to one submitted element of a create or update.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Stored by the server; the entity carries its identifier.
    Saved(T),
    /// Refused by the server, with at least one message.
    Rejected {
        entity: T,
        errors: Vec<ValidationError>,
    },
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The entity as echoed by the server.
    #[must_use]
    pub fn entity(&self) -> &T {
        match self {
            Self::Saved(entity) | Self::Rejected { entity, .. } => entity,
        }
    }

    #[must_use]
    pub fn into_entity(self) -> T {
        match self {
            Self::Saved(entity) | Self::Rejected { entity, .. } => entity,
        }
    }

    /// Validation messages; empty for saved entities.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Saved(_) => &[],
            Self::Rejected { errors, .. } => errors,
        }
    }

    #[must_use]
    pub fn saved(self) -> Option<T> {
        match self {
            Self::Saved(entity) => Some(entity),
            Self::Rejected { .. } => None,
        }
    }
}

impl<T: Resource> Outcome<T> {
    /// Splits one returned element into the entity and its validation state.
    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let (entity, has_errors, mut errors) = split_element::<T>(value)?;

        if errors.is_empty() && has_errors {
            errors.push(ValidationError::new(format!(
                "{} was flagged as invalid without any validation messages",
                T::NAME
            )));
        }
        if errors.is_empty() && entity.id().is_none() {
            errors.push(ValidationError::new(format!(
                "{} was returned without an identifier",
                T::NAME
            )));
        }

        if errors.is_empty() {
            Ok(Self::Saved(entity))
        } else {
            debug!(entity = T::NAME, ?errors, "element rejected");
            Ok(Self::Rejected { entity, errors })
        }
    }

    /// An element of a request the server refused as a whole. Nothing was stored,
    /// so even elements without messages of their own are rejected.
    pub(crate) fn rejected_from_value(value: Value) -> Result<Self> {
        let (entity, _, mut errors) = split_element::<T>(value)?;
        if errors.is_empty() {
            errors.push(ValidationError::new(format!(
                "{} was not saved because another element in the request failed validation",
                T::NAME
            )));
        }
        Ok(Self::Rejected { entity, errors })
    }
}

fn split_element<T: Resource>(mut value: Value) -> Result<(T, bool, Vec<ValidationError>)> {
    let mut has_errors = false;
    let mut errors = Vec::new();
    if let Some(object) = value.as_object_mut() {
        has_errors = object
            .remove("HasErrors")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if let Some(reported) = object.remove("ValidationErrors") {
            if !reported.is_null() {
                errors = serde_json::from_value(reported)?;
            }
        }
    }
    Ok((serde_json::from_value(value)?, has_errors, errors))
}

/// The result of a create or update: one outcome per submitted element, in order.
#[derive(Debug, Clone)]
pub struct MutationResponse<T> {
    /// Response identifier of the first request issued.
    pub id: Uuid,
    pub status: Option<String>,
    pub provider_name: Option<String>,
    pub date_time_utc: Option<OffsetDateTime>,
    pub outcomes: Vec<Outcome<T>>,
}

impl<T> MutationResponse<T> {
    /// A response for an empty submission, where no request was made.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: Uuid::nil(),
            status: None,
            provider_name: None,
            date_time_utc: None,
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Whether any element was rejected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_rejected)
    }

    pub fn saved(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Saved(entity) => Some(entity),
            Outcome::Rejected { .. } => None,
        })
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&T, &[ValidationError])> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Saved(_) => None,
            Outcome::Rejected { entity, errors } => Some((entity, errors.as_slice())),
        })
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<Outcome<T>> {
        self.outcomes
    }

    /// Appends a later chunk's outcomes, keeping this response's metadata.
    pub(crate) fn extend(&mut self, other: Self) {
        if self.outcomes.is_empty() && self.id.is_nil() {
            self.id = other.id;
            self.status = other.status;
            self.provider_name = other.provider_name;
            self.date_time_utc = other.date_time_utc;
        }
        self.outcomes.extend(other.outcomes);
    }
}

impl<T: Resource> MutationResponse<T> {
    /// Builds the response for `submitted` elements from a decoded envelope.
    pub(crate) fn from_envelope(mut envelope: Envelope, submitted: usize) -> Result<Self> {
        let elements = envelope.take_elements(T::COLLECTION)?;
        if elements.len() != submitted {
            error!(
                "{} response carried {} element(s) for {} submitted",
                T::COLLECTION,
                elements.len(),
                submitted
            );
            return Err(Error::MismatchedOutcomes {
                entity: T::NAME,
                submitted,
                returned: elements.len(),
            });
        }

        let outcomes = elements
            .into_iter()
            .map(Outcome::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: envelope.id,
            status: envelope.status,
            provider_name: envelope.provider_name,
            date_time_utc: envelope.date_time_utc,
            outcomes,
        })
    }

    /// Builds the response from the `Elements` of a `ValidationException`, which the
    /// server sends instead of an envelope when errors are summarized.
    pub(crate) fn from_rejected_elements(elements: Vec<Value>) -> Result<Self> {
        let outcomes = elements
            .into_iter()
            .map(Outcome::rejected_from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            status: Some("ValidationException".to_string()),
            outcomes,
            ..Self::empty()
        })
    }
}

/// Entities returned by a read, possibly spanning several pages.
#[derive(Debug, Clone)]
pub struct ListResponse<T> {
    /// Response identifier of the first page.
    pub id: Uuid,
    pub entities: Vec<T>,
    /// Number of pages fetched.
    pub pages: u32,
    /// Where to resume when the page limit stopped the fetch early.
    pub next_page: Option<u32>,
}

impl<T> ListResponse<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether more pages were available than were fetched.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.next_page.is_some()
    }
}

impl<T> IntoIterator for ListResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::invoice::{Invoice, Type};
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn element_with_id_is_saved() {
        let id = Uuid::new_v4();
        let outcome = Outcome::<Invoice>::from_value(json!({
            "InvoiceID": id,
            "Type": "ACCREC",
            "HasErrors": false
        }))
        .unwrap();

        assert!(outcome.is_saved());
        assert_eq!(outcome.entity().invoice_id, Some(id));
        assert!(outcome.errors().is_empty());
    }

    #[test]
    fn refused_request_rejects_elements_without_messages() {
        let id = Uuid::new_v4();
        let response = MutationResponse::<Invoice>::from_rejected_elements(vec![
            json!({ "InvoiceID": id, "Type": "ACCREC" }),
            json!({
                "Type": "ACCREC",
                "ValidationErrors": [{ "Message": "Account code '999' is not a valid code" }]
            }),
        ])
        .unwrap();

        assert!(response.id.is_nil());
        assert_eq!(response.len(), 2);
        assert!(response.outcomes.iter().all(Outcome::is_rejected));
        assert_eq!(response.outcomes[0].entity().invoice_id, Some(id));
        assert!(response.outcomes[0].errors()[0].message.contains("another element"));
        assert_eq!(
            response.outcomes[1].errors()[0].message,
            "Account code '999' is not a valid code"
        );
    }

    #[test]
    fn validation_errors_reject_and_nil_id_is_dropped() {
        let outcome = Outcome::<Invoice>::from_value(json!({
            "InvoiceID": Uuid::nil(),
            "Type": "ACCREC",
            "HasErrors": true,
            "ValidationErrors": [{ "Message": "Invoice not of valid status for creation" }]
        }))
        .unwrap();

        match outcome {
            Outcome::Rejected { entity, errors } => {
                assert_eq!(entity.invoice_id, None);
                assert_eq!(errors[0].message, "Invoice not of valid status for creation");
                assert!(!entity.fields.contains_key("ValidationErrors"));
            }
            Outcome::Saved(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn never_neither_id_nor_errors() {
        let flagged = Outcome::<Invoice>::from_value(json!({ "HasErrors": true })).unwrap();
        assert_eq!(flagged.errors().len(), 1);

        let anonymous = Outcome::<Invoice>::from_value(json!({ "Type": "ACCPAY" })).unwrap();
        assert!(anonymous.is_rejected());
        assert_eq!(anonymous.entity().r#type, Some(Type::AccountsPayable));
    }

    #[test]
    fn mutation_response_keeps_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let response = MutationResponse::<Invoice>::from_envelope(
            envelope(json!({
                "Id": Uuid::new_v4(),
                "Status": "OK",
                "Invoices": [
                    { "InvoiceID": first },
                    { "InvoiceID": Uuid::nil(), "HasErrors": true,
                      "ValidationErrors": [{ "Message": "bad" }] },
                    { "InvoiceID": second }
                ]
            })),
            3,
        )
        .unwrap();

        assert_eq!(response.len(), 3);
        assert!(response.has_errors());
        let saved: Vec<_> = response.saved().map(|i| i.invoice_id).collect();
        assert_eq!(saved, vec![Some(first), Some(second)]);
        assert_eq!(response.rejected().count(), 1);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let err = MutationResponse::<Invoice>::from_envelope(
            envelope(json!({ "Id": Uuid::new_v4(), "Invoices": [] })),
            2,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MismatchedOutcomes { submitted: 2, returned: 0, .. }
        ));
    }

    #[test]
    fn extending_an_empty_response_adopts_metadata() {
        let id = Uuid::new_v4();
        let mut merged = MutationResponse::<Invoice>::empty();
        let chunk = MutationResponse::<Invoice>::from_envelope(
            envelope(json!({ "Id": id, "Invoices": [{ "InvoiceID": Uuid::new_v4() }] })),
            1,
        )
        .unwrap();
        let later = MutationResponse::<Invoice>::from_envelope(
            envelope(json!({ "Id": Uuid::new_v4(), "Invoices": [{ "InvoiceID": Uuid::new_v4() }] })),
            1,
        )
        .unwrap();

        merged.extend(chunk);
        merged.extend(later);
        assert_eq!(merged.id, id);
        assert_eq!(merged.len(), 2);
    }
}
