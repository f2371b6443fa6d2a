use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::Resource;
use crate::utils::serde_helpers::nil_uuid_as_none;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Archived,
    GdprRequest,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    #[serde(
        rename = "ContactID",
        default,
        deserialize_with = "nil_uuid_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<Status>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Contact {
    /// A reference to an existing contact, as embedded in invoices.
    #[must_use]
    pub fn by_id(contact_id: Uuid) -> Self {
        Self {
            contact_id: Some(contact_id),
            ..Self::default()
        }
    }

    /// A new contact to create.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_email(mut self, email_address: impl Into<String>) -> Self {
        self.email_address = Some(email_address.into());
        self
    }
}

impl Resource for Contact {
    const NAME: &'static str = "Contact";
    const COLLECTION: &'static str = "Contacts";
    const ID_FIELD: &'static str = "ContactID";

    fn id(&self) -> Option<Uuid> {
        self.contact_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_serializes_only_the_id() {
        let id = Uuid::new_v4();
        assert_eq!(
            serde_json::to_value(Contact::by_id(id)).unwrap(),
            json!({ "ContactID": id })
        );
    }

    #[test]
    fn gdpr_status_is_upper_case() {
        let contact: Contact =
            serde_json::from_value(json!({ "ContactStatus": "GDPRREQUEST" })).unwrap();
        assert_eq!(contact.contact_status, Some(Status::GdprRequest));
    }
}
