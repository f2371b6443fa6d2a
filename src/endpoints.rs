use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const BASE_URL: &str = "https://api.xero.com/api.xro/2.0/";

/// A typed representation of Accounting API paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XeroEndpoint {
    /// A whole collection, e.g. `Invoices`.
    Collection(&'static str),
    /// One element of a collection, e.g. `Invoices/{id}`.
    Entity(&'static str, Uuid),
    /// A sub-resource of one element, e.g. `Invoices/{id}/OnlineInvoice`.
    Action(&'static str, Uuid, &'static str),
}

impl XeroEndpoint {
    /// The path relative to the API root.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Collection(collection) => (*collection).to_string(),
            Self::Entity(collection, id) => format!("{collection}/{id}"),
            Self::Action(collection, id, action) => format!("{collection}/{id}/{action}"),
        }
    }

    /// Resolves the endpoint against an API root ending in `/`.
    pub fn to_url(&self, base: &Url) -> Result<Url> {
        base.join(&self.path()).map_err(|_| Error::InvalidEndpoint)
    }
}

impl fmt::Display for XeroEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
