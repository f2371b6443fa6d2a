//! # xero-accounting
//!
//! A typed async client for the Xero Accounting API.
//!
//! Each collection is reached through an [`Endpoint`] borrowed from a
//! [`Client`]:
//!
//! ```no_run
//! use xero_accounting::{Client, Config, Credentials, Filter};
//!
//! # async fn run(tenant_id: uuid::Uuid) -> xero_accounting::Result<()> {
//! let client = Client::new(Credentials::bearer("token"), Config::new(tenant_id))?;
//!
//! let drafts = client
//!     .invoices()
//!     .get(&Filter::new().where_clause("Status==\"DRAFT\""))
//!     .await?;
//! for invoice in drafts {
//!     println!("{:?}", invoice.invoice_number);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Validation errors
//!
//! Creates and updates report a per-element [`Outcome`]. An element the API
//! refuses is an [`Outcome::Rejected`] carrying its validation messages; the
//! call itself still succeeds.
//!
//! ## Logging
//!
//! The crate logs through `tracing` and installs no subscriber.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

mod batch;
pub mod client;
pub mod config;
pub mod decoder;
pub mod endpoint;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod oauth;
pub mod pagination;
pub mod scope;
pub mod transport;
pub mod utils;

pub use client::Client;
pub use config::{Config, PageLimit, RetryPolicy};
pub use endpoint::{Endpoint, Filter, Patch};
pub use endpoints::XeroEndpoint;
pub use entities::{
    Document, ListResponse, MutationResponse, Outcome, Resource, contact::Contact,
    credit_note::CreditNote, invoice::Invoice, line_item::LineItem,
};
pub use error::{Error, Result, ValidationError};
pub use oauth::{Credentials, KeyPair};
pub use pagination::{Page, Pages};
pub use scope::{Permission, Scope, ScopeType};
