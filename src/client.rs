use std::sync::Arc;

use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::entities::{
    Resource, contact::Contact, credit_note::CreditNote, invoice::Invoice,
};
use crate::error::Result;
use crate::oauth::{Credentials, KeyPair};
use crate::scope::Scope;
use crate::transport::Transport;

/// This is the client that is used for interacting with the Accounting API. It
/// holds the credentials and context (the current tenant) for every request.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    transport: Transport,
    config: Arc<Config>,
}

impl Client {
    /// Builds a client around existing credentials.
    pub fn new(credentials: Credentials, config: Config) -> Result<Self> {
        let transport = Transport::new(&credentials, &config)?;
        trace!(base_url = %config.base_url, tenant_id = ?config.tenant_id, "client ready");
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    /// Obtains a token with the client-credentials grant and builds a client with it.
    #[instrument(skip(key_pair, scopes, config))]
    pub async fn from_client_credentials(
        key_pair: KeyPair,
        scopes: impl Into<Option<Scope>>,
        config: Config,
    ) -> Result<Self> {
        let credentials = Credentials::from_client_credentials(key_pair, scopes).await?;
        Self::new(credentials, config)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub fn invoices(&self) -> Endpoint<'_, Invoice> {
        self.endpoint()
    }

    #[must_use]
    pub fn credit_notes(&self) -> Endpoint<'_, CreditNote> {
        self.endpoint()
    }

    #[must_use]
    pub fn contacts(&self) -> Endpoint<'_, Contact> {
        self.endpoint()
    }

    /// The endpoint for any [`Resource`].
    #[must_use]
    pub fn endpoint<T: Resource>(&self) -> Endpoint<'_, T> {
        Endpoint::new(self)
    }
}
