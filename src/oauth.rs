use oauth2::{AccessToken, ClientId, ClientSecret, TokenResponse, TokenUrl, basic::BasicClient};
use reqwest::header::HeaderValue;

use crate::error::{Error, Result};
use crate::scope::Scope;

const XERO_TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Stores the OAuth 2 client ID and client secret.
#[derive(Debug, Clone)]
pub struct KeyPair(pub(crate) ClientId, pub(crate) Option<ClientSecret>);

impl KeyPair {
    /// Creates a new `KeyPair` from the provided `client_id` and `client_secret` strings.
    #[must_use]
    pub fn new(client_id: String, client_secret: Option<String>) -> Self {
        Self(
            ClientId::new(client_id),
            client_secret.map(ClientSecret::new),
        )
    }

    /// Reads `XERO_CLIENT_ID` and `XERO_CLIENT_SECRET`, returning `None` without a client id.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("XERO_CLIENT_ID").ok()?;
        Some(Self::new(client_id, std::env::var("XERO_CLIENT_SECRET").ok()))
    }
}

/// The bearer token a client authenticates with.
///
/// Credentials are fixed for the lifetime of a [`Client`](crate::Client); a
/// rejected or expired token surfaces as [`Error::Unauthorized`] and a new
/// client has to be built with fresh credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    access_token: AccessToken,
}

impl Credentials {
    /// Wraps a token acquired elsewhere.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: AccessToken::new(access_token.into()),
        }
    }

    /// Exchanges a custom-connection key pair for an access token using the
    /// client-credentials grant.
    #[instrument(skip(key_pair, scopes))]
    pub async fn from_client_credentials(
        key_pair: KeyPair,
        scopes: impl Into<Option<Scope>>,
    ) -> Result<Self> {
        let KeyPair(client_id, client_secret) = key_pair;
        let token_url =
            TokenUrl::new(XERO_TOKEN_URL.to_string()).map_err(|_| Error::InvalidEndpoint)?;
        let mut oauth_client = BasicClient::new(client_id).set_token_uri(token_url);
        if let Some(secret) = client_secret {
            oauth_client = oauth_client.set_client_secret(secret);
        }

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let mut request = oauth_client.exchange_client_credentials();
        if let Some(scope) = scopes.into() {
            request = request.add_scopes(scope.into_oauth2_scopes());
        }

        let token = request.request_async(&http_client).await?;
        debug!(expires_in = ?token.expires_in(), "obtained access token");

        Ok(Self {
            access_token: token.access_token().clone(),
        })
    }

    /// The `Authorization` header value, marked sensitive so it is never logged.
    pub(crate) fn authorization_header(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.access_token.secret()))
            .map_err(|_| Error::InvalidCredentials)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let credentials = Credentials::bearer("super-secret-token");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn header_is_sensitive_bearer() {
        let header = Credentials::bearer("abc").authorization_header().unwrap();
        assert!(header.is_sensitive());
        assert_eq!(header.to_str().unwrap(), "Bearer abc");
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(matches!(
            Credentials::bearer("bad\ntoken").authorization_header(),
            Err(Error::InvalidCredentials)
        ));
    }
}
