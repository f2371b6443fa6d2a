use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use oauth2::{HttpClientError, RequestTokenError, basic::BasicErrorResponse};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `Type` discriminant of an error document returned by the Accounting API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Type")]
#[allow(clippy::module_name_repetitions)]
pub enum ErrorType {
    ValidationException {
        /// The submitted elements, echoed back with their `ValidationErrors`.
        #[serde(rename = "Elements", default)]
        elements: Vec<serde_json::Value>,
    },
    PostDataInvalidException,
    QueryParseException,
    ObjectNotFoundException,
    OrganisationOfflineException,
    UnauthorisedException,
    NoDataProcessedException,
    UnsupportedMediaTypeException,
    MethodNotAllowedException,
    InternalServerException,
    NotImplementedException,
    NotAvailableException,
    RateLimitExceededException,
    SystemUnavailableException,
    #[serde(other)]
    Unknown,
}

impl ErrorType {
    fn hint(&self) -> &'static str {
        match self {
            Self::ValidationException { .. } => "One or more submitted elements failed validation",
            Self::PostDataInvalidException => "The request body could not be parsed",
            Self::QueryParseException => "The query string could not be parsed",
            Self::ObjectNotFoundException => "The requested object does not exist",
            Self::OrganisationOfflineException => "The organisation is temporarily offline",
            Self::UnauthorisedException => "The access token was rejected",
            Self::NoDataProcessedException => "The request contained no data to process",
            Self::UnsupportedMediaTypeException => "The media type is not supported",
            Self::MethodNotAllowedException => "The HTTP method is not allowed on this resource",
            Self::InternalServerException => "The API failed while handling the request",
            Self::NotImplementedException => "The operation is not implemented",
            Self::NotAvailableException => "The API is not available",
            Self::RateLimitExceededException => "A rate limit was exceeded",
            Self::SystemUnavailableException => "The API is undergoing maintenance",
            Self::Unknown => "Unrecognised error type",
        }
    }
}

/// A per-entity validation message, carried inside successful responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(clippy::module_name_repetitions)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error document returned by the API alongside a non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub error_number: u64,
    pub message: String,
    #[serde(flatten)]
    pub error: ErrorType,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Xero API Error ({}): {} ({})",
            self.error_number,
            self.message,
            self.error.hint()
        )
    }
}

/// Errors that can occur when interacting with the Accounting API.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("error making request: {0:?}")]
    #[diagnostic(
        code(xero_accounting::request_error),
        help("Check your network connection and the API availability")
    )]
    Request(#[source] reqwest::Error),

    #[error("access token rejected (url: {url})")]
    #[diagnostic(
        code(xero_accounting::unauthorized),
        help("The bearer token is invalid or expired; obtain a new one and rebuild the client")
    )]
    Unauthorized {
        url: String,
        response_body: Option<String>,
    },

    #[error("forbidden (url: {url})")]
    #[diagnostic(
        code(xero_accounting::forbidden),
        help("Check that the token's scopes and tenant grant access to this resource")
    )]
    Forbidden {
        url: String,
        response_body: Option<String>,
    },

    #[error("credentials cannot be sent as a header")]
    #[diagnostic(
        code(xero_accounting::invalid_credentials),
        help("Access tokens must only contain visible ASCII characters")
    )]
    InvalidCredentials,

    #[error("oauth2 error: {0:?}")]
    #[diagnostic(
        code(xero_accounting::oauth2_error),
        help("Verify your OAuth2 client id, secret and requested scopes")
    )]
    OAuth2(Box<RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>>),

    #[error("object not found: {entity} (url: {url})")]
    #[diagnostic(
        code(xero_accounting::not_found),
        help("Verify that the {entity} exists and that you have permission to access it")
    )]
    NotFound {
        entity: String,
        url: String,
        status_code: StatusCode,
        response_body: Option<String>,
    },

    #[error("error decoding response: {0:?}")]
    #[diagnostic(
        code(xero_accounting::deserialization_error),
        help("The API returned data in an unexpected format")
    )]
    DeserializationError(#[source] serde_json::Error, Option<String>),

    #[error("expected a {expected} body but received {content_type:?} (url: {url})")]
    #[diagnostic(
        code(xero_accounting::unexpected_content_type),
        help("The API answered with a different representation than the one requested")
    )]
    UnexpectedContentType {
        expected: &'static str,
        content_type: Option<String>,
        url: String,
    },

    #[error("submitted {submitted} {entity} element(s) but the response carried {returned}")]
    #[diagnostic(
        code(xero_accounting::mismatched_outcomes),
        help("Outcomes could not be paired with the submitted elements")
    )]
    MismatchedOutcomes {
        entity: &'static str,
        submitted: usize,
        returned: usize,
    },

    /// A standard error document returned by the API such as a `ValidationException`.
    #[error("encountered API error: {0}")]
    #[diagnostic(
        code(xero_accounting::api_error),
        help("Review the error document returned by the API")
    )]
    API(Box<Response>),

    #[error("unexpected status {status_code} (url: {url})")]
    #[diagnostic(
        code(xero_accounting::unexpected_status),
        help("The API returned a status this client does not handle")
    )]
    UnexpectedStatus {
        status_code: StatusCode,
        url: String,
        response_body: Option<String>,
    },

    /// Rate limit exceeded (HTTP 429 Too Many Requests) after all retries.
    #[error("rate limit exceeded: retry after {retry_after:?}")]
    #[diagnostic(
        code(xero_accounting::rate_limit_exceeded),
        help("The API rate limit has been exceeded. Wait and retry, or throttle requests.")
    )]
    RateLimitExceeded {
        retry_after: Option<Duration>,
        problem: Option<String>,
        url: String,
        response_body: Option<String>,
    },

    #[error("failed to write {}", .path.display())]
    #[diagnostic(
        code(xero_accounting::io_error),
        help("Check that the target directory exists and is writable")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("endpoint could not be parsed as a URL")]
    #[diagnostic(
        code(xero_accounting::invalid_endpoint),
        help("Check that the base URL is correctly formatted")
    )]
    InvalidEndpoint,
}

impl Error {
    /// Whether an idempotent request failing with this error may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus { status_code, .. } => status_code.is_server_error(),
            _ => false,
        }
    }

    /// Whether the credentials were rejected.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::InvalidCredentials
                | Self::OAuth2(_)
        )
    }

    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Request(e) => e.status(),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            Self::NotFound { status_code, .. } | Self::UnexpectedStatus { status_code, .. } => {
                Some(*status_code)
            }
            Self::RateLimitExceeded { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            _ => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { url, .. }
            | Self::Forbidden { url, .. }
            | Self::NotFound { url, .. }
            | Self::UnexpectedContentType { url, .. }
            | Self::UnexpectedStatus { url, .. }
            | Self::RateLimitExceeded { url, .. } => Some(url),
            _ => None,
        }
    }

    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { response_body, .. }
            | Self::Forbidden { response_body, .. }
            | Self::NotFound { response_body, .. }
            | Self::UnexpectedStatus { response_body, .. }
            | Self::RateLimitExceeded { response_body, .. } => response_body.as_deref(),
            Self::DeserializationError(_, body) => body.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn api_response(&self) -> Option<&Response> {
        match self {
            Self::API(response) => Some(response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::DeserializationError(e, None)
    }
}

impl From<RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>> for Error {
    fn from(e: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>) -> Self {
        Self::OAuth2(Box::new(e))
    }
}

impl From<Response> for Error {
    fn from(response: Response) -> Self {
        Self::API(Box::new(response))
    }
}

/// Type alias for results from this crate.
///
/// This is already a Miette diagnostic result due to the implementation of
/// the Diagnostic trait for the Error type.
pub type Result<O> = std::result::Result<O, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_exception_keeps_elements() {
        let response: Response = serde_json::from_value(json!({
            "ErrorNumber": 10,
            "Type": "ValidationException",
            "Message": "A validation exception occurred",
            "Elements": [{ "InvoiceID": "00000000-0000-0000-0000-000000000000" }]
        }))
        .unwrap();

        match response.error {
            ErrorType::ValidationException { elements } => assert_eq!(elements.len(), 1),
            other => panic!("expected ValidationException, got {other:?}"),
        }
    }

    #[test]
    fn unrecognised_type_falls_back_to_unknown() {
        let response: Response = serde_json::from_value(json!({
            "ErrorNumber": 99,
            "Type": "BrandNewException",
            "Message": "Something new"
        }))
        .unwrap();
        assert!(matches!(response.error, ErrorType::Unknown));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        let server = Error::UnexpectedStatus {
            status_code: StatusCode::BAD_GATEWAY,
            url: "https://example.test/Invoices".to_string(),
            response_body: None,
        };
        let client = Error::UnexpectedStatus {
            status_code: StatusCode::BAD_REQUEST,
            url: "https://example.test/Invoices".to_string(),
            response_body: None,
        };
        let auth = Error::Unauthorized {
            url: "https://example.test/Invoices".to_string(),
            response_body: None,
        };

        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!auth.is_retryable());
        assert!(auth.is_auth());
    }
}
