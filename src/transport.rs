use std::time::Duration;

use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use time::{OffsetDateTime, macros::format_description};
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use url::Url;

use crate::config::{Config, RetryPolicy};
use crate::endpoints::XeroEndpoint;
use crate::error::{Error, Result};
use crate::oauth::Credentials;

// Rate limiting headers used by the API
/// Header containing number of remaining daily API calls
const HEADER_DAY_LIMIT_REMAINING: &str = "X-DayLimit-Remaining";
/// Header containing number of remaining per-minute API calls
const HEADER_MIN_LIMIT_REMAINING: &str = "X-MinLimit-Remaining";
/// Header containing number of remaining app-wide per-minute API calls
const HEADER_APP_MIN_LIMIT_REMAINING: &str = "X-AppMinLimit-Remaining";
/// Header identifying which rate limit was hit when a 429 is returned
const HEADER_RATE_LIMIT_PROBLEM: &str = "X-Rate-Limit-Problem";
const HEADER_TENANT_ID: &str = "xero-tenant-id";

/// Information about the remaining API rate limits
///
/// The API applies several rate limits to usage:
/// - Daily limit: 5000 calls per day per tenant
/// - Minute limit: 60 calls per minute per tenant
/// - App minute limit: 10,000 calls per minute across all tenants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub day_limit_remaining: Option<u32>,
    pub minute_limit_remaining: Option<u32>,
    pub app_minute_limit_remaining: Option<u32>,
}

impl RateLimitInfo {
    fn from_response_headers(headers: &header::HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u32>().ok())
        };
        Self {
            day_limit_remaining: read(HEADER_DAY_LIMIT_REMAINING),
            minute_limit_remaining: read(HEADER_MIN_LIMIT_REMAINING),
            app_minute_limit_remaining: read(HEADER_APP_MIN_LIMIT_REMAINING),
        }
    }

    /// Returns true if any of the limits are close to being exhausted
    #[must_use]
    pub fn is_near_limit(&self) -> bool {
        self.day_limit_remaining.is_some_and(|v| v < 100)
            || self.minute_limit_remaining.is_some_and(|v| v < 10)
            || self.app_minute_limit_remaining.is_some_and(|v| v < 100)
    }
}

/// The representation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    Pdf,
}

impl Accept {
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Pdf => "application/pdf",
        }
    }
}

/// One HTTP exchange, described independently of the HTTP client so it can be replayed.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub endpoint: XeroEndpoint,
    pub query: Vec<(String, String)>,
    /// Pre-serialized JSON body.
    pub body: Option<Vec<u8>>,
    pub accept: Accept,
    pub if_modified_since: Option<OffsetDateTime>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, endpoint: XeroEndpoint) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            body: None,
            accept: Accept::Json,
            if_modified_since: None,
        }
    }

    #[must_use]
    pub fn get(endpoint: XeroEndpoint) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn accept(mut self, accept: Accept) -> Self {
        self.accept = accept;
        self
    }

    #[must_use]
    pub fn if_modified_since(mut self, since: Option<OffsetDateTime>) -> Self {
        self.if_modified_since = since;
        self
    }

    fn is_idempotent(&self) -> bool {
        self.method == Method::GET
    }
}

/// Status, media type and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub rate_limit: RateLimitInfo,
}

impl RawResponse {
    /// The body as text, for error reporting.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs authenticated HTTP calls against the API root.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Transport {
    pub fn new(credentials: &Credentials, config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, credentials.authorization_header()?);
        if let Some(tenant_id) = config.tenant_id {
            headers.insert(
                HEADER_TENANT_ID,
                header::HeaderValue::from_str(&tenant_id.to_string())
                    .map_err(|_| Error::InvalidCredentials)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            retry: config.retry.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a request, waiting out rate limits and retrying transient failures
    /// of idempotent requests.
    #[instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn send(&self, request: &Request) -> Result<RawResponse> {
        let mut rate_limited = 0;

        loop {
            match self.send_with_backoff(request).await {
                Err(Error::RateLimitExceeded { retry_after, .. })
                    if rate_limited < self.retry.rate_limit_retries =>
                {
                    rate_limited += 1;
                    let wait_time = retry_after.unwrap_or(self.retry.default_retry_after);
                    warn!(
                        "Rate limit exceeded (attempt {}/{}), waiting for {:?} before retrying",
                        rate_limited, self.retry.rate_limit_retries, wait_time
                    );
                    sleep(wait_time).await;
                }
                other => return other,
            }
        }
    }

    async fn send_with_backoff(&self, request: &Request) -> Result<RawResponse> {
        let idempotent = request.is_idempotent();
        let mut attempt = 0;

        RetryIf::start(
            self.backoff(),
            || {
                attempt += 1;
                self.attempt(request, attempt)
            },
            |e: &Error| {
                let retry = idempotent && e.is_retryable();
                if retry {
                    warn!(error = %e, "transient failure, backing off");
                }
                retry
            },
        )
        .await
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let initial = u64::try_from(self.retry.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor((initial / 2).max(1))
            .max_delay(self.retry.max_backoff)
            .map(jitter)
            .take(self.retry.max_attempts.saturating_sub(1))
    }

    async fn attempt(&self, request: &Request, attempt: usize) -> Result<RawResponse> {
        let url = request.endpoint.to_url(&self.base_url)?;
        trace!(%url, attempt, query = ?request.query, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(header::ACCEPT, request.accept.mime());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        if let Some(since) = request.if_modified_since {
            match format_modified_since(since) {
                Ok(value) => builder = builder.header(header::IF_MODIFIED_SINCE, value),
                Err(e) => warn!(error = %e, "could not format If-Modified-Since, sending without it"),
            }
        }

        let response = builder.send().await?;
        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();
        let url = response.url().to_string();
        let rate_limit = RateLimitInfo::from_response_headers(response.headers());

        debug!("Response from {}: status={}", url, status);

        if rate_limit.is_near_limit() {
            warn!(
                "Approaching API rate limits: day_remaining={:?}, minute_remaining={:?}, app_minute_remaining={:?}",
                rate_limit.day_limit_remaining,
                rate_limit.minute_limit_remaining,
                rate_limit.app_minute_limit_remaining
            );
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let problem = response
                .headers()
                .get(HEADER_RATE_LIMIT_PROBLEM)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            warn!(
                "Rate limit exceeded for {}: problem={:?}, retry_after={:?}",
                url, problem, retry_after
            );

            let text = response.text().await.unwrap_or_default();
            return Err(Error::RateLimitExceeded {
                retry_after,
                problem,
                url,
                response_body: Some(text),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();
        debug!("Response body size: {} bytes", body.len());

        let raw = RawResponse {
            status,
            url,
            content_type,
            body,
            rate_limit,
        };

        if status == StatusCode::UNAUTHORIZED {
            error!("Access token rejected by {}", raw.url);
            return Err(Error::Unauthorized {
                response_body: Some(raw.text()),
                url: raw.url,
            });
        }

        if status.is_server_error() {
            error!("Server error {} from {}", status, raw.url);
            return Err(Error::UnexpectedStatus {
                status_code: status,
                response_body: Some(raw.text()),
                url: raw.url,
            });
        }

        Ok(raw)
    }
}

fn format_modified_since(since: OffsetDateTime) -> std::result::Result<String, time::error::Format> {
    since
        .to_offset(time::UtcOffset::UTC)
        .format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn rate_limit_headers_are_parsed() {
        let mut headers = header::HeaderMap::new();
        headers.insert(HEADER_DAY_LIMIT_REMAINING, "4000".parse().unwrap());
        headers.insert(HEADER_MIN_LIMIT_REMAINING, "5".parse().unwrap());

        let info = RateLimitInfo::from_response_headers(&headers);
        assert_eq!(info.day_limit_remaining, Some(4000));
        assert_eq!(info.minute_limit_remaining, Some(5));
        assert_eq!(info.app_minute_limit_remaining, None);
        assert!(info.is_near_limit());
        assert!(!RateLimitInfo::default().is_near_limit());
    }

    #[test]
    fn modified_since_is_sent_in_utc() {
        let since = datetime!(2024-03-01 10:30:00 +02:00);
        assert_eq!(format_modified_since(since).unwrap(), "2024-03-01T08:30:00");
    }

    #[test]
    fn only_get_is_idempotent() {
        assert!(Request::get(XeroEndpoint::Collection("Invoices")).is_idempotent());
        assert!(
            !Request::new(Method::POST, XeroEndpoint::Collection("Invoices")).is_idempotent()
        );
    }

    #[test]
    fn backoff_is_bounded_by_attempts() {
        let config = Config::default().with_retry(RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            ..RetryPolicy::default()
        });
        let transport = Transport::new(&Credentials::bearer("token"), &config).unwrap();
        let delays: Vec<_> = transport.backoff().collect();
        assert_eq!(delays.len(), 2);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(300)));
    }
}
