use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::endpoints::BASE_URL;
use crate::error::{Error, Result};

/// Number of elements the API accepts comfortably in a single batched request.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Page size requested for paginated collections.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("xero-accounting/", env!("CARGO_PKG_VERSION"));

/// How many pages a collection read may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageLimit {
    /// Keep fetching until the server reports the last page.
    #[default]
    All,
    /// Stop after this many pages, even if more exist.
    Pages(u32),
}

impl PageLimit {
    pub(crate) fn allows(self, fetched: u32) -> bool {
        match self {
            Self::All => true,
            Self::Pages(max) => fetched < max,
        }
    }
}

/// Bounded exponential backoff for idempotent requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for a `GET` failing with a 5xx or a timeout, including the first.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// How often a 429 is waited out before surfacing `RateLimitExceeded`.
    pub rate_limit_retries: usize,
    /// Wait used when a 429 carries no `Retry-After` header.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            rate_limit_retries: 3,
            default_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            rate_limit_retries: 0,
            ..Self::default()
        }
    }
}

/// Client configuration, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    /// Sent as `Xero-tenant-id`; required by the API for every accounting call.
    pub tenant_id: Option<Uuid>,
    pub user_agent: String,
    /// Upper bound for a single HTTP exchange.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub page_size: u32,
    pub page_limit: PageLimit,
    /// Largest number of elements sent in one create/update request.
    pub batch_size: usize,
    /// When `false` the API reports validation failures per element instead of
    /// rejecting the whole request.
    pub summarize_errors: bool,
    /// Unit decimal places (4 or 2, defaults to 2 if not specified).
    pub unitdp: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(BASE_URL).expect("BASE_URL is a valid URL"),
            tenant_id: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            page_limit: PageLimit::All,
            batch_size: DEFAULT_BATCH_SIZE,
            summarize_errors: false,
            unitdp: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new(tenant_id: Uuid) -> Self {
        Self::default().with_tenant(tenant_id)
    }

    /// Point the client at another API root, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref()).map_err(|_| Error::InvalidEndpoint)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint);
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_page_limit(mut self, page_limit: PageLimit) -> Self {
        self.page_limit = page_limit;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// With `true` the server refuses the whole request when any element is
    /// invalid. Every submitted element then comes back as [`Outcome::Rejected`],
    /// including the valid ones, since nothing was stored.
    ///
    /// [`Outcome::Rejected`]: crate::Outcome::Rejected
    #[must_use]
    pub fn with_summarize_errors(mut self, summarize_errors: bool) -> Self {
        self.summarize_errors = summarize_errors;
        self
    }

    #[must_use]
    pub fn with_unitdp(mut self, unitdp: u8) -> Self {
        self.unitdp = Some(unitdp);
        self
    }

    /// Query parameters appended to every create/update request.
    pub(crate) fn mutation_query(&self) -> Vec<(String, String)> {
        let mut query = vec![(
            "summarizeErrors".to_string(),
            self.summarize_errors.to_string(),
        )];
        if let Some(unitdp) = self.unitdp {
            query.push(("unitdp".to_string(), unitdp.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = Config::default()
            .with_base_url("http://127.0.0.1:4010/api.xro/2.0")
            .unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:4010/api.xro/2.0/");
        assert_eq!(
            config.base_url.join("Invoices").unwrap().as_str(),
            "http://127.0.0.1:4010/api.xro/2.0/Invoices"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            Config::default().with_base_url("not a url"),
            Err(Error::InvalidEndpoint)
        ));
    }

    #[test]
    fn mutation_query_reports_per_element_errors_by_default() {
        let query = Config::default().with_unitdp(4).mutation_query();
        assert_eq!(
            query,
            vec![
                ("summarizeErrors".to_string(), "false".to_string()),
                ("unitdp".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn page_limit_caps_fetches() {
        assert!(PageLimit::All.allows(10_000));
        assert!(PageLimit::Pages(2).allows(1));
        assert!(!PageLimit::Pages(2).allows(2));
    }
}
