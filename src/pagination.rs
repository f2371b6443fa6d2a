use uuid::Uuid;

use crate::config::PageLimit;
use crate::endpoint::{Endpoint, Filter};
use crate::entities::{ListResponse, Resource};
use crate::error::Result;

/// One page of a collection read.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub number: u32,
    /// Response identifier of the request that fetched this page.
    pub id: Uuid,
    pub entities: Vec<T>,
    /// Whether the server has no further pages.
    pub last: bool,
}

/// Lazy cursor over the pages of a collection.
///
/// Pages are fetched one at a time, in order, only when asked for. The cursor
/// stops after the last page or once the page limit is reached, whichever
/// comes first.
#[derive(Debug)]
pub struct Pages<'a, T> {
    endpoint: Endpoint<'a, T>,
    filter: Filter,
    first: u32,
    next: Option<u32>,
    fetched: u32,
    limit: PageLimit,
}

impl<'a, T: Resource> Pages<'a, T> {
    pub(crate) fn new(endpoint: Endpoint<'a, T>, filter: Filter, limit: PageLimit) -> Self {
        let (first, limit) = match filter.page {
            Some(page) => (page, PageLimit::Pages(1)),
            None => (1, limit),
        };
        Self {
            endpoint,
            filter,
            first,
            next: Some(first),
            fetched: 0,
            limit,
        }
    }

    /// The page the next call to [`Pages::next_page`] would fetch, ignoring the limit.
    #[must_use]
    pub fn next_page_number(&self) -> Option<u32> {
        self.next
    }

    /// Fetches the next page, or `None` when the collection or the limit is exhausted.
    #[instrument(skip(self), fields(entity = T::NAME, page = ?self.next))]
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>> {
        let Some(number) = self.next else {
            return Ok(None);
        };
        if !self.limit.allows(self.fetched) {
            debug!(fetched = self.fetched, "page limit reached");
            return Ok(None);
        }

        let page = self.endpoint.fetch_page(&self.filter, number).await?;

        self.fetched += 1;
        self.next = if page.last { None } else { Some(number + 1) };
        Ok(Some(page))
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.next = Some(self.first);
        self.fetched = 0;
    }

    /// Drains the cursor into one response.
    pub async fn collect_all(mut self) -> Result<ListResponse<T>> {
        let mut id = None;
        let mut entities = Vec::new();
        let mut pages = 0;

        while let Some(page) = self.next_page().await? {
            id.get_or_insert(page.id);
            pages += 1;
            entities.extend(page.entities);
        }

        if let Some(next) = self.next {
            info!(
                entity = T::NAME,
                pages,
                next,
                "stopped at the page limit, more pages are available"
            );
        }

        Ok(ListResponse {
            id: id.unwrap_or_else(Uuid::nil),
            entities,
            pages,
            next_page: self.next,
        })
    }
}
