use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use reqwest::Method;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::batch;
use crate::client::Client;
use crate::decoder::{self, Envelope};
use crate::endpoints::XeroEndpoint;
use crate::entities::invoice::{Invoice, OnlineInvoices, Status};
use crate::entities::{Document, MutationResponse, Outcome, Resource};
use crate::error::{Error, ErrorType, Result};
use crate::pagination::{Page, Pages};
use crate::transport::{Accept, Request};
use crate::utils::file;

/// Narrows a collection read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Sent as `IDs`; unknown identifiers are simply absent from the result.
    pub ids: Vec<Uuid>,
    /// A `where` expression, e.g. `Status=="DRAFT"`.
    pub where_clause: Option<String>,
    pub order: Option<String>,
    /// Fetch only this page instead of walking the collection.
    pub page: Option<u32>,
    pub modified_since: Option<OffsetDateTime>,
    /// Any other query parameter, e.g. `Statuses` or `includeArchived`.
    pub params: Vec<(String, String)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(id: Uuid) -> Self {
        Self::ids([id])
    }

    #[must_use]
    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn where_clause(mut self, expression: impl Into<String>) -> Self {
        self.where_clause = Some(expression.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    #[must_use]
    pub fn modified_since(mut self, since: OffsetDateTime) -> Self {
        self.modified_since = Some(since);
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Query pairs for everything but paging.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if !self.ids.is_empty() {
            let ids = self
                .ids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query.push(("IDs".to_string(), ids));
        }
        if let Some(expression) = &self.where_clause {
            query.push(("where".to_string(), expression.clone()));
        }
        if let Some(order) = &self.order {
            query.push(("order".to_string(), order.clone()));
        }
        query.extend(self.params.iter().cloned());
        query
    }
}

/// A partial update of one existing entity: its identifier plus the fields to change.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<T> {
    id: Uuid,
    fields: Map<String, Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Resource> Patch<T> {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            fields: Map::new(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Patch<Invoice> {
    #[must_use]
    pub fn with_status(self, status: &Status) -> Self {
        self.set("Status", status.as_str())
    }
}

impl<T: Resource> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(T::ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            if key != T::ID_FIELD {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Operations on one collection, borrowed from a [`Client`].
pub struct Endpoint<'a, T> {
    client: &'a Client,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Endpoint<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Endpoint<'_, T> {}

impl<T> fmt::Debug for Endpoint<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("entity", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<'a, T: Resource> Endpoint<'a, T> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    /// Creates entities, returning one outcome per input in the same order.
    ///
    /// Elements the server refuses come back as [`Outcome::Rejected`]; they
    /// do not fail the call.
    #[instrument(skip(self, entities), fields(entity = T::NAME, count = entities.len()))]
    pub async fn create(&self, entities: &[T]) -> Result<MutationResponse<T>> {
        batch::in_chunks(entities, self.client.config().batch_size, |chunk| {
            self.mutate(Method::PUT, XeroEndpoint::Collection(T::COLLECTION), chunk)
        })
        .await
    }

    pub async fn create_one(&self, entity: &T) -> Result<Outcome<T>> {
        let response = self.create(std::slice::from_ref(entity)).await?;
        single(response)
    }

    /// Reads entities matching `filter`, walking pages up to the configured limit.
    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn get(&self, filter: &Filter) -> Result<crate::entities::ListResponse<T>> {
        self.pages(filter.clone()).collect_all().await
    }

    pub async fn get_all(&self) -> Result<crate::entities::ListResponse<T>> {
        self.get(&Filter::default()).await
    }

    /// Reads one entity; `Ok(None)` when no entity has this identifier.
    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<T>> {
        let response = self.get(&Filter::id(id)).await?;
        Ok(response.into_iter().find(|entity| entity.id() == Some(id)))
    }

    /// A cursor over the pages of the collection.
    #[must_use]
    pub fn pages(&self, filter: Filter) -> Pages<'a, T> {
        Pages::new(*self, filter, self.client.config().page_limit)
    }

    /// Applies `patch` to the entity it identifies.
    #[instrument(skip(self, patch), fields(entity = T::NAME, id = %patch.id()))]
    pub async fn update(&self, patch: &Patch<T>) -> Result<Outcome<T>> {
        let response = self
            .mutate(
                Method::POST,
                XeroEndpoint::Entity(T::COLLECTION, patch.id()),
                std::slice::from_ref(patch),
            )
            .await?;
        single(response)
    }

    /// Applies several patches in batched requests; outcomes align with `patches`.
    #[instrument(skip(self, patches), fields(entity = T::NAME, count = patches.len()))]
    pub async fn update_multiple(&self, patches: &[Patch<T>]) -> Result<MutationResponse<T>> {
        batch::in_chunks(patches, self.client.config().batch_size, |chunk| {
            self.mutate(Method::POST, XeroEndpoint::Collection(T::COLLECTION), chunk)
        })
        .await
    }

    pub(crate) async fn fetch_page(&self, filter: &Filter, page: u32) -> Result<Page<T>> {
        let config = self.client.config();
        let mut query = filter.to_query();
        if let Some(unitdp) = config.unitdp {
            query.push(("unitdp".to_string(), unitdp.to_string()));
        }
        query.push(("page".to_string(), page.to_string()));
        query.push(("pageSize".to_string(), config.page_size.to_string()));

        let request = Request::get(XeroEndpoint::Collection(T::COLLECTION))
            .query(query)
            .if_modified_since(filter.modified_since);
        let raw = self.client.transport().send(&request).await?;
        let mut envelope: Envelope = decoder::decode_json(raw, T::NAME)?;
        let entities = envelope
            .take_elements(T::COLLECTION)?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;

        let last = match envelope.pagination.and_then(|p| p.page_count) {
            Some(page_count) => page >= page_count,
            None => entities.len() < config.page_size as usize,
        };
        trace!(page, count = entities.len(), last, "fetched page");

        Ok(Page {
            number: page,
            id: envelope.id,
            entities,
            last,
        })
    }

    async fn mutate<B: Serialize>(
        &self,
        method: Method,
        endpoint: XeroEndpoint,
        elements: &[B],
    ) -> Result<MutationResponse<T>> {
        let mut body = Map::new();
        body.insert(T::COLLECTION.to_string(), serde_json::to_value(elements)?);

        let request = Request::new(method, endpoint)
            .query(self.client.config().mutation_query())
            .json(&body)?;
        let raw = self.client.transport().send(&request).await?;
        match decoder::decode_json::<Envelope>(raw, T::NAME) {
            Ok(envelope) => MutationResponse::from_envelope(envelope, elements.len()),
            Err(Error::API(response)) => {
                if let ErrorType::ValidationException { elements: returned } = &response.error {
                    if !returned.is_empty() && returned.len() == elements.len() {
                        debug!(entity = T::NAME, "request refused as a whole, reporting every element");
                        return MutationResponse::from_rejected_elements(returned.clone());
                    }
                }
                Err(Error::API(response))
            }
            Err(e) => Err(e),
        }
    }
}

impl<T: Document> Endpoint<'_, T> {
    /// Downloads the PDF rendition of an entity.
    #[instrument(skip(self), fields(entity = T::NAME))]
    pub async fn get_pdf(&self, id: Uuid) -> Result<Vec<u8>> {
        let request = Request::get(XeroEndpoint::Entity(T::COLLECTION, id)).accept(Accept::Pdf);
        let raw = self.client.transport().send(&request).await?;
        decoder::decode_binary(raw, T::NAME)
    }

    /// Downloads the PDF rendition and writes it to `path`, replacing any existing file.
    #[instrument(skip(self, path), fields(entity = T::NAME, path = %path.as_ref().display()))]
    pub async fn save_pdf(&self, id: Uuid, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.get_pdf(id).await?;
        file::write_replacing(path.as_ref(), &bytes).await?;
        debug!(bytes = bytes.len(), "saved document");
        Ok(())
    }
}

impl Endpoint<'_, Invoice> {
    /// The public URL customers can view the invoice at, if it has one.
    #[instrument(skip(self))]
    pub async fn online_invoice_url(&self, id: Uuid) -> Result<Option<String>> {
        let request = Request::get(XeroEndpoint::Action(Invoice::COLLECTION, id, "OnlineInvoice"));
        let raw = self.client.transport().send(&request).await?;
        let response: OnlineInvoices = decoder::decode_json(raw, Invoice::NAME)?;
        Ok(response
            .online_invoices
            .into_iter()
            .next()
            .map(|online| online.online_invoice_url))
    }

    /// Emails the invoice to its contact.
    #[instrument(skip(self))]
    pub async fn email(&self, id: Uuid) -> Result<()> {
        let request = Request::new(
            Method::POST,
            XeroEndpoint::Action(Invoice::COLLECTION, id, "Email"),
        )
        .json(&Map::new())?;
        let raw = self.client.transport().send(&request).await?;
        decoder::check_status(raw, Invoice::NAME)?;
        Ok(())
    }
}

fn single<T: Resource>(response: MutationResponse<T>) -> Result<Outcome<T>> {
    let returned = response.len();
    response
        .into_outcomes()
        .into_iter()
        .next()
        .ok_or(Error::MismatchedOutcomes {
            entity: T::NAME,
            submitted: 1,
            returned,
        })
}
