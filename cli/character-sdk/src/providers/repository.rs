use std::future::Future;
use std::sync::Arc;

use character_api::types::{CharacterDto, CharacterResponseDto};
use character_api::{ApiClient, ApiClientError};
use derive_more::From;
use thiserror::Error;
use tracing::{debug, instrument};

use super::mock::MockClient;
use crate::models::{Character, CharacterPage, CharacterQuery, PageNumber};

/// Error returned by [CharacterRepository] operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request to the catalog failed
    #[error(transparent)]
    Api(#[from] ApiClientError),
    /// A mock client was asked for more responses than it was seeded with
    #[error("no mock response left for '{0}'")]
    MockExhausted(&'static str),
    /// A mock client was seeded with a response of the wrong kind
    #[error("mock response does not fit '{0}'")]
    UnexpectedMockResponse(&'static str),
    #[error("{0}")]
    Other(String),
}

/// Source of catalog data consumed by the controllers.
///
/// This trait enables alternate implementations:
/// - **Remote**: REST calls to the catalog via [RemoteCharacterRepository]
/// - **Mock**: canned responses without HTTP via [MockClient]
pub trait CharacterRepository {
    /// Fetch one page of the listing matching `query`.
    fn fetch_characters(
        &self,
        page: PageNumber,
        query: &CharacterQuery,
    ) -> impl Future<Output = Result<CharacterPage, FetchError>> + Send;

    /// Fetch a single character by id.
    fn fetch_character(
        &self,
        id: u32,
    ) -> impl Future<Output = Result<Character, FetchError>> + Send;
}

impl<R> CharacterRepository for Arc<R>
where
    R: CharacterRepository + Send + Sync,
{
    fn fetch_characters(
        &self,
        page: PageNumber,
        query: &CharacterQuery,
    ) -> impl Future<Output = Result<CharacterPage, FetchError>> + Send {
        (**self).fetch_characters(page, query)
    }

    fn fetch_character(
        &self,
        id: u32,
    ) -> impl Future<Output = Result<Character, FetchError>> + Send {
        (**self).fetch_character(id)
    }
}

/// Either a repository backed by the catalog API,
/// or a mock repository for testing.
#[derive(Debug, From)]
pub enum Client {
    Remote(RemoteCharacterRepository),
    Mock(MockClient),
}

impl CharacterRepository for Client {
    async fn fetch_characters(
        &self,
        page: PageNumber,
        query: &CharacterQuery,
    ) -> Result<CharacterPage, FetchError> {
        match self {
            Client::Remote(remote) => remote.fetch_characters(page, query).await,
            Client::Mock(mock) => mock.fetch_characters(page, query).await,
        }
    }

    async fn fetch_character(&self, id: u32) -> Result<Character, FetchError> {
        match self {
            Client::Remote(remote) => remote.fetch_character(id).await,
            Client::Mock(mock) => mock.fetch_character(id).await,
        }
    }
}

/// Repository backed by the catalog REST API.
#[derive(Debug)]
pub struct RemoteCharacterRepository {
    client: ApiClient,
}

impl RemoteCharacterRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

/// Query parameters of a listing request.
///
/// `name` and `status` are omitted when the query does not filter by them.
fn listing_params(page: PageNumber, query: &CharacterQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", page.to_string())];

    if let Some(name) = query.name() {
        params.push(("name", name.to_string()));
    }

    if let Some(status) = query.status().api_value() {
        params.push(("status", status.to_string()));
    }

    params
}

impl CharacterRepository for RemoteCharacterRepository {
    #[instrument(skip_all, fields(page = page.get(), name = ?query.name(), status = %query.status()))]
    async fn fetch_characters(
        &self,
        page: PageNumber,
        query: &CharacterQuery,
    ) -> Result<CharacterPage, FetchError> {
        let params = listing_params(page, query);
        let response: CharacterResponseDto = self.client.get("character", &params).await?;
        let page = CharacterPage::from(response);

        debug!(
            n_characters = page.characters.len(),
            next = ?page.info.next,
            "received character page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn fetch_character(&self, id: u32) -> Result<Character, FetchError> {
        let response: CharacterDto = self.client.get(&format!("character/{id}"), &[]).await?;
        Ok(response.into())
    }
}
