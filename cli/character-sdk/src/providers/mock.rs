//! A repository that replays canned responses.
//!
//! Used by tests and, through [CHARACTERS_MOCK_DATA_VAR], to run the command
//! line against a fixed data set without network access.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use character_api::ApiClientError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::repository::{CharacterRepository, FetchError};
use crate::models::{Character, CharacterPage, CharacterQuery, PageNumber};

/// Path to a JSON file of mock responses, see [MockClient::new].
pub const CHARACTERS_MOCK_DATA_VAR: &str = "_CHARACTERS_USE_MOCK";

// Arc allows you to push things into the client from outside the client if necessary
// Mutex allows you to share across threads (necessary because of tokio)
type MockField<T> = Arc<Mutex<T>>;

/// A canned response, deserialized from mock data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Page(CharacterPage),
    Character(Character),
    Error(MockError),
}

/// Serializable stand-in for the errors a real repository produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockError {
    InvalidRequest(String),
    ServerRejected(u16),
    MalformedResponse(String),
    Other(String),
}

impl From<MockError> for FetchError {
    fn from(error: MockError) -> Self {
        use serde::de::Error as _;

        match error {
            MockError::InvalidRequest(reason) => ApiClientError::InvalidRequest(reason).into(),
            MockError::ServerRejected(status) => ApiClientError::ServerRejected(status).into(),
            MockError::MalformedResponse(reason) => {
                ApiClientError::MalformedResponse(serde_json::Error::custom(reason)).into()
            },
            MockError::Other(message) => FetchError::Other(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the _CHARACTERS_USE_MOCK var
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// A request received by a [MockClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Characters { page: PageNumber, query: CharacterQuery },
    Character { id: u32 },
}

#[derive(Debug, Clone)]
struct QueuedResponse {
    delay: Duration,
    response: Response,
}

/// A repository that can be seeded with mock responses.
///
/// Responses are handed out in the order they were pushed,
/// regardless of which operation asks for them.
/// Clones share their queue and the record of invocations.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    mock_responses: MockField<VecDeque<QueuedResponse>>,
    invocations: MockField<Vec<Invocation>>,
}

/// Reads a list of mock responses from disk.
fn read_mock_responses(path: impl AsRef<Path>) -> Result<Vec<Response>, MockDataError> {
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    serde_json::from_str(&contents).map_err(MockDataError::ParseJson)
}

impl MockClient {
    /// Create a new mock client, potentially reading mock responses from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let client = Self::default();
        if let Some(path) = mock_data_path {
            for response in read_mock_responses(path)? {
                client.push_response(response);
            }
        }
        Ok(client)
    }

    /// Push a new response into the list of mock responses
    pub fn push_response(&self, response: Response) {
        self.push_delayed_response(Duration::ZERO, response);
    }

    /// Push a response that is handed out only after `delay` has passed
    pub fn push_delayed_response(&self, delay: Duration, response: Response) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(QueuedResponse { delay, response });
    }

    pub fn push_page(&self, page: CharacterPage) {
        self.push_response(Response::Page(page));
    }

    pub fn push_character(&self, character: Character) {
        self.push_response(Response::Character(character));
    }

    pub fn push_error(&self, error: MockError) {
        self.push_response(Response::Error(error));
    }

    /// All requests received so far, oldest first
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    /// Pages and queries of all listing requests received so far
    pub fn page_requests(&self) -> Vec<(PageNumber, CharacterQuery)> {
        self.invocations()
            .into_iter()
            .filter_map(|invocation| match invocation {
                Invocation::Characters { page, query } => Some((page, query)),
                Invocation::Character { .. } => None,
            })
            .collect()
    }

    fn next_response(&self, invocation: Invocation) -> Option<QueuedResponse> {
        debug!(?invocation, "mock client received request");
        self.invocations
            .lock()
            .expect("couldn't acquire mock lock")
            .push(invocation);
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
    }
}

impl CharacterRepository for MockClient {
    async fn fetch_characters(
        &self,
        page: PageNumber,
        query: &CharacterQuery,
    ) -> Result<CharacterPage, FetchError> {
        let operation = "fetch_characters";
        let Some(QueuedResponse { delay, response }) = self.next_response(Invocation::Characters {
            page,
            query: query.clone(),
        }) else {
            return Err(FetchError::MockExhausted(operation));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match response {
            Response::Page(page) => Ok(page),
            Response::Error(error) => Err(error.into()),
            Response::Character(_) => Err(FetchError::UnexpectedMockResponse(operation)),
        }
    }

    async fn fetch_character(&self, id: u32) -> Result<Character, FetchError> {
        let operation = "fetch_character";
        let Some(QueuedResponse { delay, response }) =
            self.next_response(Invocation::Character { id })
        else {
            return Err(FetchError::MockExhausted(operation));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match response {
            Response::Character(character) => Ok(character),
            Response::Error(error) => Err(error.into()),
            Response::Page(_) => Err(FetchError::UnexpectedMockResponse(operation)),
        }
    }
}
