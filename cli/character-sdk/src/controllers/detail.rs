//! Loading of a single character.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::messages::{DETAILS_UNAVAILABLE, readable_message};
use crate::models::Character;
use crate::providers::repository::{CharacterRepository, FetchError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum DetailViewState {
    #[default]
    Loading,
    Content(Character),
    Error(String),
}

#[derive(Debug, Default)]
struct Bookkeeping {
    started: bool,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared<R> {
    repository: R,
    id: u32,
    books: Mutex<Bookkeeping>,
    state: watch::Sender<DetailViewState>,
}

impl<R> Shared<R> {
    fn books(&self) -> MutexGuard<'_, Bookkeeping> {
        self.books.lock().expect("detail controller state poisoned")
    }

    fn commit(&self, generation: u64, result: Result<Character, FetchError>) {
        let mut books = self.books();
        if books.generation != generation {
            debug!(id = self.id, generation, "discarding result of superseded fetch");
            return;
        }
        books.task = None;

        let state = match result {
            Ok(character) => DetailViewState::Content(character),
            Err(err) => {
                debug!(id = self.id, error = %err, "failed to load character");
                DetailViewState::Error(readable_message(&err, DETAILS_UNAVAILABLE))
            },
        };
        self.state.send_replace(state);
    }
}

impl<R> Shared<R>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    fn fetch(self: &Arc<Self>, books: &mut Bookkeeping) {
        books.started = true;
        books.generation += 1;
        if let Some(task) = books.task.take() {
            task.abort();
        }
        let generation = books.generation;
        self.state.send_replace(DetailViewState::Loading);

        debug!(id = self.id, generation, "fetching character");

        let shared = Arc::clone(self);
        books.task = Some(tokio::spawn(async move {
            let result = shared.repository.fetch_character(shared.id).await;
            shared.commit(generation, result);
        }));
    }
}

/// Loads the details of one character.
///
/// Like [super::ListController], operations spawn onto the current tokio
/// runtime and dropping the controller aborts the in-flight fetch.
pub struct DetailController<R> {
    shared: Arc<Shared<R>>,
}

impl<R> DetailController<R>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    pub fn new(repository: R, id: u32) -> Self {
        let (state, _) = watch::channel(DetailViewState::Loading);
        Self {
            shared: Arc::new(Shared {
                repository,
                id,
                books: Mutex::new(Bookkeeping::default()),
                state,
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.shared.id
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailViewState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> DetailViewState {
        self.shared.state.borrow().clone()
    }

    /// Start loading, unless loading was already started.
    pub fn load(&self) {
        let mut books = self.shared.books();
        if books.started || *self.shared.state.borrow() != DetailViewState::Loading {
            trace!(id = self.shared.id, "character already requested");
            return;
        }
        self.shared.fetch(&mut books);
    }

    /// Load the character again, superseding any fetch in flight.
    pub fn retry(&self) {
        let mut books = self.shared.books();
        self.shared.fetch(&mut books);
    }
}

impl<R> Drop for DetailController<R> {
    fn drop(&mut self) {
        if let Ok(mut books) = self.shared.books.lock() {
            books.generation += 1;
            if let Some(task) = books.task.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    use super::*;
    use crate::models::character::test_helpers::character;
    use crate::providers::mock::{Invocation, MockClient, MockError, Response};

    async fn settled(rx: &mut watch::Receiver<DetailViewState>) -> DetailViewState {
        rx.wait_for(|state| *state != DetailViewState::Loading)
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn load_shows_character() {
        let mock = MockClient::default();
        mock.push_character(character(1, "Rick"));

        let controller = DetailController::new(mock.clone(), 1);
        let mut rx = controller.subscribe();
        assert_eq!(controller.state(), DetailViewState::Loading);

        controller.load();
        let state = settled(&mut rx).await;

        assert_eq!(state, DetailViewState::Content(character(1, "Rick")));
        assert_eq!(mock.invocations(), vec![Invocation::Character { id: 1 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn load_is_idempotent() {
        let mock = MockClient::default();
        mock.push_character(character(1, "Rick"));

        let controller = DetailController::new(mock.clone(), 1);
        let mut rx = controller.subscribe();
        controller.load();
        controller.load();
        settled(&mut rx).await;
        controller.load();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.invocations().len(), 1);
        assert_eq!(controller.state(), DetailViewState::Content(character(1, "Rick")));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_character_shows_status() {
        let mock = MockClient::default();
        mock.push_error(MockError::ServerRejected(404));

        let controller = DetailController::new(mock, 9999);
        let mut rx = controller.subscribe();
        controller.load();

        assert_eq!(
            settled(&mut rx).await,
            DetailViewState::Error("Request failed (404).".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_error_uses_fallback() {
        let mock = MockClient::default();
        mock.push_error(MockError::Other("gremlins".to_string()));

        let controller = DetailController::new(mock, 1);
        let mut rx = controller.subscribe();
        controller.load();

        assert_eq!(
            settled(&mut rx).await,
            DetailViewState::Error(DETAILS_UNAVAILABLE.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_error_loads_again() {
        let mock = MockClient::default();
        mock.push_error(MockError::ServerRejected(500));
        mock.push_character(character(1, "Rick"));

        let controller = DetailController::new(mock.clone(), 1);
        let mut rx = controller.subscribe();
        controller.load();
        settled(&mut rx).await;

        // load only acts on a fresh controller
        controller.load();
        assert_eq!(mock.invocations().len(), 1);

        controller.retry();
        assert_eq!(controller.state(), DetailViewState::Loading);
        assert_eq!(
            settled(&mut rx).await,
            DetailViewState::Content(character(1, "Rick"))
        );
        assert_eq!(mock.invocations().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_supersedes_fetch_in_flight() {
        let mock = MockClient::default();
        mock.push_delayed_response(
            Duration::from_secs(5),
            Response::Character(character(1, "Stale Rick")),
        );
        mock.push_character(character(1, "Fresh Rick"));

        let controller = DetailController::new(mock.clone(), 1);
        let mut rx = controller.subscribe();
        controller.load();
        sleep(Duration::from_secs(1)).await;

        controller.retry();
        assert_eq!(
            settled(&mut rx).await,
            DetailViewState::Content(character(1, "Fresh Rick"))
        );

        sleep(Duration::from_secs(10)).await;
        assert_eq!(
            controller.state(),
            DetailViewState::Content(character(1, "Fresh Rick"))
        );
    }
}
