//! Incremental loading of the character listing.
//!
//! [ListController] accumulates pages of characters for the active
//! [CharacterQuery]. Query changes are debounced and reset the listing,
//! [ListController::load_more_if_needed] continues it at the next cursor.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::messages::{GENERIC_ERROR, readable_message};
use crate::models::{Character, CharacterPage, CharacterQuery, FIRST_PAGE, PageNumber};
use crate::providers::repository::{CharacterRepository, FetchError};

/// Quiet period after the last query change before the listing is reset.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ListViewState {
    /// Nothing was requested yet
    #[default]
    Idle,
    /// The first page of the listing is being fetched
    Loading,
    /// At least one character was loaded
    Content,
    /// The listing was loaded and has no characters
    Empty,
    /// The first page failed to load
    Error(String),
}

/// State published to observers of a [ListController].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
    /// Characters loaded so far, in fetch order
    pub items: Vec<Character>,
    pub view_state: ListViewState,
    /// Set while any page fetch, including the first, is in flight
    pub is_fetching_next_page: bool,
    /// The query the listing was loaded for
    pub query: CharacterQuery,
}

/// Controller internals that are not published.
#[derive(Debug)]
struct Bookkeeping {
    cursor: Option<PageNumber>,
    fetching: bool,
    query: CharacterQuery,
    fetch_generation: u64,
    fetch_task: Option<JoinHandle<()>>,
    debounce_generation: u64,
    debounce_task: Option<JoinHandle<()>>,
}

impl Default for Bookkeeping {
    fn default() -> Self {
        Self {
            cursor: Some(FIRST_PAGE),
            fetching: false,
            query: CharacterQuery::default(),
            fetch_generation: 0,
            fetch_task: None,
            debounce_generation: 0,
            debounce_task: None,
        }
    }
}

impl Bookkeeping {
    /// Invalidate the in-flight fetch, if any, and return the new generation.
    ///
    /// A superseded fetch may still complete but will not commit.
    fn supersede_fetch(&mut self) -> u64 {
        self.fetch_generation += 1;
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        self.fetch_generation
    }
}

struct Shared<R> {
    repository: R,
    debounce_window: Duration,
    books: Mutex<Bookkeeping>,
    state: watch::Sender<ListSnapshot>,
}

impl<R> Shared<R> {
    // Lock order: `books` before `state`.
    fn books(&self) -> MutexGuard<'_, Bookkeeping> {
        self.books.lock().expect("list controller state poisoned")
    }
}

impl<R> Shared<R>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    fn reset_and_fetch(self: &Arc<Self>, books: &mut Bookkeeping) {
        books.supersede_fetch();
        books.fetching = false;
        books.cursor = Some(FIRST_PAGE);

        let query = books.query.clone();
        self.state.send_modify(|state| {
            state.items.clear();
            state.view_state = ListViewState::Loading;
            state.is_fetching_next_page = false;
            state.query = query;
        });

        self.fetch_next_page(books);
    }

    fn fetch_next_page(self: &Arc<Self>, books: &mut Bookkeeping) {
        if books.fetching {
            trace!("page fetch already in flight");
            return;
        }
        let Some(page) = books.cursor else {
            trace!("no further pages");
            return;
        };

        books.fetching = true;
        let generation = books.supersede_fetch();
        let query = books.query.clone();
        self.state
            .send_modify(|state| state.is_fetching_next_page = true);

        debug!(page = page.get(), generation, ?query, "fetching character page");

        let shared = Arc::clone(self);
        books.fetch_task = Some(tokio::spawn(async move {
            let result = shared.repository.fetch_characters(page, &query).await;
            shared.commit_page(generation, page, result);
        }));
    }

    fn commit_page(
        &self,
        generation: u64,
        page: PageNumber,
        result: Result<CharacterPage, FetchError>,
    ) {
        let mut books = self.books();
        if books.fetch_generation != generation {
            debug!(
                page = page.get(),
                generation, "discarding result of superseded fetch"
            );
            return;
        }
        books.fetching = false;
        books.fetch_task = None;

        match result {
            Ok(response) => {
                books.cursor = response.next_cursor();
                self.state.send_modify(|state| {
                    state.items.extend(response.characters);
                    state.view_state = if state.items.is_empty() {
                        ListViewState::Empty
                    } else {
                        ListViewState::Content
                    };
                    state.is_fetching_next_page = false;
                });
            },
            Err(err) => {
                self.state.send_modify(|state| {
                    if state.items.is_empty() {
                        debug!(page = page.get(), error = %err, "failed to load listing");
                        state.view_state = ListViewState::Error(readable_message(&err, GENERIC_ERROR));
                    } else {
                        // Keep what is already shown, the next load attempt starts at the same page
                        warn!(page = page.get(), error = %err, "failed to load next page");
                    }
                    state.is_fetching_next_page = false;
                });
            },
        }
    }

    fn apply_query(self: &Arc<Self>, generation: u64, query: CharacterQuery) {
        let mut books = self.books();
        if books.debounce_generation != generation {
            return;
        }
        books.debounce_task = None;

        if books.query == query {
            debug!(?query, "query unchanged, keeping listing");
            return;
        }

        debug!(?query, "query changed, resetting listing");
        books.query = query;
        self.reset_and_fetch(&mut books);
    }
}

/// Loads the character listing page by page.
///
/// All operations must be called from within a tokio runtime.
/// Dropping the controller aborts its in-flight fetch and pending query change.
pub struct ListController<R> {
    shared: Arc<Shared<R>>,
}

impl<R> ListController<R>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    pub fn new(repository: R) -> Self {
        Self::with_debounce(repository, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(repository: R, debounce_window: Duration) -> Self {
        let (state, _) = watch::channel(ListSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                repository,
                debounce_window,
                books: Mutex::new(Bookkeeping::default()),
                state,
            }),
        }
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.shared.state.subscribe()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ListSnapshot {
        self.shared.state.borrow().clone()
    }

    /// The next page to fetch, [None] once the last page was loaded.
    pub fn cursor(&self) -> Option<PageNumber> {
        self.shared.books().cursor
    }

    pub fn has_more(&self) -> bool {
        self.cursor().is_some()
    }

    /// Load the first page, unless loading was already started.
    pub fn load_initial(&self) {
        let mut books = self.shared.books();
        let idle = self.shared.state.borrow().view_state == ListViewState::Idle;
        if !idle {
            trace!("listing already loaded, ignoring initial load");
            return;
        }
        self.shared.reset_and_fetch(&mut books);
    }

    /// Discard the listing and load it again from the first page.
    pub fn retry(&self) {
        let mut books = self.shared.books();
        self.shared.reset_and_fetch(&mut books);
    }

    /// Schedule a reset of the listing for `query`.
    ///
    /// Changes arriving within the debounce window of each other collapse
    /// into one, only the last is applied. Applying a query equal to the
    /// active one does nothing.
    pub fn on_query_changed(&self, query: CharacterQuery) {
        let mut books = self.shared.books();
        books.debounce_generation += 1;
        let generation = books.debounce_generation;
        if let Some(task) = books.debounce_task.take() {
            task.abort();
        }

        trace!(?query, "debouncing query change");

        let shared = Arc::clone(&self.shared);
        let window = self.shared.debounce_window;
        books.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            shared.apply_query(generation, query);
        }));
    }

    /// Fetch the next page if `anchor` is the last loaded character.
    pub fn load_more_if_needed(&self, anchor: &Character) {
        let mut books = self.shared.books();
        let is_last = self
            .shared
            .state
            .borrow()
            .items
            .last()
            .is_some_and(|last| last.id == anchor.id);
        if !is_last {
            return;
        }
        self.shared.fetch_next_page(&mut books);
    }
}

impl<R> Drop for ListController<R> {
    fn drop(&mut self) {
        if let Ok(mut books) = self.shared.books.lock() {
            books.fetch_generation += 1;
            books.debounce_generation += 1;
            for task in [books.fetch_task.take(), books.debounce_task.take()]
                .into_iter()
                .flatten()
            {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use character_api::ApiClientError;
    use pretty_assertions::assert_eq;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::models::StatusFilter;
    use crate::models::character::test_helpers::{character, page};
    use crate::providers::mock::{MockClient, MockError, Response};

    fn controller(mock: &MockClient) -> ListController<MockClient> {
        ListController::new(mock.clone())
    }

    /// Wait until no fetch is in flight and the first page has been handled
    async fn settled(rx: &mut watch::Receiver<ListSnapshot>) -> ListSnapshot {
        rx.wait_for(|state| {
            !state.is_fetching_next_page
                && !matches!(state.view_state, ListViewState::Idle | ListViewState::Loading)
        })
        .await
        .unwrap()
        .clone()
    }

    /// Wait until a page fetch for the listing has completed
    async fn fetched(rx: &mut watch::Receiver<ListSnapshot>) -> ListSnapshot {
        rx.wait_for(|state| !state.is_fetching_next_page)
            .await
            .unwrap()
            .clone()
    }

    fn bird() -> CharacterQuery {
        CharacterQuery::new(Some("Bird"), StatusFilter::All)
    }

    #[tokio::test(start_paused = true)]
    async fn load_initial_success_shows_content() {
        let mock = MockClient::default();
        let expected = vec![character(1, "Rick"), character(2, "Morty")];
        mock.push_page(page(None, expected.clone()));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();

        let state = settled(&mut rx).await;
        assert_eq!(state.view_state, ListViewState::Content);
        assert_eq!(state.items, expected);
        assert_eq!(mock.page_requests(), vec![(
            FIRST_PAGE,
            CharacterQuery::default()
        )]);
    }

    #[tokio::test(start_paused = true)]
    async fn load_initial_empty_shows_empty() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();

        let state = settled(&mut rx).await;
        assert_eq!(state.view_state, ListViewState::Empty);
        assert!(state.items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_initial_twice_fetches_once() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        controller.load_initial();

        settled(&mut rx).await;
        controller.load_initial();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.invocations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_flagged_while_first_page_is_in_flight() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));

        let controller = controller(&mock);
        controller.load_initial();

        let state = controller.snapshot();
        assert_eq!(state.view_state, ListViewState::Loading);
        assert!(state.is_fetching_next_page);
        assert!(state.items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_page_shows_error() {
        let mock = MockClient::default();
        mock.push_error(MockError::ServerRejected(500));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();

        let state = settled(&mut rx).await;
        assert_eq!(
            state.view_state,
            ListViewState::Error("Request failed (500).".to_string())
        );
        assert!(state.items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn error_messages_follow_error_kind() {
        let cases = [
            (MockError::ServerRejected(404), "Request failed (404)."),
            (
                MockError::MalformedResponse("missing field `info`".to_string()),
                "Unable to read data.",
            ),
            (MockError::Other("gremlins".to_string()), GENERIC_ERROR),
        ];

        for (error, expected) in cases {
            let mock = MockClient::default();
            mock.push_error(error);

            let controller = controller(&mock);
            let mut rx = controller.subscribe();
            controller.load_initial();

            let state = settled(&mut rx).await;
            assert_eq!(state.view_state, ListViewState::Error(expected.to_string()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_error() {
        let mock = MockClient::default();
        mock.push_error(MockError::ServerRejected(503));
        mock.push_page(page(None, vec![character(1, "Rick")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        settled(&mut rx).await;

        controller.retry();
        assert_eq!(controller.snapshot().view_state, ListViewState::Loading);

        let state = settled(&mut rx).await;
        assert_eq!(state.view_state, ListViewState::Content);
        assert_eq!(state.items, vec![character(1, "Rick")]);
        assert_eq!(mock.invocations().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_appends_next_page() {
        let mock = MockClient::default();
        mock.push_page(page(Some(2), vec![character(1, "Rick"), character(2, "Morty")]));
        mock.push_page(page(None, vec![character(3, "Summer")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        let first = settled(&mut rx).await;
        assert_eq!(controller.cursor(), PageNumber::new(2));

        controller.load_more_if_needed(&first.items[1]);
        assert!(controller.snapshot().is_fetching_next_page);
        let state = fetched(&mut rx).await;

        assert_eq!(state.items, vec![
            character(1, "Rick"),
            character(2, "Morty"),
            character(3, "Summer"),
        ]);
        assert_eq!(state.view_state, ListViewState::Content);
        assert_eq!(controller.cursor(), None);
        assert!(!controller.has_more());
        assert!(!state.is_fetching_next_page);
        assert_eq!(
            mock.page_requests()
                .into_iter()
                .map(|(page, _)| page.get())
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_ignores_anchor_that_is_not_last() {
        let mock = MockClient::default();
        mock.push_page(page(Some(2), vec![character(1, "Rick"), character(2, "Morty")]));
        mock.push_page(page(None, vec![character(3, "Summer")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        let first = settled(&mut rx).await;

        controller.load_more_if_needed(&first.items[0]);
        controller.load_more_if_needed(&character(99, "Mr. Poopybutthole"));
        sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.invocations().len(), 1);
        assert!(!controller.snapshot().is_fetching_next_page);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_stops_after_last_page() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        let first = settled(&mut rx).await;

        controller.load_more_if_needed(&first.items[0]);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(mock.invocations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_while_fetching_is_ignored() {
        let mock = MockClient::default();
        mock.push_page(page(Some(2), vec![character(1, "Rick")]));
        mock.push_delayed_response(
            Duration::from_secs(2),
            Response::Page(page(Some(3), vec![character(2, "Morty")])),
        );

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        let first = settled(&mut rx).await;

        controller.load_more_if_needed(&first.items[0]);
        controller.load_more_if_needed(&first.items[0]);
        let state = fetched(&mut rx).await;

        assert_eq!(mock.invocations().len(), 2);
        assert_eq!(state.items.len(), 2);
    }

    /// A failing later page keeps the loaded characters and does not surface an error
    #[tokio::test(start_paused = true)]
    async fn failed_next_page_keeps_content() {
        let mock = MockClient::default();
        mock.push_page(page(Some(2), vec![character(1, "Rick"), character(2, "Morty")]));
        mock.push_error(MockError::ServerRejected(500));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        let first = settled(&mut rx).await;

        controller.load_more_if_needed(&first.items[1]);
        let state = fetched(&mut rx).await;

        assert_eq!(state.view_state, ListViewState::Content);
        assert_eq!(state.items, first.items);
        assert_eq!(controller.cursor(), PageNumber::new(2));
    }

    #[tokio::test(start_paused = true)]
    async fn query_change_resets_listing() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));
        mock.push_page(page(None, vec![character(2, "Birdperson")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        settled(&mut rx).await;

        controller.on_query_changed(bird());
        let state = rx
            .wait_for(|state| {
                state.query == bird()
                    && state.view_state == ListViewState::Content
                    && !state.is_fetching_next_page
            })
            .await
            .unwrap()
            .clone();

        assert_eq!(state.items, vec![character(2, "Birdperson")]);
        assert_eq!(mock.page_requests(), vec![
            (FIRST_PAGE, CharacterQuery::default()),
            (FIRST_PAGE, bird()),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_query_changes_collapse() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));
        mock.push_page(page(None, vec![character(2, "Birdperson")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        settled(&mut rx).await;

        for name in ["B", "Bi", "Bir", "Bird"] {
            controller.on_query_changed(CharacterQuery::new(Some(name), StatusFilter::All));
            sleep(DEFAULT_DEBOUNCE / 2).await;
        }
        sleep(DEFAULT_DEBOUNCE * 2).await;
        settled(&mut rx).await;

        assert_eq!(mock.page_requests(), vec![
            (FIRST_PAGE, CharacterQuery::default()),
            (FIRST_PAGE, bird()),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_change_waits_for_debounce_window() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(2, "Birdperson")]));

        let controller = controller(&mock);
        controller.on_query_changed(bird());

        sleep(DEFAULT_DEBOUNCE - Duration::from_millis(10)).await;
        assert!(mock.invocations().is_empty());

        sleep(Duration::from_millis(20)).await;
        assert_eq!(mock.page_requests(), vec![(FIRST_PAGE, bird())]);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_query_is_not_refetched() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        settled(&mut rx).await;

        // Sanitizes to the active query
        controller.on_query_changed(CharacterQuery::new(Some("   "), StatusFilter::All));
        sleep(DEFAULT_DEBOUNCE * 2).await;

        // Changed and changed back within one window
        controller.on_query_changed(bird());
        sleep(DEFAULT_DEBOUNCE / 2).await;
        controller.on_query_changed(CharacterQuery::default());
        sleep(DEFAULT_DEBOUNCE * 2).await;

        assert_eq!(mock.invocations().len(), 1);
        assert_eq!(controller.snapshot().view_state, ListViewState::Content);
    }

    #[tokio::test(start_paused = true)]
    async fn status_change_is_a_new_query() {
        let mock = MockClient::default();
        mock.push_page(page(None, vec![character(1, "Rick")]));
        mock.push_page(page(None, vec![]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        settled(&mut rx).await;

        let dead = CharacterQuery::default().with_status(StatusFilter::Dead);
        controller.on_query_changed(dead.clone());
        let state = rx
            .wait_for(|state| state.query == dead && state.view_state == ListViewState::Empty)
            .await
            .unwrap()
            .clone();

        assert!(state.items.is_empty());
        assert_eq!(mock.page_requests()[1], (FIRST_PAGE, dead));
    }

    /// A slow fetch superseded by a retry never commits its result
    #[tokio::test(start_paused = true)]
    async fn superseded_fetch_is_discarded() {
        let mock = MockClient::default();
        mock.push_delayed_response(
            Duration::from_secs(5),
            Response::Page(page(None, vec![character(1, "Stale Rick")])),
        );
        mock.push_page(page(None, vec![character(2, "Fresh Rick")]));

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        // let the first fetch pick up its response
        sleep(Duration::from_secs(1)).await;
        assert_eq!(mock.invocations().len(), 1);

        controller.retry();
        let state = settled(&mut rx).await;
        assert_eq!(state.items, vec![character(2, "Fresh Rick")]);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.snapshot().items, vec![character(2, "Fresh Rick")]);
    }

    /// The generation check rejects late results even if a task was not aborted in time
    #[test]
    fn stale_generation_does_not_commit() {
        let controller = controller(&MockClient::default());
        let stale = {
            let mut books = controller.shared.books();
            books.supersede_fetch();
            books.supersede_fetch() - 1
        };

        controller.shared.commit_page(
            stale,
            FIRST_PAGE,
            Ok(page(None, vec![character(1, "Rick")])),
        );
        controller.shared.commit_page(
            stale,
            FIRST_PAGE,
            Err(FetchError::Api(ApiClientError::ServerRejected(500))),
        );

        assert_eq!(controller.snapshot(), ListSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_aborts_fetch() {
        let mock = MockClient::default();
        mock.push_delayed_response(
            Duration::from_secs(5),
            Response::Page(page(None, vec![character(1, "Rick")])),
        );

        let controller = controller(&mock);
        let mut rx = controller.subscribe();
        controller.load_initial();
        sleep(Duration::from_secs(1)).await;
        rx.borrow_and_update();

        drop(controller);

        let closed = timeout(Duration::from_secs(1), rx.changed()).await;
        assert!(matches!(closed, Ok(Err(_))), "expected closed channel");
    }
}
