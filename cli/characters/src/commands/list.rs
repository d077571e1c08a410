use std::num::NonZeroU32;

use anyhow::{Context, Result, bail};
use bpaf::Bpaf;
use character_sdk::controllers::{ListController, ListSnapshot, ListViewState};
use character_sdk::models::{Character, CharacterQuery, StatusFilter};
use character_sdk::providers::repository::{CharacterRepository, Client};
use indoc::formatdoc;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::wait_with_spinner;
use crate::config::Config;
use crate::utils::message;
use crate::utils::render::{self, EMPTY_MESSAGE, EMPTY_TITLE};

#[derive(Debug, Bpaf, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    Pages(
        /// Number of pages to load (default: 'page_limit' from the config)
        #[bpaf(long("pages"), argument("N"))]
        NonZeroU32,
    ),
    /// Load all pages
    #[bpaf(long("all"))]
    All,
}

// List characters
#[derive(Debug, Bpaf, Clone)]
pub struct List {
    /// Only list characters whose name contains NAME
    #[bpaf(long, short, argument("NAME"))]
    pub name: Option<String>,

    /// Only list characters with this status: all, alive, dead or unknown
    #[bpaf(long, short, argument("STATUS"), fallback(StatusFilter::All))]
    pub status: StatusFilter,

    #[bpaf(external(page_selection), optional)]
    pub pages: Option<PageSelection>,

    /// Print characters as a JSON array
    #[bpaf(long)]
    pub json: bool,
}

impl List {
    #[instrument(name = "list", skip_all, fields(name = ?self.name, status = %self.status, json = self.json))]
    pub async fn handle(self, config: Config, client: Client) -> Result<()> {
        let page_limit = match self.pages {
            Some(PageSelection::All) => None,
            Some(PageSelection::Pages(pages)) => Some(pages),
            None => Some(config.page_limit),
        };
        let query = CharacterQuery::new(self.name.as_deref(), self.status);
        let controller = ListController::with_debounce(client, config.debounce());

        let listing = wait_with_spinner(
            "Loading characters...",
            load_listing(&controller, query, page_limit),
        )?;

        if self.json {
            debug!("printing characters as JSON");
            println!("{}", serde_json::to_string_pretty(&listing.characters)?);
        } else if listing.characters.is_empty() {
            message::plain(formatdoc! {"
                {EMPTY_TITLE}
                {EMPTY_MESSAGE}"
            });
        } else {
            println!("{}", render::character_table(&listing.characters));
        }

        if listing.incomplete {
            message::warning(format!(
                "Could not load more characters, showing the first {}.",
                listing.characters.len()
            ));
        }

        Ok(())
    }
}

/// Characters loaded by [load_listing]
#[derive(Debug)]
pub(super) struct Listing {
    pub characters: Vec<Character>,
    /// A later page failed to load
    pub incomplete: bool,
}

/// Wait until the listing for `query` is loaded and no page is in flight.
pub(super) async fn settled(
    rx: &mut watch::Receiver<ListSnapshot>,
    query: &CharacterQuery,
) -> Result<ListSnapshot> {
    let snapshot = rx
        .wait_for(|state| {
            state.query == *query
                && !state.is_fetching_next_page
                && !matches!(state.view_state, ListViewState::Idle | ListViewState::Loading)
        })
        .await
        .context("character listing stopped unexpectedly")?;
    Ok(snapshot.clone())
}

/// Start `controller` on `query` and page through it.
///
/// Stops after `page_limit` pages, on the last page, or when a later page fails.
/// Fails if the first page cannot be loaded.
pub(super) async fn load_listing<R>(
    controller: &ListController<R>,
    query: CharacterQuery,
    page_limit: Option<NonZeroU32>,
) -> Result<Listing>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    let mut rx = controller.subscribe();
    if query == CharacterQuery::default() {
        controller.load_initial();
    } else {
        controller.on_query_changed(query.clone());
    }

    let mut snapshot = settled(&mut rx, &query).await?;
    if let ListViewState::Error(message) = &snapshot.view_state {
        bail!("{message}");
    }

    let mut pages_loaded = 1;
    let mut incomplete = false;
    while page_limit.is_none_or(|limit| pages_loaded < limit.get()) {
        let (Some(last), Some(cursor)) = (snapshot.items.last(), controller.cursor()) else {
            break;
        };

        debug!(page = cursor.get(), "loading next page");
        controller.load_more_if_needed(last);
        snapshot = settled(&mut rx, &query).await?;

        if controller.cursor() == Some(cursor) {
            incomplete = true;
            break;
        }
        pages_loaded += 1;
    }

    Ok(Listing {
        characters: snapshot.items,
        incomplete,
    })
}
