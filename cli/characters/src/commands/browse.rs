use std::fmt::{self, Display};
use std::sync::Arc;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use character_sdk::controllers::{DetailController, ListController, ListSnapshot, ListViewState};
use character_sdk::models::{Character, CharacterQuery, StatusFilter};
use character_sdk::providers::repository::Client;
use inquire::InquireError;
use tracing::{debug, instrument};

use super::list::settled;
use super::show::load_character;
use super::wait_with_spinner;
use crate::config::Config;
use crate::utils::dialog::{Dialog, Select, Text};
use crate::utils::message;
use crate::utils::render::{self, EMPTY_MESSAGE, EMPTY_TITLE};

// Browse characters interactively
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Start with characters whose name contains NAME
    #[bpaf(long, short, argument("NAME"))]
    pub name: Option<String>,

    /// Start with characters of this status: all, alive, dead or unknown
    #[bpaf(long, short, argument("STATUS"), fallback(StatusFilter::All))]
    pub status: StatusFilter,
}

/// Choices offered after each load
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Show(Character),
    LoadMore,
    Search,
    Filter,
    Retry,
    Quit,
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Show(character) => write!(f, "{}", render::summary_line(character)),
            Action::LoadMore => write!(f, "[Load more]"),
            Action::Search => write!(f, "[Search by name]"),
            Action::Filter => write!(f, "[Filter by status]"),
            Action::Retry => write!(f, "[Try again]"),
            Action::Quit => write!(f, "[Quit]"),
        }
    }
}

/// Actions available for the state of the listing
fn actions(snapshot: &ListSnapshot, has_more: bool) -> Vec<Action> {
    let mut actions = snapshot
        .items
        .iter()
        .cloned()
        .map(Action::Show)
        .collect::<Vec<_>>();

    if matches!(snapshot.view_state, ListViewState::Error(_)) {
        actions.push(Action::Retry);
    }
    if has_more && !snapshot.items.is_empty() {
        actions.push(Action::LoadMore);
    }
    actions.extend([Action::Search, Action::Filter, Action::Quit]);
    actions
}

/// Title of the selection prompt
fn title(query: &CharacterQuery, loaded: usize) -> String {
    let mut title = "Characters".to_string();
    if let Some(name) = query.name() {
        title.push_str(&format!(" matching '{name}'"));
    }
    if query.status() != StatusFilter::All {
        title.push_str(&format!(" ({})", query.status()));
    }
    format!("{title}, {loaded} loaded")
}

/// Treat a cancelled prompt as no answer
fn answered<T>(result: inquire::error::InquireResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, config: Config, client: Client) -> Result<()> {
        if !Dialog::can_prompt() {
            bail!("'characters browse' needs an interactive terminal, use 'characters list' instead");
        }

        let client = Arc::new(client);
        let controller = ListController::with_debounce(Arc::clone(&client), config.debounce());
        let mut rx = controller.subscribe();

        let mut query = CharacterQuery::new(self.name.as_deref(), self.status);
        if query == CharacterQuery::default() {
            controller.load_initial();
        } else {
            controller.on_query_changed(query.clone());
        }
        let mut snapshot = wait_with_spinner("Loading characters...", settled(&mut rx, &query))?;

        loop {
            match &snapshot.view_state {
                ListViewState::Error(error) => message::error(error),
                ListViewState::Empty => message::plain(format!("{EMPTY_TITLE}: {EMPTY_MESSAGE}")),
                _ => {},
            }

            let prompt = title(&query, snapshot.items.len());
            let select = Dialog {
                message: &prompt,
                help_message: Some("Type to filter, enter to select"),
                typed: Select {
                    options: actions(&snapshot, controller.has_more()),
                },
            };
            let Some(action) = answered(select.prompt().await)? else {
                break;
            };
            debug!(?action, "browse action selected");

            match action {
                Action::Show(character) => {
                    let detail = DetailController::new(Arc::clone(&client), character.id);
                    match wait_with_spinner("Loading details...", load_character(&detail)) {
                        Ok(character) => println!("{}\n", render::detail_sheet(&character)),
                        Err(e) => message::error(e),
                    }
                    continue;
                },
                Action::LoadMore => {
                    if let Some(last) = snapshot.items.last() {
                        controller.load_more_if_needed(last);
                    }
                },
                Action::Search => {
                    let search = Dialog {
                        message: "Search by name",
                        help_message: Some("Leave empty to list all characters"),
                        typed: Text {
                            initial: query.name().map(ToString::to_string),
                        },
                    };
                    let Some(name) = answered(search.prompt().await)? else {
                        continue;
                    };
                    query = query.with_name(&name);
                    controller.on_query_changed(query.clone());
                },
                Action::Filter => {
                    let filter = Dialog {
                        message: "Status",
                        help_message: None,
                        typed: Select {
                            options: StatusFilter::ALL_FILTERS.to_vec(),
                        },
                    };
                    let Some(status) = answered(filter.prompt().await)? else {
                        continue;
                    };
                    query = query.with_status(status);
                    controller.on_query_changed(query.clone());
                },
                Action::Retry => controller.retry(),
                Action::Quit => break,
            }

            snapshot = wait_with_spinner("Loading characters...", settled(&mut rx, &query))?;
        }

        Ok(())
    }
}
