use anyhow::{Context, Result, bail};
use bpaf::Bpaf;
use character_sdk::controllers::{DetailController, DetailViewState};
use character_sdk::models::Character;
use character_sdk::providers::repository::{CharacterRepository, Client};
use tracing::instrument;

use super::wait_with_spinner;
use crate::utils::render;

// Show details of a single character
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Print the character as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Id of the character, as shown by 'characters list'
    #[bpaf(positional("id"))]
    pub id: u32,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(id = self.id))]
    pub async fn handle(self, client: Client) -> Result<()> {
        let controller = DetailController::new(client, self.id);
        let character = wait_with_spinner("Loading details...", load_character(&controller))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&character)?);
        } else {
            println!("{}", render::detail_sheet(&character));
        }
        Ok(())
    }
}

/// Load the character of `controller`, failing with the message of its error state.
pub(super) async fn load_character<R>(controller: &DetailController<R>) -> Result<Character>
where
    R: CharacterRepository + Send + Sync + 'static,
{
    let mut rx = controller.subscribe();
    controller.load();

    let state = rx
        .wait_for(|state| *state != DetailViewState::Loading)
        .await
        .context("character details stopped unexpectedly")?
        .clone();

    match state {
        DetailViewState::Content(character) => Ok(character),
        DetailViewState::Error(message) => bail!("{message}"),
        DetailViewState::Loading => bail!("character details are still loading"),
    }
}
