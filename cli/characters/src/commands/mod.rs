mod browse;
mod list;
mod show;

use std::fmt;
use std::future::Future;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use tracing::debug;

use crate::config::Config;
use crate::utils::SPINNER_DELAY;
use crate::utils::dialog::{Dialog, Spinner};
use crate::utils::init::init_client;

static CHARACTERS_DESCRIPTION: &str = indoc! {"
    Browse the characters of the Rick and Morty catalog.

    Characters are loaded page by page from the catalog API,
    optionally filtered by name and status."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(CHARACTERS_DESCRIPTION))]
pub struct CharactersCli(#[bpaf(external(characters_args))] pub CharactersArgs);

/// Main argument parser
///
/// To parse the command line, use [`CharactersCli`] through [`characters_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct CharactersArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

impl CharactersArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        debug!(?config, "running with config");
        let client = init_client(&config)?;

        match self.command {
            Commands::List(args) => args.handle(config, client).await,
            Commands::Show(args) => args.handle(client).await,
            Commands::Browse(args) => args.handle(config, client).await,
        }
    }
}

/// Drive `future` to completion, showing `message` with a spinner if it takes a while.
///
/// Blocks the calling thread, the future runs on the current runtime.
fn wait_with_spinner<T: Send>(message: &str, future: impl Future<Output = T> + Send) -> T {
    Dialog {
        message,
        help_message: None,
        typed: Spinner::new(|| tokio::runtime::Handle::current().block_on(future)),
    }
    .spin_with_delay(SPINNER_DELAY)
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// List characters, optionally filtered by name and status
    #[bpaf(command)]
    List(#[bpaf(external(list::list))] list::List),

    /// Show details of a single character
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Interactively search and page through characters
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),
}
