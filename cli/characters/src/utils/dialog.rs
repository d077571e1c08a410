use std::fmt::Display;
use std::time::{Duration, Instant};

use crossterm::tty::IsTty;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};

use super::TERMINAL_STDERR;

/// Disables prompting even when attached to a terminal
const CHARACTERS_NO_PROMPT_VAR: &str = "_CHARACTERS_NO_PROMPT";

#[derive(Clone)]
pub struct Select<T> {
    pub options: Vec<T>,
}

#[derive(Debug, Clone, Default)]
pub struct Text {
    /// Text the input starts out with
    pub initial: Option<String>,
}

pub struct Spinner<F>(F);
impl<F: FnOnce() -> T + Send, T: Send> Spinner<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[derive(Debug, Clone)]
pub struct Dialog<'a, Type> {
    pub message: &'a str,
    pub help_message: Option<&'a str>,
    pub typed: Type,
}

struct Choice(usize, String);
impl Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.1.fmt(f)
    }
}

impl<T: Display> Dialog<'_, Select<T>> {
    pub async fn prompt(self) -> inquire::error::InquireResult<T> {
        let message = self.message.to_owned();
        let help_message = self.help_message.map(ToOwned::to_owned);
        let mut options = self.typed.options;

        let choices = options
            .iter()
            .map(ToString::to_string)
            .enumerate()
            .map(|(id, value)| Choice(id, value))
            .collect();

        let Choice(id, _) = tokio::task::spawn_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog =
                inquire::Select::new(&message, choices).with_render_config(characters_theme());

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await
        .expect("Failed to join blocking dialog")?;

        Ok(options.remove(id))
    }
}

impl Dialog<'_, Text> {
    pub async fn prompt(self) -> inquire::error::InquireResult<String> {
        let message = self.message.to_owned();
        let help_message = self.help_message.map(ToOwned::to_owned);
        let initial = self.typed.initial;

        tokio::task::spawn_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog = inquire::Text::new(&message).with_render_config(characters_theme());

            if let Some(ref initial) = initial {
                dialog = dialog.with_initial_value(initial);
            }

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await
        .expect("Failed to join blocking dialog")
    }
}

impl<F: FnOnce() -> T + Send, T: Send> Dialog<'_, Spinner<F>> {
    /// Run the wrapped function, showing a spinner once it takes longer than
    /// `start_spinning_after`.
    pub fn spin_with_delay(self, start_spinning_after: Duration) -> T {
        let handle = tokio::runtime::Handle::current();
        std::thread::scope(|s| {
            let y = s.spawn(move || {
                // self.typed.0 may be a function that requires tokio
                let _guard = handle.enter();
                (self.typed.0)()
            });
            let mut dialog: Option<ProgressBar> = None;
            let started = Instant::now();
            while !y.is_finished() {
                if started.elapsed() < start_spinning_after {
                    std::thread::sleep(Duration::from_millis(50));
                    continue;
                }

                let spinner = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg} {prefix:>}") {
                    spinner.set_style(style);
                }
                spinner.set_message(self.message.to_string());
                if let Some(help_message) = self.help_message {
                    spinner.set_prefix(help_message.to_string())
                }
                spinner.enable_steady_tick(Duration::from_millis(100));
                dialog = Some(spinner);

                break;
            }

            let res = match y.join() {
                Ok(res) => res,
                Err(panic) => std::panic::resume_unwind(panic),
            };

            if let Some(dialog) = dialog {
                dialog.finish_and_clear();
            }

            res
        })
    }
}

impl Dialog<'_, ()> {
    /// True if stderr, stdin and stdout are ttys
    pub fn can_prompt() -> bool {
        if std::env::var(CHARACTERS_NO_PROMPT_VAR).is_ok_and(|v| v == "1") {
            return false;
        }
        std::io::stderr().is_tty() && std::io::stdin().is_tty() && std::io::stdout().is_tty()
    }
}

pub fn characters_theme() -> RenderConfig<'static> {
    let mut render_config = RenderConfig::default_colored();

    if std::env::var_os("NO_COLOR").is_some() {
        render_config = RenderConfig::empty();
        render_config.answered_prompt_prefix = Styled::new(">");
        render_config.highlighted_option_prefix = Styled::new(">");
        render_config.prompt_prefix = Styled::new("?");
        return render_config;
    }

    render_config.answered_prompt_prefix = Styled::new(">").with_fg(Color::LightGreen);
    render_config.highlighted_option_prefix = Styled::new(">").with_fg(Color::LightGreen);
    render_config.prompt_prefix = Styled::new("?").with_fg(Color::LightCyan);
    render_config.prompt = StyleSheet::new().with_attr(Attributes::BOLD);
    render_config.help_message = StyleSheet::new().with_fg(Color::DarkCyan);
    render_config.answer = StyleSheet::new().with_fg(Color::LightGreen);

    render_config
}
