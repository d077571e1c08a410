use std::io::Stderr;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

pub mod dialog;
pub mod init;
pub mod message;
pub mod render;

/// Serializes writes to stderr between log output, spinners and prompts.
pub static TERMINAL_STDERR: LazyLock<Mutex<Stderr>> =
    LazyLock::new(|| Mutex::new(std::io::stderr()));

/// How long to wait for a response before showing a spinner
pub const SPINNER_DELAY: Duration = Duration::from_secs(1);
