use std::sync::OnceLock;

use tracing::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;
use crate::utils::TERMINAL_STDERR;

struct LockingTerminalStderr;
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LockingTerminalStderr {
    type Writer = LockingTerminalStderr;

    fn make_writer(&'a self) -> Self::Writer {
        LockingTerminalStderr
    }
}

impl std::io::Write for LockingTerminalStderr {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.flush()?
        }
        Ok(())
    }
}

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// The filter directive used for a verbosity level.
///
/// Library crates only log from `-v` on.
pub(crate) fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "off,characters=error",
        Verbosity::Verbose(0) => "off,characters=warn",
        Verbosity::Verbose(1) => "off,characters=info,character_sdk=info",
        Verbosity::Verbose(2) => "off,characters=debug,character_sdk=debug,character_api=debug",
        Verbosity::Verbose(3) => "off,characters=trace,character_sdk=trace,character_api=trace",
        Verbosity::Verbose(_) => "trace",
    }
}

/// Install the global subscriber on first use, then update its filter.
///
/// `RUST_LOG` takes precedence over `verbosity` when set.
pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let log_filter = log_filter(verbosity.unwrap_or_default());

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (subscriber, reload_handle) = create_registry_and_filter_reload_handle();
        subscriber.init();
        reload_handle
    });

    update_filters(filter_handle, log_filter);
}

pub fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

pub fn create_registry_and_filter_reload_handle() -> (
    impl tracing_subscriber::layer::SubscriberExt,
    Handle<EnvFilter, Registry>,
) {
    debug!("Initializing logger");
    // Start permissive, the actual level is set through the reload handle.
    let filter = EnvFilter::new("trace");
    let (filter, filter_reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(LockingTerminalStderr)
        .event_format(tracing_subscriber::fmt::format())
        .with_filter(filter);
    let registry = tracing_subscriber::registry().with(log_layer);

    (registry, filter_reload_handle)
}
