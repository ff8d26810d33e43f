use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{runtime_paths::RuntimePaths, DEFAULT_LOG_FILTER, LOG_FILTER_ENV};

/// Install the global subscriber: stderr plus an append-only desktop log.
///
/// The file layer is skipped, with a note on stderr, when the log cannot be
/// opened. Returns whether the file layer is active.
pub(crate) fn init_logging(paths: &RuntimePaths) -> bool {
    let desktop_log = paths.desktop_log();
    let log_file = match open_log_file(&desktop_log) {
        Ok(file) => Some(file),
        Err(error) => {
            eprintln!(
                "failed to open desktop log {}: {error}",
                desktop_log.display()
            );
            None
        }
    };
    let file_enabled = log_file.is_some();

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file))
    });

    let installed = tracing_subscriber::registry()
        .with(build_filter(std::env::var(LOG_FILTER_ENV).ok().as_deref()))
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init();
    if let Err(error) = installed {
        eprintln!("tracing subscriber already installed: {error}");
    }

    file_enabled
}

fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
