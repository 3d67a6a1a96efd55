//! Centralised tracing initialisation for the `rlloop` binary.
//!
//! Call [`init_tracing`] once at program start to configure the global
//! subscriber with an `EnvFilter`, optional JSON formatting and an optional
//! log file that always captures debug output.
//!
//! Subsequent calls are ignored (the global subscriber can only be set once
//! per process).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialise the global tracing subscriber.
///
/// * `json`: when `true`, emit newline-delimited JSON on stderr.
/// * `level`: default console verbosity when `RUST_LOG` is not set.
/// * `log_file`: when set, also append DEBUG-and-above lines to this file.
///
/// Fails only if the log file cannot be opened.
pub fn init_tracing(json: bool, level: Level, log_file: Option<&Path>) -> std::io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let console = if json {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .ok();
    Ok(())
}
