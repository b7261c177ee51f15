//! Diagnostic logging.
//!
//! The terminal belongs to the renderer, so log output only ever goes to a
//! file. Without one no subscriber is installed and `tracing` macros are
//! effectively free.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "info"
    } else {
        "warn"
    }
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)))
}

/// Installs a file-backed subscriber. `RUST_LOG` overrides the level.
///
/// Returns `Ok(false)` when there is no log file or a subscriber was already
/// installed by someone else.
pub fn init(log_file: Option<&Path>, debug: bool) -> io::Result<bool> {
    let Some(path) = log_file else {
        return Ok(false);
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    Ok(installed)
}
