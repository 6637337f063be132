use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::error::Result;

/// Install the global tracing subscriber, writing to `log_file`.
///
/// The terminal belongs to the UI, so nothing is logged to stdout. Verbosity
/// follows `RUST_LOG`, defaulting to INFO. Calling this twice is harmless.
pub fn init(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let _ = tracing_subscriber::fmt()
        // Filter messages based on the INFO level
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();

    Ok(())
}
