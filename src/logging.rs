//! Tracing setup. The terminal belongs to the UI, so log lines only ever go to a file.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber writing to `path`. `RUST_LOG` overrides `default_level`.
/// Without a path nothing is installed and every event is dropped.
///
/// Call once, before the runtime starts.
pub fn init(path: Option<&Path>, default_level: &str) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .init();
    tracing::info!(path = %path.display(), level = default_level, "logging initialized");
    Ok(())
}
