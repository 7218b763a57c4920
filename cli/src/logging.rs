//! Logging installs the global tracing subscriber: human-readable output
//! to a terminal, structured JSON when stdout is redirected, filtered by
//! `TAILOR_LOG` (defaulting to `info`).
use is_terminal::IsTerminal;
use tracing_subscriber::{filter::EnvFilter, prelude::*};

/// Init installs the global subscriber. Must be called at most once, as
/// early in `main` as possible.
pub fn init() -> crate::Result<()> {
    let env_filter = match std::env::var("TAILOR_LOG") {
        Ok(directives) => EnvFilter::try_new(directives)?,
        Err(_) => EnvFilter::try_new("info")?,
    };
    let terminal = std::io::stderr().is_terminal();
    let collector = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(if terminal {
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        } else {
            None
        })
        .with(if terminal {
            None
        } else {
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        });
    tracing::subscriber::set_global_default(collector)?;
    Ok(())
}
