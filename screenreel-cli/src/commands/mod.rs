//! CLI command implementations

mod config;
mod info;
mod list;
mod record;

pub use config::{config, ConfigArgs};
pub use info::info;
pub use list::{list, ListArgs};
pub use record::{record, RecordArgs};

use anyhow::{Context, Result};
use screenreel_core::{ConfigFile, ScreenreelError, SessionConfig};

/// Build the runtime configuration, printing a hint when it is invalid
fn session_config(file: &ConfigFile) -> Result<SessionConfig> {
    file.to_session_config()
        .map_err(with_hint)
        .context("Invalid configuration")
}

/// Attach the error's user hint, if it has one
fn with_hint(err: ScreenreelError) -> anyhow::Error {
    match err.user_hint() {
        Some(hint) => anyhow::anyhow!("{}\n  hint: {}", err, hint),
        None => err.into(),
    }
}
