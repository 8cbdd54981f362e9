//! CLI command handlers
//!
//! Each submodule handles one CLI subcommand.

mod impact;
mod run;

pub(crate) use impact::cmd_impact;
pub(crate) use run::{cmd_run, RunArgs};

use affected::{Level, Notice, Notifier, SessionError};

/// Show an input error the way the session shows its errors.
fn notify_invalid(notifier: &dyn Notifier, error: &SessionError) {
    notifier.notify(&Notice {
        level: Level::Error,
        title: error.title().to_string(),
        body: affected::error::INVALID_DEPTH_MESSAGE.to_string(),
    });
}
