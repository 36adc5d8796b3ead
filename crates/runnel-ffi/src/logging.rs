//! Optional file logging for hosts that cannot see stderr.
//!
//! When `RUNNEL_LOG` holds an `EnvFilter` directive string (`info`,
//! `runnel_bridge=debug,runnel_engine=trace`), the first C call installs a
//! plain-text `fmt` subscriber appending to `RUNNEL_LOG_FILE`, or
//! `runnel_bridge.log` in the working directory. Nothing is installed
//! when the variable is unset, the directives do not parse, the file
//! cannot be opened, or the host already owns the global subscriber.

use std::fs::OpenOptions;
use std::sync::{Mutex, Once};

use tracing_subscriber::EnvFilter;

/// Filter directives; logging is off when unset.
pub(crate) const ENV_LOG: &str = "RUNNEL_LOG";
/// Log file path.
pub(crate) const ENV_LOG_FILE: &str = "RUNNEL_LOG_FILE";
/// Log file used when `RUNNEL_LOG_FILE` is unset.
pub(crate) const DEFAULT_LOG_FILE: &str = "runnel_bridge.log";

static INIT: Once = Once::new();

/// Install the subscriber once per process.
pub(crate) fn init() {
    INIT.call_once(|| {
        let directives = std::env::var(ENV_LOG).ok();
        let path = std::env::var(ENV_LOG_FILE).ok();
        let _ = install(directives.as_deref(), path.as_deref());
    });
}

type InstallError = Box<dyn std::error::Error + Send + Sync>;

fn install(directives: Option<&str>, path: Option<&str>) -> Result<(), InstallError> {
    let Some(directives) = directives.filter(|d| !d.trim().is_empty()) else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(directives)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.unwrap_or(DEFAULT_LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "runnel bridge logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_directives_install_nothing() {
        assert!(install(None, None).is_ok());
        assert!(install(Some("  "), None).is_ok());
    }

    #[test]
    fn bad_directives_are_reported() {
        assert!(install(Some("runnel=notalevel"), None).is_err());
    }

    #[test]
    fn directory_as_log_file_is_reported() {
        let dir = std::env::temp_dir();
        assert!(install(Some("info"), Some(dir.to_str().unwrap())).is_err());
    }
}
