use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceLock<()> = OnceLock::new();

const LOG_FILE: &str = "slots.log";

/// Sends events to stderr and to a daily rolling `<root>/log/slots.log`.
/// `RUST_LOG` wins over `level` when set. Later calls are no-ops.
pub fn init(root: &Path, level: &str) -> Result<(), String> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|err| format!("invalid log level '{}': {}", level, err))?,
    };
    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .try_init()
        .map_err(|err| format!("log system init failed: {}", err))?;
    let _ = INITIALIZED.set(());
    Ok(())
}
