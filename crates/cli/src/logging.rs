//! Tracing setup: a plain-text log file per workspace plus stderr.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::CliError;

/// Filter env var; defaults to `info` for the grader crates.
pub const LOG_ENV: &str = "WFGRADE_LOG";

/// Log to `<save_dir>/<workspace name>.log`, and to stderr unless `quiet`.
pub fn init(save_dir: &Path, workspace: &Path, quiet: bool) -> Result<(), CliError> {
    let name = workspace
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wfgrade".into());
    let log_path = save_dir.join(format!("{name}.log"));
    let file = File::create(&log_path)
        .map_err(|e| CliError::io(format!("cannot create log file {}: {e}", log_path.display())))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = (!quiet).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
    });

    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("wfgrade_recon=info,wfgrade_io=info,wfgrade=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CliError::io(format!("cannot initialise logging: {e}")))
}
