//! Process logging for symdex binaries and embedders.

use crate::config::{IndexConfig, symdex_home};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target of the container dumps emitted when `IndexConfig::trace` is on.
pub const TRACE_TARGET: &str = "symdex::trace";

pub fn log_dir() -> PathBuf {
    symdex_home().join("logs")
}

/// Filter used when `RUST_LOG` is unset. Trace dumps are logged at `debug`,
/// so the trace flag has to lift their target explicitly.
pub fn default_directives(config: &IndexConfig) -> String {
    if config.trace {
        format!("info,{}=debug", TRACE_TARGET)
    } else {
        "info".to_string()
    }
}

/// Install the global subscriber: a daily file `<component>.<date>` under
/// [`log_dir`], plus stderr when asked. Keep the guard alive for the
/// lifetime of the process or buffered lines are lost.
pub fn init_logging(component: &str, config: &IndexConfig, to_stderr: bool) -> WorkerGuard {
    let dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Cannot create log directory {}: {}", dir.display(), e);
    }

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, component));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let stderr = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(stderr)
        .init();

    guard
}
