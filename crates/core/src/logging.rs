use crate::config::CompileConf;
use crate::error::{CompileError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: a daily-rolling file under the
/// configured log dir plus, optionally, colored stderr output.
///
/// Keep the returned guard alive for as long as logs should be flushed.
/// Fails if a global subscriber is already installed.
pub fn init_logging(component: &str, to_stderr: bool, conf: &CompileConf) -> Result<WorkerGuard> {
    let log_dir = conf.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    // files like bhlc.log.2024-01-21
    let file_appender = tracing_appender::rolling::daily(&log_dir, component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(conf.log_filter()));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let installed = if to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);
        registry.with(stderr_layer).try_init()
    } else {
        registry.try_init()
    };
    installed.map_err(|e| CompileError::Internal(format!("logging already initialized: {e}")))?;

    Ok(guard)
}
