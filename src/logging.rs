use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Route tracing output to a daily-rolling file under `dir`; the terminal
/// belongs to the UI. `RUST_LOG` overrides `default_filter` when set.
///
/// Keep the returned guard alive for the life of the program or buffered
/// lines are lost on exit.
pub fn init(dir: &Path, default_filter: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, "studyquest.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging already initialised: {err}"))?;

    Ok(guard)
}
