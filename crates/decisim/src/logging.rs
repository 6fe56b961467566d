use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "decisim.log";

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("decisim={level},decisim_core=warn")
}

/// Initialize logging.
///
/// Without a directory, logs go to stderr so stdout stays clean for the JSON
/// report. With a directory, logs are appended to `{log_dir}/decisim.log`
/// through a non-blocking writer; keep the returned guard alive until exit
/// so buffered lines are flushed. `RUST_LOG` overrides `level`.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> color_eyre::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = file_layer.is_none().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    match log_dir {
        Some(dir) => tracing::info!(
            "decisim logging initialized (log_path={})",
            dir.join(LOG_FILE_NAME).display()
        ),
        None => tracing::debug!("decisim logging initialized (stderr)"),
    }
    Ok(guard)
}
