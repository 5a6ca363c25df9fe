//! Logging setup using tracing

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable holding the log filter, e.g. `LED_ARBITER_LOG=debug`.
pub const LOG_ENV: &str = "LED_ARBITER_LOG";

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Install the global subscriber.
///
/// Logs go to stderr, or to a daily rolling `led-arbiter.log` under `log_dir`
/// when one is given (stdout is reserved for the indicator lines).
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let timer = fmt::time::ChronoLocal::new(TIME_FORMAT.to_string());

    let res = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "led-arbiter.log");
            registry
                .with(
                    fmt::layer()
                        .with_writer(file_appender)
                        .with_ansi(false)
                        .with_target(true)
                        .with_timer(timer),
                )
                .try_init()
        }
        None => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(timer),
            )
            .try_init(),
    };
    res.map_err(|e| Error::Logging(e.to_string()))?;

    if let Some(dir) = log_dir {
        tracing::info!("Log directory: {}", dir.display());
    }
    Ok(())
}
