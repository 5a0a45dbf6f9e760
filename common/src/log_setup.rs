use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `base_level`
/// (e.g. `"info"` or `"bleach=debug"`). Events go to stdout; WARN and above
/// are mirrored to stderr.
///
/// ```no_run
/// common::log_setup::setup_logging("bleach=debug,info");
/// tracing::info!("Logging ready");
/// ```
pub fn setup_logging(base_level: &str) {
    console_subscriber(base_level)
        .unwrap_or_else(|e| panic!("Invalid log filter: {}", e))
        .try_init()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));
}

fn console_subscriber(base_level: &str) -> Result<impl Subscriber + Send + Sync, ParseError> {
    let env_filter = env_filter(base_level)?;

    let console_writer = std::io::stdout.and(std::io::stderr.with_max_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .with_writer(console_writer);

    Ok(tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer))
}

/// Idempotent subscriber for tests. Output is captured by the test harness.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter = env_filter("debug").unwrap_or_else(|_| EnvFilter::new("debug"));

        // Another test binary component may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// `RUST_LOG` when set, otherwise `base_level`.
fn env_filter(base_level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(base_level))
}
