use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter when `--log-level` is absent.
pub(crate) const LOG_ENV: &str = "SARIF_TO_SLACK_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the stderr log subscriber. Later calls are no-ops.
pub(crate) fn init_logging(level: Option<&str>) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = build_filter(level, std::env::var(LOG_ENV).ok().as_deref());
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init();
    });
}

fn build_filter(level: Option<&str>, env_level: Option<&str>) -> EnvFilter {
    let directives = level
        .or(env_level)
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("ignoring invalid log filter {directives:?}: {err}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Run a closure inside a named phase span.
pub(crate) fn with_span<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    tracing::info_span!("phase", phase = name).in_scope(f)
}
