//! Tracing setup for the `atlas` binary.
//!
//! Log lines go to stderr so command summaries on stdout stay parseable.
//! Verbosity follows `RUST_LOG`; the default keeps sqlx and the browser
//! protocol quiet.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,sqlx=warn,chromiumoxide=warn";

pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
