//! Tracing subscriber setup.
//!
//! Filter precedence: an explicit filter (`--log-level` or the config file),
//! then `RUST_LOG`, then `warn`. Output goes to stderr so stdout stays clean
//! for rendered documents.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

pub fn filter_for(explicit: Option<&str>) -> EnvFilter {
    let fallback = || EnvFilter::new(Config::default_log_filter());
    match explicit {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|err| {
            eprintln!("Warning: invalid log filter {directives:?}: {err}");
            fallback()
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
    }
}

pub fn init(explicit: Option<&str>) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter_for(explicit));

    tracing_subscriber::registry().with(console_layer).init();
}
