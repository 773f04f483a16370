//! Tracing bootstrap for pipeline runs.
//!
//! Stage progress, cache hits and per-pair failures are emitted as
//! `tracing` events under the `pipeline` and `driver` targets. Verbosity
//! comes from the `[logging]` settings section (a default level plus
//! per-target overrides), and a `RUST_LOG` environment variable, when
//! present, replaces the configured levels wholesale. Timestamps are
//! printed as uptime since process start, which is what matters when
//! comparing stage durations within a run.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::uptime;

/// Translate the `[logging]` settings into an event filter.
///
/// `RUST_LOG` wins outright when set; otherwise the configured default
/// level is extended with one directive per `[logging.modules]` entry.
/// Unparsable overrides are reported on stderr and skipped rather than
/// taking the whole run down.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(spec) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return EnvFilter::new(spec);
    }

    let mut filter = EnvFilter::new(&config.default);
    for (target, level) in &config.modules {
        match format!("{target}={level}").parse::<Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log override '{target} = {level}': {e}"),
        }
    }
    filter
}

/// Install the global subscriber for this process.
///
/// Calling this more than once is harmless: later calls find the
/// subscriber already set and leave it in place.
pub fn init(config: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_timer(uptime())
        .with_target(true)
        .try_init();
}
