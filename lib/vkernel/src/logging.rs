//! Logging set up for hosts embedding the kernel.

use std::io::IsTerminal;

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Initialize logging based on the `$RUST_LOG` environment variable. Only
/// errors are logged when `$RUST_LOG` isn't set.
///
/// Logs go to stderr so they never mix with what programs write to the
/// emulated terminal.
///
/// ```no_run
/// vkernel::logging::set_up_logging();
/// tracing::info!("booting");
/// ```
pub fn set_up_logging() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_ansi(should_emit_colors())
        .with_writer(std::io::stderr)
        .compact();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let filter_layer = env_filter(&directives);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// `directives` in `$RUST_LOG` syntax on top of an `error` default. Invalid
/// directives are skipped.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(directives)
}

/// Check whether we should emit ANSI escape codes for log formatting.
fn should_emit_colors() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}
