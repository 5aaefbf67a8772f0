//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Install a panic hook that records the panic site's backtrace
//!
//! # Design Decisions
//! - `RUST_LOG` wins; the configured level is only the default
//! - The panic hook logs through tracing so faults land in the same
//!   stream as the access log; the dispatcher separately recovers the
//!   request and substitutes a clean 500

use std::backtrace::Backtrace;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `log_level` applies to the portal's own targets when `RUST_LOG` is not
/// set.
pub fn init(log_level: &str) {
    let default_filter = format!("contest_portal={log_level},tower_http=debug");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log panics (with the panicking stack) instead of writing to stderr.
///
/// The hook runs at the panic site, before unwinding, which is the only
/// place the faulting stack is still observable.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(panic = %info, %backtrace, "panic");
    }));
}
