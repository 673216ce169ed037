//! Subscriber setup for the binaries
//!
//! The library only emits `tracing` events. Executables call [`init`] once;
//! `RUST_LOG` still overrides the configured level per target.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Default directive when the configured level cannot be parsed
const FALLBACK_DIRECTIVE: &str = "ghalib_driver=info";

/// Build the filter: `RUST_LOG` first, then `ghalib_driver=<level>`
pub fn env_filter(level: &str) -> EnvFilter {
    let directive: Result<Directive, _> = format!("ghalib_driver={}", level)
        .parse()
        .or_else(|_| FALLBACK_DIRECTIVE.parse());

    let filter = EnvFilter::from_default_env();
    match directive {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install the global fmt subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_thread_names(true)
        .try_init();
}
