//! Tracing subscriber setup for binaries and examples.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a global tracing subscriber with an env-filter directive.
///
/// Safe to call more than once; subsequent calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("info");
        init_tracing("debug");
    }
}
