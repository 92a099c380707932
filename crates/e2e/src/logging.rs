//! Tracing setup for test binaries

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG` plus `default_directive`.
///
/// Returns `false` if a global subscriber was already installed, which is
/// normal when several tests in one binary call this.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = match default_directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt().with_env_filter(filter).with_test_writer().try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("plantshop_e2e=debug");
        assert!(!init_tracing("info"));
    }
}
