//! Usage: tracing-subscriber setup for host processes embedding the linked-role handlers.

use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "info,linked_role_gate=debug";

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over `default_filter`.
/// Returns `false` when a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init(DEFAULT_LOG_FILTER);
        assert!(!init(DEFAULT_LOG_FILTER));
    }
}
