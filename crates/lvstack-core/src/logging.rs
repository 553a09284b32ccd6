//! Process-wide logger setup shared by lvstack binaries.

use std::env;
use std::sync::Once;

pub const LOG_ENV: &str = "LVSTACK_LOG";

static INIT: Once = Once::new();

/// Install `env_logger` once, honouring `LVSTACK_LOG`, then `RUST_LOG`, then `default_level`.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = resolve_filter(default_level);
        let _ = env_logger::Builder::new()
            .parse_filters(&filter)
            .format_target(false)
            .try_init();
    });
}

fn resolve_filter(default_level: &str) -> String {
    [LOG_ENV, "RUST_LOG"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default_level.to_string())
}
