use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
///
/// Falls back to in-memory defaults when `init_config()` has not been
/// called yet (e.g. in unit tests).
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Get the configuration only if it has been initialized
pub fn try_get_config() -> Option<Arc<StaticConfig>> {
    CONFIG.get().map(|c| c.load_full())
}

/// Initialize the global configuration from "config.toml"
///
/// If the file doesn't exist, uses in-memory defaults plus environment
/// overrides.
///
/// # Examples
/// ```no_run
/// use quickslug::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_from_path("config.toml");
}

/// Initialize the global configuration from a specific TOML path
///
/// A second call is a no-op; the first loaded configuration wins.
pub fn init_config_from_path(path: &str) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load_from(path)));
}
