//! AiDock - a desktop shell that keeps AI chat services one hotkey away
//!
//! Without the `webview` feature the app runs headless, driven by JSON lines
//! on stdin.

mod events;
mod input;
#[cfg_attr(feature = "webview", allow(dead_code))]
mod headless;
#[cfg(feature = "webview")]
mod webview;

use aidock_core::logging::{init_logging, LogConfig, LogFormat};
use aidock_core::ConfigStore;
use tracing::{info, warn};

/// `pretty`, `compact` or `json`
const LOG_FORMAT_ENV: &str = "AIDOCK_LOG_FORMAT";
/// Filter directives; overrides `RUST_LOG`
const LOG_FILTER_ENV: &str = "AIDOCK_LOG";

fn log_config() -> LogConfig {
    let mut config = if cfg!(debug_assertions) {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if let Some(format) = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|value| LogFormat::parse(&value))
    {
        config = config.with_format(format);
    }
    if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
        config = config.with_filter(filter);
    }
    config
}

fn main() -> anyhow::Result<()> {
    init_logging(log_config())?;
    info!("Starting AiDock...");

    let store = ConfigStore::from_env();
    info!("Config directory: {}", store.dir().display());
    let config = store.load_config();
    let launcher = store.load_launcher();
    if launcher.binding.is_none() {
        warn!("No launcher hotkey bound; the window cannot be summoned once hidden");
    }

    #[cfg(feature = "webview")]
    {
        webview::run(store, config, launcher)
    }
    #[cfg(not(feature = "webview"))]
    {
        headless::run(store, config, launcher)
    }
}
