//! AiDock Core Library
//!
//! This crate provides shared types, errors, configuration, logging and the
//! platform catalog for AiDock.

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod types;

pub use config::{AppConfig, ConfigStore, LauncherConfig};
pub use error::{AiDockError, AiDockResult};
pub use platform::{Platform, PlatformCatalog};
