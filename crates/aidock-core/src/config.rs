//! Persisted configuration
//!
//! Two files live in the config directory: `config.json` with everything the
//! settings UI edits, and `launcher_hotkey.json` with the show/hide binding.
//! Loading is lenient: a missing or corrupt file yields defaults.

use crate::error::{AiDockError, AiDockResult};
use crate::types::{keys, KeyCombo, Modifiers, PageId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const LAUNCHER_FILE: &str = "launcher_hotkey.json";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "AIDOCK_CONFIG_DIR";

/// Persisted record of one open page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspendConfig {
    /// Idle minutes before a background page is suspended. Zero or less
    /// never suspends.
    pub minutes: i64,
}

impl Default for SuspendConfig {
    fn default() -> Self {
        Self { minutes: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationConfig {
    /// Extra domains any page may navigate to
    pub allow_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeysConfig {
    /// Page-cycle binding; `null` while awaiting capture
    pub switcher: Option<KeyCombo>,
}

impl Default for HotkeysConfig {
    fn default() -> Self {
        Self {
            switcher: Some(KeyCombo::new(Modifiers::CONTROL, keys::TAB)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitsConfig {
    pub max_per_platform: Option<usize>,
    pub max_total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvisoryConfig {
    /// Open-page count above which the "too many pages" toast fires
    pub page_threshold: usize,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self { page_threshold: 4 }
    }
}

/// Application configuration (`config.json`)
///
/// Deserialization goes section by section: a section with a bad value
/// keeps its default while the rest of the file still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub enabled_platforms: Vec<String>,
    pub default_platform: Option<String>,
    /// platform id → page id → record
    pub windows: BTreeMap<String, BTreeMap<String, WindowRecord>>,
    pub suspend: SuspendConfig,
    pub navigation: NavigationConfig,
    pub hotkeys: HotkeysConfig,
    pub limits: LimitsConfig,
    pub advisory: AdvisoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled_platforms: vec![
                "chatgpt".to_string(),
                "claude".to_string(),
                "gemini".to_string(),
            ],
            default_platform: Some("chatgpt".to_string()),
            windows: BTreeMap::new(),
            suspend: SuspendConfig::default(),
            navigation: NavigationConfig::default(),
            hotkeys: HotkeysConfig::default(),
            limits: LimitsConfig::default(),
            advisory: AdvisoryConfig::default(),
        }
    }
}

impl<'de> Deserialize<'de> for AppConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(fields))
    }
}

fn section<T: DeserializeOwned>(value: Value, slot: &mut T) -> serde_json::Result<()> {
    *slot = serde_json::from_value(value)?;
    Ok(())
}

impl AppConfig {
    /// Build a config from the top-level object of `config.json`
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let mut config = Self::default();
        for (key, value) in fields {
            let applied = match key.as_str() {
                "enabledPlatforms" => section(value, &mut config.enabled_platforms),
                "defaultPlatform" => section(value, &mut config.default_platform),
                "windows" => section(value, &mut config.windows),
                "suspend" => section(value, &mut config.suspend),
                "navigation" => section(value, &mut config.navigation),
                "hotkeys" => section(value, &mut config.hotkeys),
                "limits" => section(value, &mut config.limits),
                "advisory" => section(value, &mut config.advisory),
                _ => {
                    log::debug!("Ignoring unknown config key {}", key);
                    Ok(())
                }
            };
            if let Err(err) = applied {
                log::warn!("Config section {} is invalid ({}); using its defaults", key, err);
            }
        }
        config
    }

    pub fn is_enabled(&self, platform_id: &str) -> bool {
        self.enabled_platforms.iter().any(|p| p == platform_id)
    }

    /// Returns false if the platform was already enabled
    pub fn enable_platform(&mut self, platform_id: &str) -> bool {
        if self.is_enabled(platform_id) {
            return false;
        }
        self.enabled_platforms.push(platform_id.to_string());
        true
    }

    /// Disables the platform and drops its persisted pages
    pub fn disable_platform(&mut self, platform_id: &str) -> bool {
        let before = self.enabled_platforms.len();
        self.enabled_platforms.retain(|p| p != platform_id);
        self.windows.remove(platform_id);
        if self.default_platform.as_deref() == Some(platform_id) {
            self.default_platform = self.enabled_platforms.first().cloned();
        }
        before != self.enabled_platforms.len()
    }

    pub fn record_window(&mut self, platform_id: &str, page_id: &PageId, created_at: u64) {
        self.windows
            .entry(platform_id.to_string())
            .or_default()
            .insert(page_id.0.clone(), WindowRecord { created_at });
    }

    pub fn forget_window(&mut self, platform_id: &str, page_id: &PageId) {
        if let Some(pages) = self.windows.get_mut(platform_id) {
            pages.remove(page_id.as_str());
            if pages.is_empty() {
                self.windows.remove(platform_id);
            }
        }
    }

    /// Persisted pages of enabled platforms, in platform order then creation order
    pub fn persisted_windows(&self) -> Vec<(String, PageId, u64)> {
        let mut out = Vec::new();
        for platform in &self.enabled_platforms {
            let Some(pages) = self.windows.get(platform) else {
                continue;
            };
            let mut entries: Vec<(String, PageId, u64)> = pages
                .iter()
                .map(|(id, record)| (platform.clone(), PageId(id.clone()), record.created_at))
                .collect();
            entries.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.1.cmp(&b.1)));
            out.extend(entries);
        }
        out
    }
}

/// Launcher binding file (`launcher_hotkey.json`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LauncherConfig {
    pub binding: Option<KeyCombo>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            binding: Some(KeyCombo::new(Modifiers::OPTION, keys::SPACE)),
        }
    }
}

/// Reads and writes the config files in one directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$AIDOCK_CONFIG_DIR`, else the platform config dir
    pub fn from_env() -> Self {
        let dir = std::env::var_os(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_config_dir);
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn launcher_path(&self) -> PathBuf {
        self.dir.join(LAUNCHER_FILE)
    }

    /// Load `config.json`, falling back to defaults on any failure
    pub fn load_config(&self) -> AppConfig {
        load_or_default(&self.config_path())
    }

    pub fn save_config(&self, config: &AppConfig) -> AiDockResult<()> {
        self.write_json(&self.config_path(), config)
    }

    pub fn load_launcher(&self) -> LauncherConfig {
        load_or_default(&self.launcher_path())
    }

    pub fn save_launcher(&self, launcher: &LauncherConfig) -> AiDockResult<()> {
        self.write_json(&self.launcher_path(), launcher)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> AiDockResult<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(value)?;
        fs::write(path, data)?;
        log::debug!("Saved {}", path.display());
        Ok(())
    }
}

/// Strict read: `Ok(None)` when the file does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AiDockResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| AiDockError::corrupt(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| AiDockError::corrupt(format!("{}: {}", path.display(), e)))
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            log::warn!("{}; using defaults", err);
            T::default()
        }
    }
}

fn default_config_dir() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("aidock");
    }

    PathBuf::from(".aidock")
}
