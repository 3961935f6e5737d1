//! Common types used throughout AiDock

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Session-data key holding the URL a page showed before it was suspended
pub const LAST_URL_KEY: &str = "_last_url";

/// Inert page shown by suspended renderers
pub const BLANK_URL: &str = "about:blank";

/// Opaque identifier for a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Window placement in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 120,
            y: 120,
            width: 1100,
            height: 760,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageState {
    Inactive,
    Active,
    Minimized,
    Hidden,
    Loading,
    Error,
}

/// How a page is brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageKind {
    /// Shown and focused once created
    #[default]
    Foreground,
    /// Created without stealing focus (session restore)
    Background,
}

/// One logical AI-platform session, backed by one renderer instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub platform_id: String,
    pub state: PageState,
    pub geometry: Geometry,
    pub created_at: u64,
    pub last_active_at: Option<u64>,
    pub url: String,
    pub title: Option<String>,
    pub session_data: HashMap<String, String>,
}

impl Page {
    pub fn is_active(&self) -> bool {
        self.state == PageState::Active
    }

    /// URL captured when the page was last suspended
    pub fn last_url(&self) -> Option<&str> {
        self.session_data.get(LAST_URL_KEY).map(String::as_str)
    }
}

/// Modifier bitset, using the macOS event flag layout so persisted values
/// stay compatible with the native key tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(1 << 17);
    pub const CONTROL: Self = Self(1 << 18);
    pub const OPTION: Self = Self(1 << 19);
    pub const COMMAND: Self = Self(1 << 20);

    /// Bits that count as a real modifier for hotkey purposes
    pub const DEVICE_INDEPENDENT: Self =
        Self(Self::SHIFT.0 | Self::CONTROL.0 | Self::OPTION.0 | Self::COMMAND.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn has_any(self) -> bool {
        self.0 & Self::DEVICE_INDEPENDENT.0 != 0
    }

    /// Strip caps-lock, numeric-pad and other non-modifier bits
    pub fn normalized(self) -> Self {
        Self(self.0 & Self::DEVICE_INDEPENDENT.0)
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::CONTROL, "Ctrl"),
            (Self::OPTION, "Option"),
            (Self::SHIFT, "Shift"),
            (Self::COMMAND, "Cmd"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&parts.join("+"))
    }
}

/// Virtual key codes (macOS layout) used by the default bindings
pub mod keys {
    pub const TAB: u16 = 48;
    pub const SPACE: u16 = 49;
    pub const GRAVE: u16 = 50;
    pub const ESCAPE: u16 = 53;
}

/// A fully specified hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    #[serde(rename = "flags")]
    pub modifiers: Modifiers,
    #[serde(rename = "key")]
    pub key_code: u16,
}

impl KeyCombo {
    pub fn new(modifiers: Modifiers, key_code: u16) -> Self {
        Self {
            modifiers,
            key_code,
        }
    }

    /// True when `pressed` holds at least this combo's modifiers on the same key
    pub fn matches(&self, pressed: Modifiers, key_code: u16) -> bool {
        pressed.contains(self.modifiers) && key_code == self.key_code
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+key{}", self.modifiers, self.key_code)
    }
}

/// Time source in whole seconds since the Unix epoch
pub trait Clock {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0)
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn advance(&self, secs: u64) {
        self.0.set(self.0.get().saturating_add(secs));
    }

    pub fn set(&self, secs: u64) {
        self.0.set(secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.0.get()
    }
}
