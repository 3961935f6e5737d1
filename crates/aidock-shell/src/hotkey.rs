//! Global hotkey dispatch
//!
//! The dispatcher runs inside the OS key-tap context. It only matches events
//! against the bindings and reports what should happen; acting on the result
//! is left to the main loop.

use aidock_core::types::{keys, KeyCombo, Modifiers};
use aidock_core::LauncherConfig;
use std::time::{Duration, Instant};

/// How long the tap ignores input after entering capture mode
pub const CAPTURE_PAUSE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyRole {
    /// Show/hide the window
    Launcher,
    /// Cycle the active page
    Switcher,
}

/// The two bindings; `None` means awaiting capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HotkeyBindings {
    pub launcher: Option<KeyCombo>,
    pub switcher: Option<KeyCombo>,
}

impl HotkeyBindings {
    pub fn new(launcher: Option<KeyCombo>, switcher: Option<KeyCombo>) -> Self {
        Self { launcher, switcher }
    }

    pub fn from_config(launcher: &LauncherConfig, switcher: Option<KeyCombo>) -> Self {
        Self::new(launcher.binding, switcher)
    }

    pub fn get(&self, role: HotkeyRole) -> Option<KeyCombo> {
        match role {
            HotkeyRole::Launcher => self.launcher,
            HotkeyRole::Switcher => self.switcher,
        }
    }

    pub fn set(&mut self, role: HotkeyRole, combo: Option<KeyCombo>) {
        match role {
            HotkeyRole::Launcher => self.launcher = combo,
            HotkeyRole::Switcher => self.switcher = combo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// Raw event delivered by the global key tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub modifiers: Modifiers,
    pub key_code: u16,
}

impl KeyEvent {
    pub fn down(modifiers: Modifiers, key_code: u16) -> Self {
        Self {
            kind: KeyEventKind::Down,
            modifiers,
            key_code,
        }
    }

    pub fn up(modifiers: Modifiers, key_code: u16) -> Self {
        Self {
            kind: KeyEventKind::Up,
            modifiers,
            key_code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleVisibility,
    CyclePage,
    /// Capture finished; the new binding should be persisted
    Captured { role: HotkeyRole, combo: KeyCombo },
    /// Capture cancelled; the previous binding is back in place
    CaptureCancelled { role: HotkeyRole },
}

/// Outcome of feeding one event to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not ours; let the event through
    PassThrough,
    /// Consumed without an action
    Swallow,
    /// Consumed; the main loop should perform the action
    Fire(HotkeyAction),
}

impl Dispatch {
    pub fn action(self) -> Option<HotkeyAction> {
        match self {
            Self::Fire(action) => Some(action),
            Self::PassThrough | Self::Swallow => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Capture {
    role: HotkeyRole,
    previous: Option<KeyCombo>,
    resume_at: Instant,
}

pub struct HotkeyDispatcher {
    bindings: HotkeyBindings,
    latched: bool,
    app_visible: bool,
    capture: Option<Capture>,
    capture_pause: Duration,
}

impl HotkeyDispatcher {
    pub fn new(bindings: HotkeyBindings) -> Self {
        Self {
            bindings,
            latched: false,
            app_visible: false,
            capture: None,
            capture_pause: CAPTURE_PAUSE,
        }
    }

    pub fn with_capture_pause(mut self, pause: Duration) -> Self {
        self.capture_pause = pause;
        self
    }

    pub fn bindings(&self) -> HotkeyBindings {
        self.bindings
    }

    pub fn set_app_visible(&mut self, visible: bool) {
        self.app_visible = visible;
    }

    pub fn is_app_visible(&self) -> bool {
        self.app_visible
    }

    pub fn capturing(&self) -> Option<HotkeyRole> {
        self.capture.map(|c| c.role)
    }

    /// Enter capture mode for `role`. The binding is cleared so normal
    /// dispatch ignores it, and the tap pauses briefly.
    pub fn begin_capture(&mut self, role: HotkeyRole) -> bool {
        self.begin_capture_at(role, Instant::now())
    }

    pub fn begin_capture_at(&mut self, role: HotkeyRole, now: Instant) -> bool {
        if self.capture.is_some() {
            return false;
        }

        let previous = self.bindings.get(role);
        self.bindings.set(role, None);
        self.capture = Some(Capture {
            role,
            previous,
            resume_at: now + self.capture_pause,
        });
        log::info!("Capturing new {:?} hotkey", role);
        true
    }

    /// Abort capture and restore the previous binding verbatim
    pub fn cancel_capture(&mut self) -> Option<HotkeyAction> {
        let capture = self.capture.take()?;
        self.bindings.set(capture.role, capture.previous);
        log::info!("{:?} hotkey capture cancelled", capture.role);
        Some(HotkeyAction::CaptureCancelled { role: capture.role })
    }

    pub fn on_key_event(&mut self, event: KeyEvent) -> Dispatch {
        self.on_key_event_at(event, Instant::now())
    }

    pub fn on_key_event_at(&mut self, event: KeyEvent, now: Instant) -> Dispatch {
        match event.kind {
            KeyEventKind::Up => {
                self.latched = false;
                Dispatch::PassThrough
            }
            KeyEventKind::Down => self.on_key_down(event, now),
        }
    }

    fn on_key_down(&mut self, event: KeyEvent, now: Instant) -> Dispatch {
        if let Some(capture) = self.capture {
            return self.on_capture_key(capture, event, now);
        }

        if let Some(launcher) = self.bindings.launcher {
            if launcher.matches(event.modifiers, event.key_code) {
                if self.latched {
                    return Dispatch::Swallow;
                }
                self.latched = true;
                return Dispatch::Fire(HotkeyAction::ToggleVisibility);
            }
        }

        if let Some(switcher) = self.bindings.switcher {
            if self.app_visible && switcher.matches(event.modifiers, event.key_code) {
                return Dispatch::Fire(HotkeyAction::CyclePage);
            }
        }

        Dispatch::PassThrough
    }

    fn on_capture_key(&mut self, capture: Capture, event: KeyEvent, now: Instant) -> Dispatch {
        if now < capture.resume_at {
            return Dispatch::Swallow;
        }

        if event.key_code == keys::ESCAPE {
            return self
                .cancel_capture()
                .map(Dispatch::Fire)
                .unwrap_or(Dispatch::Swallow);
        }

        let modifiers = event.modifiers.normalized();
        if !modifiers.has_any() {
            return Dispatch::Swallow;
        }

        let combo = KeyCombo::new(modifiers, event.key_code);
        self.bindings.set(capture.role, Some(combo));
        self.capture = None;
        // the captured key is still held; its repeats must not toggle
        self.latched = capture.role == HotkeyRole::Launcher;
        log::info!("Captured {:?} hotkey {}", capture.role, combo);
        Dispatch::Fire(HotkeyAction::Captured {
            role: capture.role,
            combo,
        })
    }
}
