//! Inputs that arrive as JSON objects
//!
//! Bridge commands carry an `action` field. Everything else (simulated
//! keys, hotkey capture, ticks, quit) carries an `event` field and goes
//! through [`drive`], which runs where a native key tap would.

use crate::events::AppEvent;
use aidock_core::types::Modifiers;
use aidock_core::{AiDockError, AiDockResult};
use aidock_shell::{Command, HotkeyDispatcher, HotkeyRole, KeyEvent};
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DriverInput {
    KeyDown { flags: u32, key: u16 },
    KeyUp { flags: u32, key: u16 },
    Capture { role: String },
    CancelCapture,
    Tick,
    Quit,
}

impl DriverInput {
    /// The chrome page may rebind hotkeys but never type keys or stop the app
    fn allowed_from_chrome(&self) -> bool {
        matches!(self, Self::Capture { .. } | Self::CancelCapture)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Driver(DriverInput),
}

pub fn parse_line(line: &str) -> AiDockResult<Input> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("action").is_some() {
        return Ok(Input::Command(Command::from_value(value)?));
    }
    if value.get("event").is_some() {
        return Ok(Input::Driver(serde_json::from_value(value)?));
    }
    Err(AiDockError::Config(
        "expected an `action` or `event` field".to_string(),
    ))
}

/// Parse a message posted by the chrome webview
pub fn parse_chrome_message(body: &str) -> AiDockResult<Input> {
    match parse_line(body)? {
        Input::Driver(driver) if !driver.allowed_from_chrome() => Err(AiDockError::Config(
            format!("{:?} is not accepted from the chrome page", driver),
        )),
        input => Ok(input),
    }
}

pub fn parse_role(role: &str) -> Option<HotkeyRole> {
    match role.to_ascii_lowercase().as_str() {
        "launcher" => Some(HotkeyRole::Launcher),
        "switcher" => Some(HotkeyRole::Switcher),
        _ => None,
    }
}

/// Apply a driver input to the dispatcher; returns the event the main loop
/// should see, if any
pub fn drive(input: DriverInput, dispatcher: &Mutex<HotkeyDispatcher>) -> Option<AppEvent> {
    let mut dispatcher = dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
    match input {
        DriverInput::KeyDown { flags, key } => dispatcher
            .on_key_event(KeyEvent::down(Modifiers(flags), key))
            .action()
            .map(AppEvent::Hotkey),
        DriverInput::KeyUp { flags, key } => dispatcher
            .on_key_event(KeyEvent::up(Modifiers(flags), key))
            .action()
            .map(AppEvent::Hotkey),
        DriverInput::Capture { role } => {
            match parse_role(&role) {
                Some(role) => {
                    if dispatcher.begin_capture(role) {
                        info!("Press the new {:?} combination", role);
                    }
                }
                None => warn!("Unknown hotkey role {:?}", role),
            }
            None
        }
        DriverInput::CancelCapture => dispatcher.cancel_capture().map(AppEvent::Hotkey),
        DriverInput::Tick => Some(AppEvent::Tick),
        DriverInput::Quit => Some(AppEvent::Quit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidock_core::types::PageId;
    use aidock_core::LauncherConfig;
    use aidock_shell::{HotkeyAction, HotkeyBindings};

    fn dispatcher() -> Mutex<HotkeyDispatcher> {
        let launcher = LauncherConfig::default();
        let bindings = HotkeyBindings::from_config(&launcher, None);
        Mutex::new(HotkeyDispatcher::new(bindings))
    }

    #[test]
    fn test_parses_commands_and_driver_inputs() {
        assert_eq!(
            parse_line(r#"{"action":"goBack"}"#).unwrap(),
            Input::Command(Command::GoBack)
        );
        assert_eq!(
            parse_line(r#"{"event":"keyDown","flags":524288,"key":49}"#).unwrap(),
            Input::Driver(DriverInput::KeyDown {
                flags: 1 << 19,
                key: 49
            })
        );
        assert_eq!(
            parse_line(r#"{"action":"retryLoad","windowId":"p1"}"#).unwrap(),
            Input::Command(Command::RetryLoad {
                window_id: PageId::from("p1")
            })
        );
    }

    #[test]
    fn test_rejects_untagged_lines() {
        assert!(parse_line(r#"{"platformId":"claude"}"#).is_err());
        assert!(parse_line(r#"{"event":"explode"}"#).is_err());
        assert!(parse_line("hello").is_err());
    }

    #[test]
    fn test_chrome_accepts_capture_only() {
        assert_eq!(
            parse_chrome_message(r#"{"event":"capture","role":"launcher"}"#).unwrap(),
            Input::Driver(DriverInput::Capture {
                role: "launcher".into()
            })
        );
        assert_eq!(
            parse_chrome_message(r#"{"event":"cancelCapture"}"#).unwrap(),
            Input::Driver(DriverInput::CancelCapture)
        );
        assert_eq!(
            parse_chrome_message(r#"{"action":"goBack"}"#).unwrap(),
            Input::Command(Command::GoBack)
        );
        assert!(parse_chrome_message(r#"{"event":"quit"}"#).is_err());
        assert!(parse_chrome_message(r#"{"event":"keyDown","flags":0,"key":49}"#).is_err());
    }

    #[test]
    fn test_capture_from_chrome_then_cancel_restores_binding() {
        let dispatcher = dispatcher();
        let before = dispatcher.lock().unwrap().bindings();

        let Input::Driver(capture) =
            parse_chrome_message(r#"{"event":"capture","role":"launcher"}"#).unwrap()
        else {
            panic!("expected a driver input");
        };
        assert!(drive(capture, &dispatcher).is_none());
        assert_eq!(
            dispatcher.lock().unwrap().capturing(),
            Some(HotkeyRole::Launcher)
        );

        let event = drive(DriverInput::CancelCapture, &dispatcher);
        assert!(matches!(
            event,
            Some(AppEvent::Hotkey(HotkeyAction::CaptureCancelled {
                role: HotkeyRole::Launcher
            }))
        ));
        assert_eq!(dispatcher.lock().unwrap().capturing(), None);
        assert_eq!(dispatcher.lock().unwrap().bindings(), before);
    }

    #[test]
    fn test_simulated_launcher_fires_once_while_held() {
        let dispatcher = dispatcher();
        let down = DriverInput::KeyDown {
            flags: 1 << 19,
            key: 49,
        };

        assert!(matches!(
            drive(down.clone(), &dispatcher),
            Some(AppEvent::Hotkey(_))
        ));
        assert!(drive(down, &dispatcher).is_none());
    }

    #[test]
    fn test_roles() {
        assert_eq!(parse_role("Launcher"), Some(HotkeyRole::Launcher));
        assert_eq!(parse_role("switcher"), Some(HotkeyRole::Switcher));
        assert_eq!(parse_role("other"), None);
    }
}
