//! Events marshalled onto the main loop and how the shell reacts to them

use aidock_core::types::PageId;
use aidock_shell::{AppShell, Command, HotkeyAction, HotkeyDispatcher};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Everything that reaches the main loop from another thread or callback
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Hotkey(HotkeyAction),
    Tick,
    LoadStarted(PageId),
    LoadFinished {
        page_id: PageId,
        url: String,
        title: Option<String>,
    },
    LoadFailed {
        page_id: PageId,
        url: String,
        reason: String,
    },
    /// The chrome page finished loading and needs the current state
    ChromeReady,
    Quit,
}

/// Apply one event to the shell. Returns false once the loop should stop.
pub fn handle_event(
    shell: &mut AppShell,
    dispatcher: &Mutex<HotkeyDispatcher>,
    event: AppEvent,
) -> bool {
    match event {
        AppEvent::Command(command) => shell.handle_command(command),
        AppEvent::Hotkey(action) => shell.handle_hotkey(action),
        AppEvent::Tick => {
            let suspended = shell.tick();
            if suspended > 0 {
                info!("Suspended {} idle pages", suspended);
            }
        }
        AppEvent::LoadStarted(page_id) => shell.on_load_started(&page_id),
        AppEvent::LoadFinished {
            page_id,
            url,
            title,
        } => shell.on_load_finished(&page_id, &url, title),
        AppEvent::LoadFailed {
            page_id,
            url,
            reason,
        } => shell.on_load_failed(&page_id, &url, &reason),
        AppEvent::ChromeReady => shell.sync_ui(),
        AppEvent::Quit => return false,
    }

    sync_visibility(shell, dispatcher);
    true
}

/// The switcher only fires while the window is up; keep the dispatcher told
pub fn sync_visibility(shell: &AppShell, dispatcher: &Mutex<HotkeyDispatcher>) {
    dispatcher
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set_app_visible(shell.is_visible());
}

/// Post `AppEvent::Tick` every `interval` until `send` reports the loop is gone
pub fn spawn_ticker<F>(interval: Duration, send: F) -> thread::JoinHandle<()>
where
    F: Fn(AppEvent) -> bool + Send + 'static,
{
    thread::spawn(move || loop {
        thread::sleep(interval);
        if !send(AppEvent::Tick) {
            debug!("Suspend ticker stopping");
            break;
        }
    })
}
