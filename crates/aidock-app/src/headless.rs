//! Headless driver
//!
//! Runs the shell without a GUI. Each stdin line is one JSON input (see
//! [`crate::input`]). Pages are backed by a renderer that only logs.

use crate::events::{self, AppEvent};
use crate::input::{drive, parse_line, Input};
use aidock_core::types::{Page, PageId, PageKind, SystemClock, BLANK_URL};
use aidock_core::{AiDockResult, AppConfig, ConfigStore, LauncherConfig, PlatformCatalog};
use aidock_shell::suspend::SUSPEND_TICK_SECS;
use aidock_shell::{
    AppShell, HotkeyBindings, HotkeyDispatcher, LoadFailure, Renderer, RendererFactory,
    SelectorEntry, UiSurface,
};
use std::io::{self, BufRead};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Renderer that logs instead of drawing. Loads complete immediately.
struct LogRenderer {
    page_id: PageId,
    url: Option<String>,
    hidden: bool,
    events: Sender<AppEvent>,
}

impl Renderer for LogRenderer {
    fn load(&mut self, url: &str) -> AiDockResult<()> {
        info!("[{}] load {}", self.page_id, url);
        self.url = Some(url.to_string());
        if url == BLANK_URL {
            return Ok(());
        }

        let _ = self.events.send(AppEvent::LoadStarted(self.page_id.clone()));
        let outcome = match Url::parse(url) {
            Ok(_) => AppEvent::LoadFinished {
                page_id: self.page_id.clone(),
                url: url.to_string(),
                title: None,
            },
            Err(err) => AppEvent::LoadFailed {
                page_id: self.page_id.clone(),
                url: url.to_string(),
                reason: err.to_string(),
            },
        };
        let _ = self.events.send(outcome);
        Ok(())
    }

    fn stop(&mut self) {
        debug!("[{}] stop", self.page_id);
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn reload(&mut self) {
        if let Some(url) = self.url.clone() {
            let _ = self.load(&url);
        }
    }

    fn set_hidden(&mut self, hidden: bool) {
        if self.hidden != hidden {
            debug!("[{}] hidden = {}", self.page_id, hidden);
            self.hidden = hidden;
        }
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }
}

struct LogRendererFactory {
    events: Sender<AppEvent>,
}

impl RendererFactory for LogRendererFactory {
    fn create(&mut self, page: &Page, kind: PageKind) -> AiDockResult<Box<dyn Renderer>> {
        info!(
            "Creating {:?} renderer for {} ({})",
            kind, page.id, page.platform_id
        );
        let mut renderer = LogRenderer {
            page_id: page.id.clone(),
            url: None,
            hidden: kind == PageKind::Background,
            events: self.events.clone(),
        };
        renderer.load(&page.url)?;
        Ok(Box::new(renderer))
    }
}

struct LogUi;

impl UiSurface for LogUi {
    fn set_back_visible(&self, visible: bool) {
        debug!("Back button visible: {}", visible);
    }

    fn set_title(&self, title: &str) {
        info!("Title: {}", title);
    }

    fn show_home(&self, visible: bool) {
        debug!("Home visible: {}", visible);
    }

    fn refresh_selector(&self, entries: &[SelectorEntry]) {
        let labels: Vec<String> = entries
            .iter()
            .map(|entry| {
                if entry.selected {
                    format!("[{}]", entry.label)
                } else {
                    entry.label.clone()
                }
            })
            .collect();
        info!("Selector: {}", labels.join(" | "));
    }

    fn show_advisory(&self, message: &str) {
        warn!("Advisory: {}", message);
    }

    fn set_window_visible(&self, visible: bool) {
        info!("Window visible: {}", visible);
    }

    fn show_load_failure(&self, failure: &LoadFailure) {
        warn!(
            "Page {} failed to load {}: {} (send retryLoad to reload)",
            failure.page_id, failure.url, failure.reason
        );
    }

    fn show_platform_matches(&self, platform_ids: &[String]) {
        info!("Matching platforms: {}", platform_ids.join(", "));
    }
}

/// Reads stdin on its own thread. Simulated keys go through the dispatcher
/// here, the way a native key tap would, and only actions cross to the loop.
fn spawn_stdin_reader(events: Sender<AppEvent>, dispatcher: Arc<Mutex<HotkeyDispatcher>>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("Failed to read stdin: {}", err);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let input = match parse_line(line) {
                Ok(input) => input,
                Err(err) => {
                    warn!("Rejected input {:?}: {}", line, err);
                    continue;
                }
            };

            let event = match input {
                Input::Command(command) => Some(AppEvent::Command(command)),
                Input::Driver(driver) => drive(driver, &dispatcher),
            };
            let quit = matches!(event, Some(AppEvent::Quit));
            if let Some(event) = event {
                if events.send(event).is_err() || quit {
                    return;
                }
            }
        }
        let _ = events.send(AppEvent::Quit);
    });
}

pub fn run(store: ConfigStore, config: AppConfig, launcher: LauncherConfig) -> anyhow::Result<()> {
    info!("Running headless; reading commands from stdin");

    let (tx, rx) = mpsc::channel();
    let bindings = HotkeyBindings::from_config(&launcher, config.hotkeys.switcher);
    let dispatcher = Arc::new(Mutex::new(HotkeyDispatcher::new(bindings)));

    let factory = LogRendererFactory { events: tx.clone() };
    let mut shell = AppShell::new(
        config,
        Rc::new(PlatformCatalog::builtin()),
        Box::new(factory),
        Rc::new(LogUi),
        Rc::new(SystemClock),
    )
    .with_store(store);

    let restored = shell.restore_on_startup();
    info!("Restored {} pages", restored);
    shell.set_visible(true);
    events::sync_visibility(&shell, &dispatcher);

    let ticker = tx.clone();
    events::spawn_ticker(Duration::from_secs(SUSPEND_TICK_SECS), move |event| {
        ticker.send(event).is_ok()
    });
    spawn_stdin_reader(tx, Arc::clone(&dispatcher));

    while let Ok(event) = rx.recv() {
        if !events::handle_event(&mut shell, &dispatcher, event) {
            break;
        }
    }

    info!("Shutting down");
    Ok(())
}
