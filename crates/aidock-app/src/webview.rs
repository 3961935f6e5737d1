//! Webview host
//!
//! One tao window. A chrome webview draws the home grid and the top bar; each
//! chat page is a child wry webview laid out under the bar. Page callbacks
//! and the suspend ticker reach the shell through the event loop proxy.

use crate::events::{self, AppEvent};
use crate::input::{drive, parse_chrome_message, Input};
use aidock_core::types::{Modifiers, Page, PageId, PageKind, SystemClock};
use aidock_core::{
    AiDockError, AiDockResult, AppConfig, ConfigStore, LauncherConfig, PlatformCatalog,
};
use aidock_shell::shell::HOME_TITLE;
use aidock_shell::suspend::SUSPEND_TICK_SECS;
use aidock_shell::{
    AppShell, HotkeyBindings, HotkeyDispatcher, KeyEvent, LoadFailure, NavigationDecision,
    NavigationGuard, Renderer, RendererFactory, SelectorEntry, UiSurface,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tao::{
    dpi::{LogicalPosition, LogicalSize},
    event::{DeviceEvent, ElementState, Event, RawKeyEvent, WindowEvent},
    event_loop::{ControlFlow, DeviceEventFilter, EventLoopBuilder, EventLoopProxy},
    keyboard::KeyCode,
    window::{Window, WindowBuilder},
};
use tracing::{debug, info, warn};
use wry::{PageLoadEvent, Rect, WebView, WebViewBuilder};

const HOME_HTML: &str = include_str!("ui/home.html");

/// Height of the back button / selector bar above a chat page
const BAR_HEIGHT: f64 = 44.0;

struct Layout {
    window: Window,
    chrome: WebView,
    pages: RefCell<HashMap<PageId, Rc<WebView>>>,
    home: Cell<bool>,
}

impl Layout {
    fn logical_size(window: &Window) -> (f64, f64) {
        let size = window.inner_size();
        let scale = window.scale_factor();
        (size.width as f64 / scale, size.height as f64 / scale)
    }

    fn chrome_rect(window: &Window, home: bool) -> Rect {
        let (width, height) = Self::logical_size(window);
        let chrome_height = if home { height } else { BAR_HEIGHT.min(height) };
        Rect {
            position: LogicalPosition::new(0, 0).into(),
            size: LogicalSize::new(width, chrome_height).into(),
        }
    }

    fn page_rect(window: &Window) -> Rect {
        let (width, height) = Self::logical_size(window);
        Rect {
            position: LogicalPosition::new(0, BAR_HEIGHT as i32).into(),
            size: LogicalSize::new(width, (height - BAR_HEIGHT).max(0.0)).into(),
        }
    }

    fn apply(&self) {
        let _ = self
            .chrome
            .set_bounds(Self::chrome_rect(&self.window, self.home.get()));
        for webview in self.pages.borrow().values() {
            let _ = webview.set_bounds(Self::page_rect(&self.window));
        }
    }

    fn script(&self, script: &str) {
        if let Err(err) = self.chrome.evaluate_script(script) {
            warn!("Chrome script failed: {}", err);
        }
    }
}

struct ChromeUi {
    layout: Rc<Layout>,
}

impl UiSurface for ChromeUi {
    fn set_back_visible(&self, visible: bool) {
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.setBackVisible({}); }}",
            visible
        ));
    }

    fn set_title(&self, title: &str) {
        self.layout.window.set_title(title);
    }

    fn show_home(&self, visible: bool) {
        self.layout.home.set(visible);
        self.layout.apply();
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.showHome({}); }}",
            visible
        ));
    }

    fn refresh_selector(&self, entries: &[SelectorEntry]) {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "platformId": entry.platform_id,
                    "windowId": entry.page_id,
                    "label": entry.label,
                    "selected": entry.selected,
                })
            })
            .collect();
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.renderSelector({}); }}",
            serde_json::Value::Array(rows)
        ));
    }

    fn show_advisory(&self, message: &str) {
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.showAdvisory({}); }}",
            serde_json::Value::String(message.to_string())
        ));
    }

    fn set_window_visible(&self, visible: bool) {
        self.layout.window.set_visible(visible);
        if visible {
            self.layout.window.set_focus();
        }
    }

    fn show_load_failure(&self, failure: &LoadFailure) {
        let payload = json!({
            "windowId": failure.page_id,
            "url": failure.url,
            "reason": failure.reason,
        });
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.showLoadFailure({}); }}",
            payload
        ));
    }

    fn show_platform_matches(&self, platform_ids: &[String]) {
        self.layout.script(&format!(
            "if(window.aidock) {{ aidock.filterGrid({}); }}",
            json!(platform_ids)
        ));
    }
}

struct WebviewRenderer {
    page_id: PageId,
    webview: Rc<WebView>,
    loading: Arc<AtomicBool>,
    layout: Rc<Layout>,
}

impl Renderer for WebviewRenderer {
    fn load(&mut self, url: &str) -> AiDockResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        self.webview
            .load_url(url)
            .map_err(|err| AiDockError::load(url, err.to_string()))
    }

    fn stop(&mut self) {
        let _ = self.webview.evaluate_script("window.stop();");
        self.loading.store(false, Ordering::SeqCst);
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn reload(&mut self) {
        let _ = self.webview.evaluate_script("location.reload();");
    }

    fn set_hidden(&mut self, hidden: bool) {
        if let Err(err) = self.webview.set_visible(!hidden) {
            warn!("Failed to change visibility of page {}: {}", self.page_id, err);
        }
    }

    fn current_url(&self) -> Option<String> {
        self.webview.url().ok()
    }
}

impl Drop for WebviewRenderer {
    fn drop(&mut self) {
        self.layout.pages.borrow_mut().remove(&self.page_id);
    }
}

struct WebviewFactory {
    layout: Rc<Layout>,
    proxy: EventLoopProxy<AppEvent>,
    catalog: Rc<PlatformCatalog>,
    allow_hosts: Vec<String>,
}

impl RendererFactory for WebviewFactory {
    fn create(&mut self, page: &Page, kind: PageKind) -> AiDockResult<Box<dyn Renderer>> {
        // Each webview checks navigations against its own copy of the rules
        let mut guard = NavigationGuard::new(&self.allow_hosts);
        if let Some(platform) = self.catalog.get(&page.platform_id) {
            guard.register_page(&page.id, platform);
        }

        let loading = Arc::new(AtomicBool::new(true));
        let nav_id = page.id.clone();
        let load_id = page.id.clone();
        let load_flag = Arc::clone(&loading);
        let load_proxy = self.proxy.clone();

        let webview = WebViewBuilder::new()
            .with_url(&page.url)
            .with_visible(kind == PageKind::Foreground)
            .with_devtools(cfg!(debug_assertions))
            .with_clipboard(true)
            .with_bounds(Layout::page_rect(&self.layout.window))
            .with_navigation_handler(move |url| match guard.check(&nav_id, &url) {
                NavigationDecision::Allow => true,
                NavigationDecision::OpenExternally => {
                    info!("Page {} blocked from leaving for {}", nav_id, url);
                    false
                }
            })
            .with_on_page_load_handler(move |event, url| match event {
                PageLoadEvent::Started => {
                    load_flag.store(true, Ordering::SeqCst);
                    let _ = load_proxy.send_event(AppEvent::LoadStarted(load_id.clone()));
                }
                PageLoadEvent::Finished => {
                    load_flag.store(false, Ordering::SeqCst);
                    let _ = load_proxy.send_event(AppEvent::LoadFinished {
                        page_id: load_id.clone(),
                        url,
                        title: None,
                    });
                }
            })
            .build_as_child(&self.layout.window)
            .map_err(|err| AiDockError::creation(err.to_string()))?;

        let webview = Rc::new(webview);
        self.layout
            .pages
            .borrow_mut()
            .insert(page.id.clone(), Rc::clone(&webview));
        debug!("Created {:?} webview for page {}", kind, page.id);

        Ok(Box::new(WebviewRenderer {
            page_id: page.id.clone(),
            webview,
            loading,
            layout: Rc::clone(&self.layout),
        }))
    }
}

/// Turns raw device keys into dispatcher events, tracking held modifiers
#[derive(Default)]
struct KeyTap {
    held: Modifiers,
}

impl KeyTap {
    fn feed(&mut self, raw: &RawKeyEvent) -> Option<KeyEvent> {
        let pressed = raw.state == ElementState::Pressed;
        if let Some(flag) = modifier_flag(raw.physical_key) {
            self.held = if pressed {
                self.held | flag
            } else {
                Modifiers(self.held.0 & !flag.0)
            };
            return None;
        }

        let key_code = mac_key_code(raw.physical_key)?;
        Some(if pressed {
            KeyEvent::down(self.held, key_code)
        } else {
            KeyEvent::up(self.held, key_code)
        })
    }
}

fn modifier_flag(key: KeyCode) -> Option<Modifiers> {
    match key {
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Modifiers::SHIFT),
        KeyCode::ControlLeft | KeyCode::ControlRight => Some(Modifiers::CONTROL),
        KeyCode::AltLeft | KeyCode::AltRight => Some(Modifiers::OPTION),
        KeyCode::SuperLeft | KeyCode::SuperRight => Some(Modifiers::COMMAND),
        _ => None,
    }
}

/// Stored bindings use macOS virtual key codes on every platform
fn mac_key_code(key: KeyCode) -> Option<u16> {
    let code = match key {
        KeyCode::KeyA => 0,
        KeyCode::KeyS => 1,
        KeyCode::KeyD => 2,
        KeyCode::KeyF => 3,
        KeyCode::KeyH => 4,
        KeyCode::KeyG => 5,
        KeyCode::KeyZ => 6,
        KeyCode::KeyX => 7,
        KeyCode::KeyC => 8,
        KeyCode::KeyV => 9,
        KeyCode::KeyB => 11,
        KeyCode::KeyQ => 12,
        KeyCode::KeyW => 13,
        KeyCode::KeyE => 14,
        KeyCode::KeyR => 15,
        KeyCode::KeyY => 16,
        KeyCode::KeyT => 17,
        KeyCode::Digit1 => 18,
        KeyCode::Digit2 => 19,
        KeyCode::Digit3 => 20,
        KeyCode::Digit4 => 21,
        KeyCode::Digit6 => 22,
        KeyCode::Digit5 => 23,
        KeyCode::Digit9 => 25,
        KeyCode::Digit7 => 26,
        KeyCode::Digit8 => 28,
        KeyCode::Digit0 => 29,
        KeyCode::KeyO => 31,
        KeyCode::KeyU => 32,
        KeyCode::KeyI => 34,
        KeyCode::KeyP => 35,
        KeyCode::Enter => 36,
        KeyCode::KeyL => 37,
        KeyCode::KeyJ => 38,
        KeyCode::KeyK => 40,
        KeyCode::KeyN => 45,
        KeyCode::KeyM => 46,
        KeyCode::Tab => 48,
        KeyCode::Space => 49,
        KeyCode::Backquote => 50,
        KeyCode::Escape => 53,
        _ => return None,
    };
    Some(code)
}

pub fn run(store: ConfigStore, config: AppConfig, launcher: LauncherConfig) -> anyhow::Result<()> {
    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();
    // Global hotkeys need keys even while another app has focus
    event_loop.set_device_event_filter(DeviceEventFilter::Never);
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(HOME_TITLE)
        .with_inner_size(LogicalSize::new(1100.0, 760.0))
        .build(&event_loop)?;

    let catalog = Rc::new(PlatformCatalog::builtin());
    let platforms = serde_json::to_string(&catalog.iter().collect::<Vec<_>>())?;

    // Without a launcher there is no way back to a hidden window
    let exit_on_close = launcher.binding.is_none();
    let bindings = HotkeyBindings::from_config(&launcher, config.hotkeys.switcher);
    let dispatcher = Arc::new(Mutex::new(HotkeyDispatcher::new(bindings)));

    let chrome_proxy = proxy.clone();
    let chrome_dispatcher = Arc::clone(&dispatcher);
    let ready_proxy = proxy.clone();
    let chrome = WebViewBuilder::new()
        .with_html(HOME_HTML)
        .with_devtools(cfg!(debug_assertions))
        .with_initialization_script(&format!("window.__AIDOCK_PLATFORMS = {};", platforms))
        .with_bounds(Layout::chrome_rect(&window, true))
        .with_ipc_handler(move |message| {
            let body = message.body();
            debug!("Chrome IPC: {}", body);
            let event = match parse_chrome_message(body) {
                Ok(Input::Command(command)) => Some(AppEvent::Command(command)),
                Ok(Input::Driver(driver)) => drive(driver, &chrome_dispatcher),
                Err(err) => {
                    warn!("Rejected chrome message {}: {}", body, err);
                    None
                }
            };
            if let Some(event) = event {
                let _ = chrome_proxy.send_event(event);
            }
        })
        .with_on_page_load_handler(move |event, _url| {
            if matches!(event, PageLoadEvent::Finished) {
                let _ = ready_proxy.send_event(AppEvent::ChromeReady);
            }
        })
        .build_as_child(&window)?;

    let layout = Rc::new(Layout {
        window,
        chrome,
        pages: RefCell::new(HashMap::new()),
        home: Cell::new(true),
    });

    let factory = WebviewFactory {
        layout: Rc::clone(&layout),
        proxy: proxy.clone(),
        catalog: Rc::clone(&catalog),
        allow_hosts: config.navigation.allow_hosts.clone(),
    };

    let mut shell = AppShell::new(
        config,
        catalog,
        Box::new(factory),
        Rc::new(ChromeUi {
            layout: Rc::clone(&layout),
        }),
        Rc::new(SystemClock),
    )
    .with_store(store);

    let restored = shell.restore_on_startup();
    info!("Restored {} pages", restored);
    shell.set_visible(true);
    events::sync_visibility(&shell, &dispatcher);

    let ticker = proxy.clone();
    events::spawn_ticker(Duration::from_secs(SUSPEND_TICK_SECS), move |event| {
        ticker.send_event(event).is_ok()
    });

    let mut tap = KeyTap::default();
    info!("Window created, entering event loop");

    event_loop.run(move |event, _target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                if exit_on_close {
                    info!("Window closed, shutting down");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                shell.set_visible(false);
                events::sync_visibility(&shell, &dispatcher);
            }
            Event::WindowEvent {
                event: WindowEvent::Resized(_),
                ..
            } => layout.apply(),
            Event::DeviceEvent {
                event: DeviceEvent::Key(raw),
                ..
            } => {
                let Some(key_event) = tap.feed(&raw) else {
                    return;
                };
                let action = dispatcher
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_key_event(key_event)
                    .action();
                if let Some(action) = action {
                    events::handle_event(&mut shell, &dispatcher, AppEvent::Hotkey(action));
                }
            }
            Event::UserEvent(event) => {
                if !events::handle_event(&mut shell, &dispatcher, event) {
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    })
}
