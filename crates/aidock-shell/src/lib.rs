//! Desktop shell - pages, navigation, suspension, hotkeys and session restore

pub mod bridge;
pub mod guard;
pub mod hotkey;
pub mod navigation;
pub mod registry;
pub mod restore;
pub mod shell;
pub mod surface;
pub mod suspend;

pub use bridge::Command;
pub use guard::{LoadFailure, NavigationDecision, NavigationGuard};
pub use hotkey::{
    Dispatch, HotkeyAction, HotkeyBindings, HotkeyDispatcher, HotkeyRole, KeyEvent, KeyEventKind,
};
pub use navigation::{NavState, NavigationController};
pub use registry::{PageLimits, PageRegistry};
pub use restore::{BatchScope, RefreshGate, SessionRestorer, ThresholdNotifier};
pub use shell::AppShell;
pub use surface::{Renderer, RendererFactory, SelectorEntry, UiSurface};
pub use suspend::SuspendPolicy;
