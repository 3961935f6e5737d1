//! Seams to the renderer and the native UI
//!
//! The shell never touches web content or widgets directly; it drives these
//! traits from the main loop.

use crate::guard::LoadFailure;
use aidock_core::types::{Page, PageId, PageKind, BLANK_URL};
use aidock_core::AiDockResult;

/// Control surface of one embedded web renderer
pub trait Renderer {
    fn load(&mut self, url: &str) -> AiDockResult<()>;
    fn stop(&mut self);
    fn is_loading(&self) -> bool;
    fn reload(&mut self);
    fn set_hidden(&mut self, hidden: bool);
    /// URL currently displayed, if any
    fn current_url(&self) -> Option<String>;
}

/// Brings up the native window/renderer bound to a page
pub trait RendererFactory {
    fn create(&mut self, page: &Page, kind: PageKind) -> AiDockResult<Box<dyn Renderer>>;
}

/// One row of the page selector dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    pub platform_id: String,
    /// `None` for an enabled platform with no open page yet
    pub page_id: Option<PageId>,
    pub label: String,
    pub selected: bool,
}

/// Native chrome around the renderers
pub trait UiSurface {
    fn set_back_visible(&self, visible: bool);
    fn set_title(&self, title: &str);
    fn show_home(&self, visible: bool);
    fn refresh_selector(&self, entries: &[SelectorEntry]);
    fn show_advisory(&self, message: &str);
    fn set_window_visible(&self, visible: bool);
    fn show_load_failure(&self, failure: &LoadFailure);
    /// Platforms the home grid should show, best match first
    fn show_platform_matches(&self, platform_ids: &[String]);
}

/// True for an empty or `about:blank` URL
pub fn is_blank(url: Option<&str>) -> bool {
    match url {
        None => true,
        Some(url) => url.is_empty() || url == BLANK_URL,
    }
}
