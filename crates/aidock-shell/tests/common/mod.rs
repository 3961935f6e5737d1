//! Recording fakes for the renderer and UI seams

#![allow(dead_code)]

use aidock_core::types::{ManualClock, Page, PageId, PageKind, BLANK_URL};
use aidock_core::{AiDockError, AiDockResult, AppConfig, ConfigStore, PlatformCatalog};
use aidock_shell::{AppShell, LoadFailure, Renderer, RendererFactory, SelectorEntry, UiSurface};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct RendererState {
    pub url: Option<String>,
    pub loads: Vec<String>,
    pub stops: usize,
    pub hidden: bool,
    /// Fail loads of the blank page, as a renderer that has gone away would
    pub refuse_blank: bool,
}

pub struct FakeRenderer(Rc<RefCell<RendererState>>);

impl Renderer for FakeRenderer {
    fn load(&mut self, url: &str) -> AiDockResult<()> {
        let mut state = self.0.borrow_mut();
        if state.refuse_blank && url == BLANK_URL {
            return Err(AiDockError::load(url, "renderer gone"));
        }
        state.url = Some(url.to_string());
        state.loads.push(url.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        self.0.borrow_mut().stops += 1;
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn reload(&mut self) {}

    fn set_hidden(&mut self, hidden: bool) {
        self.0.borrow_mut().hidden = hidden;
    }

    fn current_url(&self) -> Option<String> {
        self.0.borrow().url.clone()
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub created: Rc<RefCell<Vec<(PageId, PageKind)>>>,
    pub states: Rc<RefCell<HashMap<PageId, Rc<RefCell<RendererState>>>>>,
    pub fail_next: Rc<Cell<bool>>,
}

impl RendererFactory for FakeFactory {
    fn create(&mut self, page: &Page, kind: PageKind) -> AiDockResult<Box<dyn Renderer>> {
        if self.fail_next.replace(false) {
            return Err(AiDockError::creation("renderer process crashed"));
        }

        let state = Rc::new(RefCell::new(RendererState::default()));
        let mut renderer = FakeRenderer(Rc::clone(&state));
        renderer.load(&page.url)?;

        self.created.borrow_mut().push((page.id.clone(), kind));
        self.states.borrow_mut().insert(page.id.clone(), state);
        Ok(Box::new(renderer))
    }
}

#[derive(Default)]
pub struct RecordingUi {
    pub refreshes: RefCell<Vec<Vec<SelectorEntry>>>,
    pub advisories: RefCell<Vec<String>>,
    pub titles: RefCell<Vec<String>>,
    pub back_visible: Cell<bool>,
    pub home_visible: Cell<bool>,
    pub window_visible: Cell<bool>,
    pub failures: RefCell<Vec<LoadFailure>>,
    pub matches: RefCell<Vec<Vec<String>>>,
}

impl RecordingUi {
    pub fn refresh_count(&self) -> usize {
        self.refreshes.borrow().len()
    }

    pub fn last_labels(&self) -> Vec<String> {
        self.refreshes
            .borrow()
            .last()
            .map(|entries| entries.iter().map(|e| e.label.clone()).collect())
            .unwrap_or_default()
    }

    pub fn last_title(&self) -> Option<String> {
        self.titles.borrow().last().cloned()
    }
}

impl UiSurface for RecordingUi {
    fn set_back_visible(&self, visible: bool) {
        self.back_visible.set(visible);
    }

    fn set_title(&self, title: &str) {
        self.titles.borrow_mut().push(title.to_string());
    }

    fn show_home(&self, visible: bool) {
        self.home_visible.set(visible);
    }

    fn refresh_selector(&self, entries: &[SelectorEntry]) {
        self.refreshes.borrow_mut().push(entries.to_vec());
    }

    fn show_advisory(&self, message: &str) {
        self.advisories.borrow_mut().push(message.to_string());
    }

    fn set_window_visible(&self, visible: bool) {
        self.window_visible.set(visible);
    }

    fn show_load_failure(&self, failure: &LoadFailure) {
        self.failures.borrow_mut().push(failure.clone());
    }

    fn show_platform_matches(&self, platform_ids: &[String]) {
        self.matches.borrow_mut().push(platform_ids.to_vec());
    }
}

pub struct Harness {
    pub shell: AppShell,
    pub ui: Rc<RecordingUi>,
    pub factory: FakeFactory,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        let clock = ManualClock::new(1_000);
        let ui = Rc::new(RecordingUi::default());
        let factory = FakeFactory::default();
        let shell = AppShell::new(
            config,
            Rc::new(PlatformCatalog::builtin()),
            Box::new(factory.clone()),
            Rc::clone(&ui) as Rc<dyn UiSurface>,
            Rc::new(clock.clone()),
        );
        Self {
            shell,
            ui,
            factory,
            clock,
        }
    }

    pub fn with_store(config: AppConfig, store: ConfigStore) -> Self {
        let mut harness = Self::new(config);
        harness.shell = harness.shell.with_store(store);
        harness
    }

    pub fn renderer(&self, id: &PageId) -> Rc<RefCell<RendererState>> {
        let states = self.factory.states.borrow();
        match states.get(id) {
            Some(state) => Rc::clone(state),
            None => panic!("no renderer for page {}", id),
        }
    }

    pub fn active(&self) -> Option<PageId> {
        self.shell.registry().active_id().cloned()
    }
}
