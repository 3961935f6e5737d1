//! Application shell - owns every page and drives the UI from the main loop

use crate::bridge::Command;
use crate::guard::{NavigationDecision, NavigationGuard};
use crate::hotkey::{HotkeyAction, HotkeyRole};
use crate::navigation::{NavState, NavigationController};
use crate::registry::{PageLimits, PageRegistry};
use crate::restore::{RefreshGate, SessionRestorer, ThresholdNotifier};
use crate::surface::{is_blank, Renderer, RendererFactory, SelectorEntry, UiSurface};
use crate::suspend::{resume_renderer, suspend_renderer, SuspendPolicy};
use aidock_core::types::{Clock, Geometry, KeyCombo, PageId, PageKind, PageState, LAST_URL_KEY};
use aidock_core::{
    AiDockError, AiDockResult, AppConfig, ConfigStore, LauncherConfig, PlatformCatalog,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Window title while no chat page is showing
pub const HOME_TITLE: &str = "AiDock";

/// Offset between cascaded page windows
const CASCADE_STEP: i32 = 24;

pub struct AppShell {
    catalog: Rc<PlatformCatalog>,
    config: AppConfig,
    store: Option<ConfigStore>,
    clock: Rc<dyn Clock>,
    registry: PageRegistry,
    renderers: HashMap<PageId, Box<dyn Renderer>>,
    factory: Box<dyn RendererFactory>,
    ui: Rc<dyn UiSurface>,
    nav: NavigationController,
    suspend: SuspendPolicy,
    guard: NavigationGuard,
    gate: RefreshGate,
    notifier: ThresholdNotifier,
    restorer: SessionRestorer,
    visible: bool,
}

impl AppShell {
    pub fn new(
        config: AppConfig,
        catalog: Rc<PlatformCatalog>,
        factory: Box<dyn RendererFactory>,
        ui: Rc<dyn UiSurface>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        log::info!("Initializing app shell");

        let registry =
            PageRegistry::new(Rc::clone(&clock)).with_limits(PageLimits::from(&config.limits));

        let mut suspend = SuspendPolicy::new(Rc::clone(&clock));
        suspend.set_timeout_minutes(Some(config.suspend.minutes));

        let mut nav = NavigationController::new(Rc::clone(&clock));
        let sync_ui = Rc::clone(&ui);
        let sync_catalog = Rc::clone(&catalog);
        nav.set_sync(move |state| {
            sync_ui.set_back_visible(state.is_chat());
            sync_ui.show_home(!state.is_chat());
            match state.platform() {
                Some(platform) => sync_ui.set_title(sync_catalog.display_name(platform)),
                None => sync_ui.set_title(HOME_TITLE),
            }
        });

        let guard = NavigationGuard::new(&config.navigation.allow_hosts);
        let notifier = ThresholdNotifier::new(config.advisory.page_threshold);

        Self {
            catalog,
            config,
            store: None,
            clock,
            registry,
            renderers: HashMap::new(),
            factory,
            ui,
            nav,
            suspend,
            guard,
            gate: RefreshGate::default(),
            notifier,
            restorer: SessionRestorer::new(),
            visible: false,
        }
    }

    /// Persist config changes through `store`
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PlatformCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.nav
    }

    pub fn suspend_policy(&self) -> &SuspendPolicy {
        &self.suspend
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn renderer(&self, id: &PageId) -> Option<&dyn Renderer> {
        self.renderers.get(id).map(|r| r.as_ref())
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_config(&self.config) {
            log::warn!("Failed to save config: {}", err);
        }
    }

    // Refresh batching

    /// Run `f` with selector refreshes deferred to a single trailing refresh
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let scope = self.gate.enter();
        let result = f(self);
        if self.gate.exit(scope) {
            self.refresh_selector();
        }
        result
    }

    fn request_refresh(&mut self) {
        if self.gate.request() {
            self.refresh_selector();
        }
    }

    /// Push the whole UI state again, e.g. once a freshly loaded chrome
    /// page is ready to receive it
    pub fn sync_ui(&mut self) {
        self.nav.resync();
        self.refresh_selector();
    }

    /// Rebuild the page selector. Selection events raised by the rebuild
    /// itself are ignored.
    pub fn refresh_selector(&mut self) {
        let entries = self.selector_entries();
        self.nav.begin_selector_rebuild();
        self.ui.refresh_selector(&entries);
        self.nav.end_selector_rebuild();
    }

    /// One row per open page, plus a bare row for enabled platforms with none
    pub fn selector_entries(&self) -> Vec<SelectorEntry> {
        let current_platform = self.nav.state().platform();
        let active = self.registry.active_id();
        let mut entries = Vec::new();

        for platform_id in &self.config.enabled_platforms {
            let name = self.catalog.display_name(platform_id);
            let pages = self.registry.pages_for(platform_id);

            if pages.is_empty() {
                entries.push(SelectorEntry {
                    platform_id: platform_id.clone(),
                    page_id: None,
                    label: name.to_string(),
                    selected: current_platform == Some(platform_id.as_str()),
                });
                continue;
            }

            for (index, page) in pages.iter().enumerate() {
                let label = if index == 0 {
                    name.to_string()
                } else {
                    format!("{} {}", name, index + 1)
                };
                entries.push(SelectorEntry {
                    platform_id: platform_id.clone(),
                    page_id: Some(page.id.clone()),
                    label,
                    selected: active == Some(&page.id),
                });
            }
        }
        entries
    }

    // Page lifecycle

    fn ensure_not_restoring(&self) -> AiDockResult<()> {
        if self.restorer.is_running() {
            return Err(AiDockError::RestoreInProgress);
        }
        Ok(())
    }

    fn next_geometry(&self) -> Geometry {
        let base = Geometry::default();
        let step = i32::try_from(self.registry.len() % 8).unwrap_or(0) * CASCADE_STEP;
        Geometry {
            x: base.x + step,
            y: base.y + step,
            ..base
        }
    }

    /// Open a new page for `platform_id` without showing it
    pub fn create_page(&mut self, platform_id: &str, kind: PageKind) -> AiDockResult<PageId> {
        self.ensure_not_restoring()?;
        self.spawn_page(None, platform_id, kind, None)
    }

    fn spawn_page(
        &mut self,
        restore_id: Option<PageId>,
        platform_id: &str,
        kind: PageKind,
        created_at: Option<u64>,
    ) -> AiDockResult<PageId> {
        let platform = self
            .catalog
            .get(platform_id)
            .cloned()
            .ok_or_else(|| AiDockError::UnknownPlatform(platform_id.to_string()))?;

        let geometry = self.next_geometry();
        let old_count = self.registry.len();
        let restoring = restore_id.is_some();
        let created_at = created_at.unwrap_or_else(|| self.clock.now_secs());
        let page = match restore_id {
            Some(id) => self.registry.restore(id, platform_id, &platform.url, geometry, created_at)?,
            None => self.registry.create(platform_id, &platform.url, geometry)?,
        };

        let mut renderer = match self.factory.create(&page, kind) {
            Ok(renderer) => renderer,
            Err(err) => {
                self.registry.remove(&page.id);
                log::warn!("Renderer for page {} failed: {}", page.id, err);
                return Err(match err {
                    AiDockError::CreationFailed(_) => err,
                    other => AiDockError::creation(other.to_string()),
                });
            }
        };
        renderer.set_hidden(true);
        self.renderers.insert(page.id.clone(), renderer);

        self.guard.register_page(&page.id, &platform);
        self.suspend.track(&page.id);

        if !restoring {
            self.config
                .record_window(platform_id, &page.id, page.created_at);
            self.persist();

            if self
                .notifier
                .notify_page_count_changed(old_count, self.registry.len())
            {
                self.show_page_advisory();
            }
        }

        self.request_refresh();
        Ok(page.id)
    }

    fn show_page_advisory(&self) {
        let message = format!(
            "You have more than {} pages open. Closing some will save memory.",
            self.notifier.threshold()
        );
        self.ui.show_advisory(&message);
    }

    /// Close a page. If it was showing, its oldest sibling takes over, or the
    /// shell goes home.
    pub fn close_page(&mut self, id: &PageId) -> AiDockResult<()> {
        self.ensure_not_restoring()?;
        let platform_id = self
            .registry
            .get(id)
            .map(|page| page.platform_id.clone())
            .ok_or_else(|| AiDockError::not_found(format!("page {}", id)))?;
        let was_current =
            self.registry.active_id() == Some(id) || self.nav.state().page_id() == Some(id);
        let old_count = self.registry.len();

        if let Some(mut renderer) = self.renderers.remove(id) {
            renderer.stop();
            renderer.set_hidden(true);
        }
        self.registry.remove(id);
        self.suspend.forget(id);
        self.guard.forget_page(id);
        self.nav.forget_page(id);
        self.config.forget_window(&platform_id, id);
        self.persist();

        if self
            .notifier
            .notify_page_count_changed(old_count, self.registry.len())
        {
            self.show_page_advisory();
        }

        if was_current {
            let sibling = self
                .registry
                .earliest_for(&platform_id, None)
                .map(|page| page.id.clone());
            match sibling {
                Some(sibling) => self.nav.retarget(Some(sibling)),
                None => self.nav.navigate_home(false),
            }
            self.reconcile();
        }

        self.request_refresh();
        Ok(())
    }

    /// Bring the page matching the navigation state to the front, creating one
    /// when the chosen platform has none.
    fn reconcile(&mut self) {
        let NavState::Chat { platform, page_id } = self.nav.state().clone() else {
            self.hide_active();
            return;
        };

        let existing = page_id
            .clone()
            .filter(|id| {
                self.registry
                    .get(id)
                    .map(|page| page.platform_id == platform)
                    .unwrap_or(false)
            })
            .or_else(|| {
                self.registry
                    .earliest_for(&platform, None)
                    .map(|page| page.id.clone())
            });

        let target = match existing {
            Some(id) => id,
            None => match self.create_page(&platform, PageKind::Foreground) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("Cannot open {}: {}", platform, err);
                    self.report_limit(&err);
                    self.stay_on_active();
                    return;
                }
            },
        };

        if page_id.as_ref() != Some(&target) {
            self.nav.retarget(Some(target.clone()));
        }
        self.show_page(&target);
        self.request_refresh();
    }

    /// Point navigation back at whatever page is still showing
    fn stay_on_active(&mut self) {
        let active = self.registry.active_id().and_then(|id| {
            self.registry
                .get(id)
                .map(|page| (page.platform_id.clone(), id.clone()))
        });
        match active {
            Some((platform, id)) => {
                self.nav.navigate_chat(&platform, Some(id), false);
            }
            None => {
                self.nav.navigate_home(false);
                self.hide_active();
            }
        }
    }

    fn report_limit(&self, err: &AiDockError) {
        if let AiDockError::LimitExceeded { limit, .. } = err {
            self.ui
                .show_advisory(&format!("Page limit of {} reached.", limit));
        }
    }

    /// Refuse a chat target that would need a page the limits do not allow
    fn check_target_capacity(
        &self,
        platform_id: &str,
        page_id: Option<&PageId>,
    ) -> AiDockResult<()> {
        let known = page_id
            .and_then(|id| self.registry.get(id))
            .map(|page| page.platform_id == platform_id)
            .unwrap_or(false);
        if known || self.registry.earliest_for(platform_id, None).is_some() {
            return Ok(());
        }
        self.registry.check_capacity(platform_id).map_err(|err| {
            self.report_limit(&err);
            err
        })
    }

    fn hide_active(&mut self) {
        if let Some(prev) = self.registry.clear_active() {
            if let Some(renderer) = self.renderers.get_mut(&prev) {
                renderer.set_hidden(true);
            }
            self.suspend.note_activity(&prev);
        }
        self.suspend.set_active(None);
        self.request_refresh();
    }

    fn show_page(&mut self, id: &PageId) {
        let prev = self.registry.active_id().cloned();
        if prev.as_ref() != Some(id) {
            self.registry.set_active(id);
            if let Some(prev) = prev {
                if let Some(renderer) = self.renderers.get_mut(&prev) {
                    renderer.set_hidden(true);
                }
                // idle time starts counting from the moment it went to the back
                self.suspend.note_activity(&prev);
            }
        }
        self.suspend.set_active(Some(id));

        if self.suspend.is_suspended(id) {
            self.resume_page(id);
        } else {
            self.suspend.note_activity(id);
        }

        if let Some(renderer) = self.renderers.get_mut(id) {
            renderer.set_hidden(false);
        }
    }

    /// Returns false when the page could not be suspended and is still live
    fn suspend_page(&mut self, id: &PageId) -> bool {
        let Some(renderer) = self.renderers.get_mut(id) else {
            return false;
        };
        match suspend_renderer(renderer.as_mut()) {
            Ok(Some(url)) => {
                self.registry.set_session_value(id, LAST_URL_KEY, url);
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("Could not suspend page {}: {}", id, err);
                return false;
            }
        }
        self.registry.set_state(id, PageState::Hidden);
        if self.suspend.mark_suspended(id) {
            log::info!("Suspended page {}", id);
        }
        true
    }

    fn resume_page(&mut self, id: &PageId) {
        let last_url = self
            .registry
            .get(id)
            .and_then(|page| page.last_url().map(str::to_string));
        if let Some(renderer) = self.renderers.get_mut(id) {
            resume_renderer(renderer.as_mut(), last_url.as_deref());
        }
        if self.suspend.mark_resumed(id) {
            log::info!("Resumed page {}", id);
        }
        if self.registry.get(id).map(|page| page.state) == Some(PageState::Hidden) {
            self.registry.set_state(id, PageState::Inactive);
        }
    }

    /// Suspend every background page that has been idle past the timeout
    pub fn tick(&mut self) -> usize {
        let candidates: Vec<PageId> = self
            .registry
            .all_pages()
            .into_iter()
            .filter(|page| !page.is_active())
            .map(|page| page.id.clone())
            .filter(|id| self.suspend.should_suspend(id))
            .collect();

        candidates
            .iter()
            .filter(|id| self.suspend_page(id))
            .count()
    }

    pub fn set_suspend_minutes(&mut self, minutes: Option<i64>) {
        self.suspend.set_timeout_minutes(minutes);
        self.config.suspend.minutes = self.suspend.timeout_minutes().map_or(0, i64::from);
        self.persist();
    }

    pub fn set_allow_hosts(&mut self, hosts: Vec<String>) {
        self.guard.set_allow_hosts(&hosts);
        self.config.navigation.allow_hosts = hosts;
        self.persist();
    }

    // Startup

    /// Bring back every persisted page in the background. Runs once; later
    /// calls return 0.
    pub fn restore_on_startup(&mut self) -> usize {
        if !self.restorer.start() {
            log::debug!("Session restore already ran");
            return 0;
        }

        let plan = SessionRestorer::plan(&self.config);
        log::info!("Restoring {} pages", plan.len());

        let scope = self.gate.enter();
        let mut restored = 0;
        let mut dropped = Vec::new();
        for entry in plan {
            match self.spawn_page(
                Some(entry.page_id.clone()),
                &entry.platform_id,
                PageKind::Background,
                Some(entry.created_at),
            ) {
                Ok(_) => restored += 1,
                Err(err) => {
                    log::warn!("Could not restore page {}: {}", entry.page_id, err);
                    if matches!(err, AiDockError::UnknownPlatform(_)) {
                        dropped.push(entry);
                    }
                }
            }
        }
        // restore ends in exactly one refresh whether or not anything was queued
        let _ = self.gate.exit(scope);
        self.restorer.finish();

        for entry in &dropped {
            self.config.forget_window(&entry.platform_id, &entry.page_id);
        }
        if !dropped.is_empty() {
            self.persist();
        }

        self.notifier.prime(self.registry.len());
        self.nav.resync();
        self.request_refresh();
        restored
    }

    // Navigation

    pub fn navigate_home(&mut self) {
        self.nav.navigate_home(true);
        self.reconcile();
    }

    /// Show a page (or the platform's first page when `page_id` is `None`)
    pub fn open_chat(&mut self, platform_id: &str, page_id: Option<PageId>) -> AiDockResult<()> {
        self.ensure_known(platform_id)?;
        self.check_target_capacity(platform_id, page_id.as_ref())?;
        if self.nav.navigate_chat(platform_id, page_id, true) {
            self.reconcile();
        }
        Ok(())
    }

    pub fn go_back(&mut self) -> bool {
        if !self.nav.go_back() {
            return false;
        }
        self.reconcile();
        true
    }

    /// Selection made in the page dropdown
    pub fn select(&mut self, platform_id: &str, page_id: Option<PageId>) -> AiDockResult<()> {
        self.ensure_known(platform_id)?;
        if !self.config.is_enabled(platform_id) {
            return Err(AiDockError::Config(format!(
                "platform {} is not enabled",
                platform_id
            )));
        }
        self.check_target_capacity(platform_id, page_id.as_ref())?;
        if self.nav.handle_selector_change(platform_id, page_id) {
            self.reconcile();
        }
        Ok(())
    }

    /// Open another page of a platform and show it
    pub fn add_page(&mut self, platform_id: &str) -> AiDockResult<PageId> {
        self.ensure_known(platform_id)?;
        if self.config.enable_platform(platform_id) {
            self.persist();
        }
        let id = self
            .create_page(platform_id, PageKind::Foreground)
            .map_err(|err| {
                self.report_limit(&err);
                err
            })?;
        self.nav.navigate_chat(platform_id, Some(id.clone()), true);
        self.reconcile();
        Ok(id)
    }

    /// Move focus to the next page in registration order
    pub fn cycle_page(&mut self) -> Option<PageId> {
        let current = self.registry.active_id().cloned();
        let next = self.registry.next_after(current.as_ref())?;
        if current.as_ref() == Some(&next) {
            return None;
        }
        let platform = self.registry.get(&next)?.platform_id.clone();

        self.nav.navigate_chat(&platform, Some(next.clone()), true);
        self.reconcile();
        self.tick();
        Some(next)
    }

    // Platforms

    fn ensure_known(&self, platform_id: &str) -> AiDockResult<()> {
        if self.catalog.contains(platform_id) {
            Ok(())
        } else {
            Err(AiDockError::UnknownPlatform(platform_id.to_string()))
        }
    }

    /// Fuzzy-match the catalog by display name and hand the result to the
    /// home grid. A blank query lists every platform in catalog order.
    pub fn filter_platforms(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        let ids: Vec<String> = if query.is_empty() {
            self.catalog.iter().map(|p| p.id.clone()).collect()
        } else {
            self.catalog
                .search(query)
                .into_iter()
                .map(|p| p.id.clone())
                .collect()
        };
        log::debug!("Platform filter {:?} matched {} platforms", query, ids.len());
        self.ui.show_platform_matches(&ids);
        ids
    }

    pub fn enable_platform(&mut self, platform_id: &str) -> AiDockResult<()> {
        self.ensure_known(platform_id)?;
        if self.config.enable_platform(platform_id) {
            log::info!("Enabled platform {}", platform_id);
            self.persist();
            self.request_refresh();
        }
        Ok(())
    }

    /// Disable a platform, closing all of its pages
    pub fn disable_platform(&mut self, platform_id: &str) -> AiDockResult<()> {
        self.ensure_known(platform_id)?;
        self.batch(|shell| {
            let pages: Vec<PageId> = shell
                .registry
                .pages_for(platform_id)
                .iter()
                .map(|page| page.id.clone())
                .collect();
            for id in &pages {
                if let Err(err) = shell.close_page(id) {
                    log::warn!("Failed to close page {}: {}", id, err);
                }
            }

            shell.nav.forget_platform(platform_id);
            if shell.nav.state().platform() == Some(platform_id) {
                shell.nav.navigate_home(false);
                shell.reconcile();
            }

            if shell.config.disable_platform(platform_id) {
                log::info!("Disabled platform {}", platform_id);
                shell.persist();
            }
            shell.request_refresh();
        });
        Ok(())
    }

    pub fn set_default_platform(&mut self, platform_id: &str) -> AiDockResult<()> {
        self.ensure_known(platform_id)?;
        self.config.default_platform = Some(platform_id.to_string());
        self.persist();
        Ok(())
    }

    // Visibility

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.ui.set_window_visible(visible);

        // background pages follow the window in and out of the minimized state
        let (from, to) = if visible {
            (PageState::Minimized, PageState::Inactive)
        } else {
            (PageState::Inactive, PageState::Minimized)
        };
        let ids: Vec<PageId> = self
            .registry
            .all_pages()
            .into_iter()
            .filter(|page| page.state == from)
            .map(|page| page.id.clone())
            .collect();
        for id in &ids {
            self.registry.set_state(id, to);
        }
        if visible {
            if let Some(id) = self.registry.active_id().cloned() {
                self.suspend.note_activity(&id);
            }
        }
    }

    pub fn toggle_visibility(&mut self) -> bool {
        self.set_visible(!self.visible);
        self.visible
    }

    // Inputs

    /// Run one bridge command. Failures are logged, never propagated.
    pub fn handle_command(&mut self, command: Command) {
        let action = command.action();
        log::debug!("Bridge command: {:?}", command);

        let result = self.batch(|shell| shell.dispatch(command));
        match result {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => log::info!("Command {}: {}", action, err),
            Err(err) => log::warn!("Command {} failed: {}", action, err),
        }
    }

    fn dispatch(&mut self, command: Command) -> AiDockResult<()> {
        match command {
            Command::AddPlatform { platform_id } => self.enable_platform(&platform_id),
            Command::RemovePlatform { platform_id } => self.disable_platform(&platform_id),
            Command::AddWindow { platform_id } => self.add_page(&platform_id).map(|_| ()),
            Command::RemoveWindow { window_id, .. } => self.close_page(&window_id),
            Command::SelectDefaultAi { platform_id } => self.set_default_platform(&platform_id),
            Command::NavigateToHomepage => {
                self.navigate_home();
                Ok(())
            }
            Command::GoBack => {
                self.go_back();
                Ok(())
            }
            Command::HandleAiSelection {
                platform_id,
                window_id,
            } => self.select(&platform_id, window_id),
            Command::RetryLoad { window_id } => {
                if !self.retry_load(&window_id) {
                    log::debug!("No retry pending for page {}", window_id);
                }
                Ok(())
            }
            Command::FilterPlatforms { query } => {
                self.filter_platforms(&query);
                Ok(())
            }
        }
    }

    /// Perform an action fired by the hotkey dispatcher
    pub fn handle_hotkey(&mut self, action: HotkeyAction) {
        match action {
            HotkeyAction::ToggleVisibility => {
                self.toggle_visibility();
            }
            HotkeyAction::CyclePage => {
                if !self.visible {
                    return;
                }
                self.batch(|shell| shell.cycle_page());
            }
            HotkeyAction::Captured { role, combo } => self.finish_capture(role, Ok(combo)),
            HotkeyAction::CaptureCancelled { role } => {
                self.finish_capture(role, Err(AiDockError::BindingCaptureAborted));
            }
        }
    }

    /// Only a completed capture reaches storage
    fn finish_capture(&mut self, role: HotkeyRole, outcome: AiDockResult<KeyCombo>) {
        let combo = match outcome {
            Ok(combo) => combo,
            Err(err) => {
                log::info!("{:?} binding unchanged: {}", role, err);
                return;
            }
        };
        log::info!("New {:?} binding: {}", role, combo);
        match role {
            HotkeyRole::Launcher => {
                let Some(store) = &self.store else {
                    return;
                };
                let launcher = LauncherConfig {
                    binding: Some(combo),
                };
                if let Err(err) = store.save_launcher(&launcher) {
                    log::warn!("Failed to save launcher binding: {}", err);
                }
            }
            HotkeyRole::Switcher => {
                self.config.hotkeys.switcher = Some(combo);
                self.persist();
            }
        }
    }

    // Renderer events

    pub fn on_user_activity(&mut self, id: &PageId) {
        self.suspend.note_activity(id);
    }

    pub fn on_navigation_request(&self, id: &PageId, url: &str) -> NavigationDecision {
        self.guard.check(id, url)
    }

    pub fn on_load_started(&mut self, id: &PageId) {
        if self.suspend.is_suspended(id) {
            return;
        }
        self.registry.set_state(id, PageState::Loading);
    }

    pub fn on_load_finished(&mut self, id: &PageId, url: &str, title: Option<String>) {
        if is_blank(Some(url)) {
            return;
        }
        self.guard.clear_failure(id);
        self.registry.set_url(id, url);
        if title.is_some() {
            self.registry.set_title(id, title);
        }
        if self.registry.get(id).map(|page| page.state) != Some(PageState::Hidden) {
            let settled = if self.visible {
                PageState::Inactive
            } else {
                PageState::Minimized
            };
            self.registry.set_state(id, settled);
        }
    }

    pub fn on_load_failed(&mut self, id: &PageId, url: &str, reason: &str) {
        if !self.registry.contains(id) {
            return;
        }
        self.registry.set_state(id, PageState::Error);
        let failure = self.guard.record_failure(id, url, reason);
        self.ui.show_load_failure(&failure);
    }

    /// The user pressed retry. Only the first press after a failure reloads.
    pub fn retry_load(&mut self, id: &PageId) -> bool {
        let Some(url) = self.guard.take_retry(id) else {
            return false;
        };
        let Some(renderer) = self.renderers.get_mut(id) else {
            return false;
        };
        match renderer.load(&url) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Retry of {} failed: {}", url, err);
                false
            }
        }
    }
}
