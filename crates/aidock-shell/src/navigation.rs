//! Home/chat navigation state machine with a back-stack

use aidock_core::types::{Clock, PageId};
use std::rc::Rc;

/// Maximum number of frames kept on the back-stack
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Home,
    Chat {
        platform: String,
        page_id: Option<PageId>,
    },
}

impl NavState {
    pub fn chat(platform: impl Into<String>, page_id: Option<PageId>) -> Self {
        Self::Chat {
            platform: platform.into(),
            page_id,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat { .. })
    }

    pub fn platform(&self) -> Option<&str> {
        match self {
            Self::Home => None,
            Self::Chat { platform, .. } => Some(platform),
        }
    }

    pub fn page_id(&self) -> Option<&PageId> {
        match self {
            Self::Home => None,
            Self::Chat { page_id, .. } => page_id.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFrame {
    pub state: NavState,
    pub timestamp: u64,
}

pub type SyncCallback = Box<dyn FnMut(&NavState)>;

pub struct NavigationController {
    state: NavState,
    history: Vec<HistoryFrame>,
    clock: Rc<dyn Clock>,
    on_sync: Option<SyncCallback>,
    rebuilding_selector: bool,
}

impl NavigationController {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            state: NavState::Home,
            history: Vec::new(),
            clock,
            on_sync: None,
            rebuilding_selector: false,
        }
    }

    /// Install the UI-sync callback run after every transition
    pub fn set_sync(&mut self, on_sync: impl FnMut(&NavState) + 'static) {
        self.on_sync = Some(Box::new(on_sync));
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn history(&self) -> &[HistoryFrame] {
        &self.history
    }

    fn push_current(&mut self) {
        let frame = HistoryFrame {
            state: self.state.clone(),
            timestamp: self.clock.now_secs(),
        };
        self.history.push(frame);
        if self.history.len() > MAX_HISTORY {
            let overflow = self.history.len() - MAX_HISTORY;
            self.history.drain(..overflow);
        }
    }

    fn enter(&mut self, state: NavState) {
        log::debug!("Navigation: {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some(sync) = self.on_sync.as_mut() {
            sync(&self.state);
        }
    }

    /// Re-run the UI sync for the current state without transitioning
    pub fn resync(&mut self) {
        if let Some(sync) = self.on_sync.as_mut() {
            sync(&self.state);
        }
    }

    pub fn navigate_home(&mut self, save_current: bool) {
        if save_current && self.state.is_chat() {
            self.push_current();
        }
        self.enter(NavState::Home);
    }

    /// Enter a chat page. Re-entering the exact current target is an in-page
    /// refresh and does nothing; returns whether a transition happened.
    pub fn navigate_chat(
        &mut self,
        platform: &str,
        page_id: Option<PageId>,
        save_current: bool,
    ) -> bool {
        let target = NavState::chat(platform, page_id);
        if target == self.state {
            return false;
        }

        if save_current {
            self.push_current();
        }
        self.enter(target);
        true
    }

    pub fn go_back(&mut self) -> bool {
        while let Some(frame) = self.history.pop() {
            if frame.state == self.state {
                continue;
            }
            match frame.state {
                NavState::Home => self.navigate_home(false),
                NavState::Chat { platform, page_id } => {
                    self.navigate_chat(&platform, page_id, false);
                }
            }
            return true;
        }

        if self.state.is_chat() {
            self.navigate_home(false);
            return true;
        }
        false
    }

    /// Selection made in the page dropdown. Always a real transition, except
    /// while the dropdown is being rebuilt, when it is ignored.
    pub fn handle_selector_change(&mut self, platform: &str, page_id: Option<PageId>) -> bool {
        if self.rebuilding_selector {
            log::debug!("Ignoring selector change during rebuild");
            return false;
        }

        let target = NavState::chat(platform, page_id);
        if target != self.state {
            self.push_current();
        }
        self.enter(target);
        true
    }

    pub fn begin_selector_rebuild(&mut self) {
        self.rebuilding_selector = true;
    }

    pub fn end_selector_rebuild(&mut self) {
        self.rebuilding_selector = false;
    }

    /// Drop back-stack frames that point at a closed page
    pub fn forget_page(&mut self, page_id: &PageId) {
        self.history
            .retain(|frame| frame.state.page_id() != Some(page_id));
    }

    /// Drop back-stack frames of a disabled platform
    pub fn forget_platform(&mut self, platform: &str) {
        self.history
            .retain(|frame| frame.state.platform() != Some(platform));
    }

    /// Point the current chat state at a different page of the same platform
    /// without touching the back-stack
    pub fn retarget(&mut self, page_id: Option<PageId>) {
        if let NavState::Chat { platform, .. } = &self.state {
            let target = NavState::chat(platform.clone(), page_id);
            self.enter(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidock_core::types::ManualClock;
    use std::cell::RefCell;

    fn controller() -> (NavigationController, Rc<RefCell<Vec<NavState>>>) {
        let mut nav = NavigationController::new(Rc::new(ManualClock::new(0)));
        let synced = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&synced);
        nav.set_sync(move |state| sink.borrow_mut().push(state.clone()));
        (nav, synced)
    }

    #[test]
    fn test_back_walks_the_stack() {
        let (mut nav, _) = controller();
        nav.navigate_chat("a", None, true);
        nav.navigate_chat("b", None, true);

        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::chat("a", None));
        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::Home);
        assert!(!nav.go_back());
    }

    #[test]
    fn test_back_on_bare_home_is_noop() {
        let (mut nav, synced) = controller();
        assert!(!nav.go_back());
        assert!(synced.borrow().is_empty());
        assert!(nav.history().is_empty());
    }

    #[test]
    fn test_back_without_history_falls_back_home() {
        let (mut nav, _) = controller();
        nav.navigate_chat("a", None, false);
        assert!(nav.history().is_empty());

        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::Home);
    }

    #[test]
    fn test_home_pushes_chat_frame() {
        let (mut nav, _) = controller();
        let page = PageId::from("p");
        nav.navigate_chat("a", Some(page.clone()), false);
        nav.navigate_home(true);

        assert_eq!(nav.history().len(), 1);
        assert_eq!(nav.history()[0].state, NavState::chat("a", Some(page)));
        nav.navigate_home(true);
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn test_same_target_is_not_a_transition() {
        let (mut nav, synced) = controller();
        assert!(nav.navigate_chat("a", None, true));
        assert!(!nav.navigate_chat("a", None, true));
        assert_eq!(nav.history().len(), 1);
        assert_eq!(synced.borrow().len(), 1);
    }

    #[test]
    fn test_selector_change_always_syncs() {
        let (mut nav, synced) = controller();
        nav.handle_selector_change("a", None);
        nav.handle_selector_change("a", None);

        assert_eq!(synced.borrow().len(), 2);
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn test_selector_change_ignored_during_rebuild() {
        let (mut nav, synced) = controller();
        nav.begin_selector_rebuild();
        assert!(!nav.handle_selector_change("a", None));
        nav.end_selector_rebuild();

        assert_eq!(nav.state(), &NavState::Home);
        assert!(synced.borrow().is_empty());
        assert!(nav.handle_selector_change("a", None));
    }

    #[test]
    fn test_sync_sees_every_transition() {
        let (mut nav, synced) = controller();
        nav.navigate_chat("a", None, true);
        nav.navigate_home(true);
        nav.go_back();

        let states = synced.borrow();
        assert_eq!(
            *states,
            vec![NavState::chat("a", None), NavState::Home, NavState::chat("a", None)]
        );
    }

    #[test]
    fn test_forget_page_purges_frames() {
        let (mut nav, _) = controller();
        let gone = PageId::from("gone");
        nav.navigate_chat("a", Some(gone.clone()), true);
        nav.navigate_chat("b", None, true);
        nav.forget_page(&gone);

        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::Home);
    }

    #[test]
    fn test_history_is_capped() {
        let (mut nav, _) = controller();
        for i in 0..(MAX_HISTORY + 10) {
            nav.navigate_chat(&format!("p{i}"), None, true);
        }
        assert_eq!(nav.history().len(), MAX_HISTORY);
    }
}
