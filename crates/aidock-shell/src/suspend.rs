//! Idle tracking and background suspension of pages

use crate::surface::{is_blank, Renderer};
use aidock_core::types::{Clock, PageId, BLANK_URL};
use aidock_core::AiDockResult;
use std::collections::HashMap;
use std::rc::Rc;

/// Interval between suspend checks on the main loop
pub const SUSPEND_TICK_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
struct Tracker {
    last_activity: u64,
    suspended: bool,
}

pub struct SuspendPolicy {
    timeout_minutes: Option<u32>,
    pages: HashMap<PageId, Tracker>,
    active: Option<PageId>,
    clock: Rc<dyn Clock>,
}

impl SuspendPolicy {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            timeout_minutes: None,
            pages: HashMap::new(),
            active: None,
            clock,
        }
    }

    /// `None` or anything `<= 0` disables suspension
    pub fn set_timeout_minutes(&mut self, minutes: Option<i64>) {
        self.timeout_minutes = minutes
            .filter(|m| *m > 0)
            .map(|m| u32::try_from(m).unwrap_or(u32::MAX));
        log::info!("Suspend timeout set to {:?} minutes", self.timeout_minutes);
    }

    pub fn timeout_minutes(&self) -> Option<u32> {
        self.timeout_minutes
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout_minutes.is_some()
    }

    /// Start tracking a page with a fresh idle clock
    pub fn track(&mut self, id: &PageId) {
        let now = self.clock.now_secs();
        self.pages.insert(
            id.clone(),
            Tracker {
                last_activity: now,
                suspended: false,
            },
        );
    }

    pub fn forget(&mut self, id: &PageId) {
        self.pages.remove(id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
    }

    /// The foreground page is never a suspend candidate
    pub fn set_active(&mut self, id: Option<&PageId>) {
        self.active = id.cloned();
    }

    /// Reset the idle clock. A suspended page stays suspended until
    /// `mark_resumed`.
    pub fn note_activity(&mut self, id: &PageId) {
        let now = self.clock.now_secs();
        self.pages
            .entry(id.clone())
            .and_modify(|t| t.last_activity = now)
            .or_insert(Tracker {
                last_activity: now,
                suspended: false,
            });
    }

    pub fn should_suspend(&self, id: &PageId) -> bool {
        let Some(minutes) = self.timeout_minutes else {
            return false;
        };
        if self.active.as_ref() == Some(id) {
            return false;
        }
        let Some(tracker) = self.pages.get(id) else {
            return false;
        };
        if tracker.suspended {
            return false;
        }

        let idle = self.clock.now_secs().saturating_sub(tracker.last_activity);
        idle >= u64::from(minutes) * 60
    }

    /// Returns true if the flag changed
    pub fn mark_suspended(&mut self, id: &PageId) -> bool {
        match self.pages.get_mut(id) {
            Some(tracker) if !tracker.suspended => {
                tracker.suspended = true;
                true
            }
            _ => false,
        }
    }

    /// Clears the flag and resets the idle clock. Returns true if the flag changed.
    pub fn mark_resumed(&mut self, id: &PageId) -> bool {
        let now = self.clock.now_secs();
        match self.pages.get_mut(id) {
            Some(tracker) => {
                let was = tracker.suspended;
                tracker.suspended = false;
                tracker.last_activity = now;
                was
            }
            None => false,
        }
    }

    pub fn is_suspended(&self, id: &PageId) -> bool {
        self.pages.get(id).map(|t| t.suspended).unwrap_or(false)
    }
}

/// Swap the renderer's content for a blank page.
///
/// Returns the URL that was showing, or `None` when the renderer was already
/// blank and nothing changed. Fails when the blank page could not be loaded,
/// in which case the renderer is still live.
pub fn suspend_renderer(renderer: &mut dyn Renderer) -> AiDockResult<Option<String>> {
    let current = renderer.current_url();
    if is_blank(current.as_deref()) {
        return Ok(None);
    }

    renderer.stop();
    renderer.load(BLANK_URL)?;
    Ok(current)
}

/// Reload `last_url` if the renderer is blank. Returns true if a load was issued.
pub fn resume_renderer(renderer: &mut dyn Renderer, last_url: Option<&str>) -> bool {
    if !is_blank(renderer.current_url().as_deref()) || is_blank(last_url) {
        return false;
    }
    let Some(url) = last_url else {
        return false;
    };

    match renderer.load(url) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Failed to resume {}: {}", url, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidock_core::types::ManualClock;
    use aidock_core::AiDockError;

    #[derive(Default)]
    struct StubRenderer {
        url: Option<String>,
        loads: Vec<String>,
        stops: usize,
        refuse_blank: bool,
    }

    impl Renderer for StubRenderer {
        fn load(&mut self, url: &str) -> AiDockResult<()> {
            if self.refuse_blank && url == BLANK_URL {
                return Err(AiDockError::load(url, "renderer gone"));
            }
            self.url = Some(url.to_string());
            self.loads.push(url.to_string());
            Ok(())
        }
        fn stop(&mut self) {
            self.stops += 1;
        }
        fn is_loading(&self) -> bool {
            false
        }
        fn reload(&mut self) {}
        fn set_hidden(&mut self, _hidden: bool) {}
        fn current_url(&self) -> Option<String> {
            self.url.clone()
        }
    }

    fn policy(minutes: i64) -> (SuspendPolicy, ManualClock) {
        let clock = ManualClock::new(0);
        let mut policy = SuspendPolicy::new(Rc::new(clock.clone()));
        policy.set_timeout_minutes(Some(minutes));
        (policy, clock)
    }

    #[test]
    fn test_disabled_policy_never_suspends() {
        let (mut policy, clock) = policy(0);
        let id = PageId::from("a");
        policy.track(&id);
        clock.advance(10_000);
        assert!(!policy.is_enabled());
        assert!(!policy.should_suspend(&id));

        policy.set_timeout_minutes(None);
        assert!(!policy.should_suspend(&id));
    }

    #[test]
    fn test_suspends_after_timeout() {
        let (mut policy, clock) = policy(5);
        let id = PageId::from("a");
        policy.track(&id);

        clock.advance(299);
        assert!(!policy.should_suspend(&id));
        clock.advance(1);
        assert!(policy.should_suspend(&id));
        assert!(!policy.should_suspend(&PageId::from("unknown")));
    }

    #[test]
    fn test_active_page_is_never_a_candidate() {
        let (mut policy, clock) = policy(1);
        let id = PageId::from("a");
        policy.track(&id);
        policy.set_active(Some(&id));
        clock.advance(3_600);
        assert!(!policy.should_suspend(&id));

        policy.set_active(None);
        assert!(policy.should_suspend(&id));
    }

    #[test]
    fn test_suspended_page_is_not_resuspended() {
        let (mut policy, clock) = policy(1);
        let id = PageId::from("a");
        policy.track(&id);
        clock.advance(60);

        assert!(policy.mark_suspended(&id));
        assert!(!policy.should_suspend(&id));
        assert!(!policy.mark_suspended(&id));
    }

    #[test]
    fn test_activity_does_not_clear_suspended_flag() {
        let (mut policy, clock) = policy(1);
        let id = PageId::from("a");
        policy.track(&id);
        clock.advance(60);
        policy.mark_suspended(&id);

        policy.note_activity(&id);
        assert!(policy.is_suspended(&id));
    }

    #[test]
    fn test_resume_resets_idle_clock() {
        let (mut policy, clock) = policy(1);
        let id = PageId::from("a");
        policy.track(&id);
        clock.advance(120);
        policy.mark_suspended(&id);

        assert!(policy.mark_resumed(&id));
        assert!(!policy.should_suspend(&id));
        assert!(!policy.mark_resumed(&id));
        clock.advance(60);
        assert!(policy.should_suspend(&id));
    }

    #[test]
    fn test_suspend_effect_captures_url_once() {
        let mut renderer = StubRenderer::default();
        renderer.load("https://claude.ai/chat/1").unwrap();

        let captured = suspend_renderer(&mut renderer).unwrap();
        assert_eq!(captured.as_deref(), Some("https://claude.ai/chat/1"));
        assert_eq!(renderer.current_url().as_deref(), Some(BLANK_URL));
        assert_eq!(renderer.stops, 1);

        assert_eq!(suspend_renderer(&mut renderer).unwrap(), None);
        assert_eq!(renderer.stops, 1);
    }

    #[test]
    fn test_failed_blank_load_is_an_error() {
        let mut renderer = StubRenderer {
            refuse_blank: true,
            ..Default::default()
        };
        renderer.load("https://gemini.google.com/app").unwrap();

        assert!(matches!(
            suspend_renderer(&mut renderer),
            Err(AiDockError::LoadFailed { .. })
        ));
        assert_eq!(
            renderer.current_url().as_deref(),
            Some("https://gemini.google.com/app")
        );
    }

    #[test]
    fn test_resume_effect_is_idempotent() {
        let mut renderer = StubRenderer::default();
        renderer.load(BLANK_URL).unwrap();

        assert!(resume_renderer(&mut renderer, Some("https://claude.ai/")));
        let loads = renderer.loads.len();
        assert!(!resume_renderer(&mut renderer, Some("https://claude.ai/")));
        assert_eq!(renderer.loads.len(), loads);
    }

    #[test]
    fn test_resume_without_saved_url_does_nothing() {
        let mut renderer = StubRenderer::default();
        assert!(!resume_renderer(&mut renderer, None));
        assert!(!resume_renderer(&mut renderer, Some(BLANK_URL)));
        assert!(renderer.loads.is_empty());
    }
}
