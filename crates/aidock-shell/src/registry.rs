//! Page registry - arena of pages keyed by id, plus the active-page pointer

use aidock_core::config::LimitsConfig;
use aidock_core::types::{Clock, Geometry, Page, PageId, PageState};
use aidock_core::{AiDockError, AiDockResult};
use std::collections::HashMap;
use std::rc::Rc;

/// Optional caps on open pages; `None` means unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLimits {
    pub max_per_platform: Option<usize>,
    pub max_total: Option<usize>,
}

impl From<&LimitsConfig> for PageLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_per_platform: config.max_per_platform,
            max_total: config.max_total,
        }
    }
}

struct Slot {
    seq: u64,
    page: Page,
}

pub struct PageRegistry {
    pages: HashMap<PageId, Slot>,
    active_id: Option<PageId>,
    limits: PageLimits,
    clock: Rc<dyn Clock>,
    next_seq: u64,
}

impl PageRegistry {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            pages: HashMap::new(),
            active_id: None,
            limits: PageLimits::default(),
            clock,
            next_seq: 0,
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fails with `LimitExceeded` when another page of `platform_id` would
    /// break a configured limit
    pub fn check_capacity(&self, platform_id: &str) -> AiDockResult<()> {
        if let Some(max) = self.limits.max_total {
            if self.pages.len() >= max {
                return Err(AiDockError::LimitExceeded {
                    platform: platform_id.to_string(),
                    limit: max,
                });
            }
        }

        if let Some(max) = self.limits.max_per_platform {
            if self.count_for(platform_id) >= max {
                return Err(AiDockError::LimitExceeded {
                    platform: platform_id.to_string(),
                    limit: max,
                });
            }
        }

        Ok(())
    }

    pub fn can_create(&self, platform_id: &str) -> bool {
        self.check_capacity(platform_id).is_ok()
    }

    /// Allocate a new inactive page.
    ///
    /// The caller owns bringing up the renderer and must `remove` the page
    /// again if that fails.
    pub fn create(
        &mut self,
        platform_id: &str,
        url: &str,
        geometry: Geometry,
    ) -> AiDockResult<Page> {
        let created_at = self.clock.now_secs();
        self.insert(PageId::new(), platform_id, url, geometry, created_at)
    }

    /// Re-create a persisted page under its original id and creation time
    pub fn restore(
        &mut self,
        id: PageId,
        platform_id: &str,
        url: &str,
        geometry: Geometry,
        created_at: u64,
    ) -> AiDockResult<Page> {
        if self.pages.contains_key(&id) {
            return Err(AiDockError::creation(format!("page {} already exists", id)));
        }
        self.insert(id, platform_id, url, geometry, created_at)
    }

    fn insert(
        &mut self,
        id: PageId,
        platform_id: &str,
        url: &str,
        geometry: Geometry,
        created_at: u64,
    ) -> AiDockResult<Page> {
        self.check_capacity(platform_id)?;

        let page = Page {
            id: id.clone(),
            platform_id: platform_id.to_string(),
            state: PageState::Inactive,
            geometry,
            created_at,
            last_active_at: None,
            url: url.to_string(),
            title: None,
            session_data: HashMap::new(),
        };

        log::info!("Created page {} for platform {}", id, platform_id);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pages.insert(
            id,
            Slot {
                seq,
                page: page.clone(),
            },
        );
        Ok(page)
    }

    /// Remove a page. Clears the active pointer if it pointed here.
    pub fn remove(&mut self, id: &PageId) -> bool {
        if self.pages.remove(id).is_none() {
            return false;
        }

        log::info!("Removed page {}", id);
        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
        }
        true
    }

    pub fn set_active(&mut self, id: &PageId) -> bool {
        if !self.pages.contains_key(id) {
            return false;
        }

        if let Some(prev) = self.active_id.take() {
            if prev != *id {
                if let Some(slot) = self.pages.get_mut(&prev) {
                    slot.page.state = PageState::Inactive;
                }
            }
        }

        let now = self.clock.now_secs();
        if let Some(slot) = self.pages.get_mut(id) {
            slot.page.state = PageState::Active;
            slot.page.last_active_at = Some(now);
        }
        self.active_id = Some(id.clone());
        log::debug!("Active page is now {}", id);
        true
    }

    /// Deactivate the current page, leaving nothing active
    pub fn clear_active(&mut self) -> Option<PageId> {
        let prev = self.active_id.take()?;
        if let Some(slot) = self.pages.get_mut(&prev) {
            slot.page.state = PageState::Inactive;
        }
        Some(prev)
    }

    /// Set a non-active lifecycle state. Activation goes through `set_active`,
    /// and the active page keeps `Active` until something else is activated.
    pub fn set_state(&mut self, id: &PageId, state: PageState) -> bool {
        if state == PageState::Active || self.active_id.as_ref() == Some(id) {
            return false;
        }
        match self.pages.get_mut(id) {
            Some(slot) => {
                slot.page.state = state;
                true
            }
            None => false,
        }
    }

    pub fn set_url(&mut self, id: &PageId, url: &str) -> bool {
        match self.pages.get_mut(id) {
            Some(slot) => {
                slot.page.url = url.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, id: &PageId, title: Option<String>) -> bool {
        match self.pages.get_mut(id) {
            Some(slot) => {
                slot.page.title = title;
                true
            }
            None => false,
        }
    }

    pub fn set_session_value(&mut self, id: &PageId, key: &str, value: String) -> bool {
        match self.pages.get_mut(id) {
            Some(slot) => {
                slot.page.session_data.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &PageId) -> Option<&Page> {
        self.pages.get(id).map(|slot| &slot.page)
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.pages.contains_key(id)
    }

    pub fn active_id(&self) -> Option<&PageId> {
        self.active_id.as_ref()
    }

    pub fn active(&self) -> Option<&Page> {
        self.active_id.as_ref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn count_for(&self, platform_id: &str) -> usize {
        self.pages
            .values()
            .filter(|slot| slot.page.platform_id == platform_id)
            .count()
    }

    fn sorted(mut slots: Vec<&Slot>) -> Vec<&Page> {
        slots.sort_by_key(|slot| (slot.page.created_at, slot.seq));
        slots.into_iter().map(|slot| &slot.page).collect()
    }

    /// Pages of one platform, oldest first
    pub fn pages_for(&self, platform_id: &str) -> Vec<&Page> {
        let slots = self
            .pages
            .values()
            .filter(|slot| slot.page.platform_id == platform_id)
            .collect();
        Self::sorted(slots)
    }

    /// Every page, oldest first
    pub fn all_pages(&self) -> Vec<&Page> {
        Self::sorted(self.pages.values().collect())
    }

    /// Oldest page of a platform, optionally skipping one id
    pub fn earliest_for(&self, platform_id: &str, except: Option<&PageId>) -> Option<&Page> {
        self.pages_for(platform_id)
            .into_iter()
            .find(|page| Some(&page.id) != except)
    }

    /// Page after `current` in registration order, wrapping around.
    /// Starts from the oldest page when `current` is `None` or unknown.
    pub fn next_after(&self, current: Option<&PageId>) -> Option<PageId> {
        let pages = self.all_pages();
        let first = pages.first().map(|page| page.id.clone());
        let Some(current) = current else {
            return first;
        };
        match pages.iter().position(|page| page.id == *current) {
            Some(index) => pages
                .get((index + 1) % pages.len())
                .map(|page| page.id.clone()),
            None => first,
        }
    }

    /// 1-based position of a page among its platform's pages
    pub fn ordinal(&self, id: &PageId) -> Option<usize> {
        let page = self.get(id)?;
        self.pages_for(&page.platform_id)
            .iter()
            .position(|p| p.id == *id)
            .map(|index| index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidock_core::types::ManualClock;

    fn registry() -> (PageRegistry, ManualClock) {
        let clock = ManualClock::new(1_000);
        (PageRegistry::new(Rc::new(clock.clone())), clock)
    }

    fn assert_active_consistent(registry: &PageRegistry) {
        if let Some(id) = registry.active_id() {
            let page = registry.get(id).expect("active id must exist");
            assert_eq!(page.state, PageState::Active);
        }
        let active_count = registry
            .all_pages()
            .iter()
            .filter(|p| p.state == PageState::Active)
            .count();
        assert!(active_count <= 1);
    }

    #[test]
    fn test_create_is_inactive() {
        let (mut registry, _) = registry();
        let page = registry
            .create("claude", "https://claude.ai/", Geometry::default())
            .unwrap();

        assert_eq!(page.state, PageState::Inactive);
        assert_eq!(page.created_at, 1_000);
        assert!(registry.active_id().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_active_switches_states() {
        let (mut registry, clock) = registry();
        let a = registry.create("claude", "", Geometry::default()).unwrap().id;
        let b = registry.create("claude", "", Geometry::default()).unwrap().id;

        assert!(registry.set_active(&a));
        clock.advance(30);
        assert!(registry.set_active(&b));

        assert_eq!(registry.get(&a).unwrap().state, PageState::Inactive);
        assert_eq!(registry.get(&b).unwrap().state, PageState::Active);
        assert_eq!(registry.get(&b).unwrap().last_active_at, Some(1_030));
        assert!(!registry.set_active(&PageId::from("missing")));
    }

    #[test]
    fn test_removing_active_clears_pointer() {
        let (mut registry, _) = registry();
        let a = registry.create("gemini", "", Geometry::default()).unwrap().id;
        registry.set_active(&a);

        assert!(registry.remove(&a));
        assert!(registry.active_id().is_none());
        assert!(!registry.remove(&a));
    }

    #[test]
    fn test_active_never_dangles_across_sequences() {
        let (mut registry, clock) = registry();
        let platforms = ["chatgpt", "claude", "gemini"];
        let mut ids: Vec<PageId> = Vec::new();

        for step in 0..60usize {
            clock.advance(1);
            match step % 5 {
                0 | 1 => {
                    let platform = platforms[step % platforms.len()];
                    ids.push(registry.create(platform, "", Geometry::default()).unwrap().id);
                }
                2 => {
                    if let Some(id) = ids.get(step % ids.len().max(1)) {
                        registry.set_active(id);
                    }
                }
                3 => {
                    if let Some(id) = registry.active_id().cloned() {
                        registry.remove(&id);
                        ids.retain(|i| *i != id);
                    }
                }
                _ => {
                    if !ids.is_empty() {
                        let id = ids.remove(step % ids.len());
                        registry.remove(&id);
                    }
                }
            }
            assert_active_consistent(&registry);
        }
    }

    #[test]
    fn test_limits() {
        let (registry, _) = registry();
        let mut registry = registry.with_limits(PageLimits {
            max_per_platform: Some(2),
            max_total: Some(3),
        });

        registry.create("claude", "", Geometry::default()).unwrap();
        registry.create("claude", "", Geometry::default()).unwrap();
        assert!(!registry.can_create("claude"));
        assert!(matches!(
            registry.create("claude", "", Geometry::default()),
            Err(AiDockError::LimitExceeded { limit: 2, .. })
        ));

        registry.create("grok", "", Geometry::default()).unwrap();
        assert!(!registry.can_create("gemini"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_default_is_unlimited() {
        let (mut registry, _) = registry();
        for _ in 0..50 {
            registry.create("claude", "", Geometry::default()).unwrap();
        }
        assert!(registry.can_create("claude"));
    }

    #[test]
    fn test_ordering_and_ordinals() {
        let (mut registry, clock) = registry();
        let a = registry.create("claude", "", Geometry::default()).unwrap().id;
        let b = registry.create("claude", "", Geometry::default()).unwrap().id;
        clock.advance(5);
        let c = registry.create("grok", "", Geometry::default()).unwrap().id;
        let d = registry.create("claude", "", Geometry::default()).unwrap().id;

        let claude: Vec<&PageId> = registry.pages_for("claude").iter().map(|p| &p.id).collect();
        assert_eq!(claude, vec![&a, &b, &d]);
        assert_eq!(registry.ordinal(&d), Some(3));
        assert_eq!(registry.ordinal(&c), Some(1));
        assert_eq!(registry.earliest_for("claude", Some(&a)).map(|p| &p.id), Some(&b));
    }

    #[test]
    fn test_next_after_wraps() {
        let (mut registry, _) = registry();
        assert_eq!(registry.next_after(None), None);

        let a = registry.create("claude", "", Geometry::default()).unwrap().id;
        let b = registry.create("grok", "", Geometry::default()).unwrap().id;

        assert_eq!(registry.next_after(None), Some(a.clone()));
        assert_eq!(registry.next_after(Some(&a)), Some(b.clone()));
        assert_eq!(registry.next_after(Some(&b)), Some(a));
    }

    #[test]
    fn test_set_state_protects_active_page() {
        let (mut registry, _) = registry();
        let a = registry.create("claude", "", Geometry::default()).unwrap().id;
        let b = registry.create("claude", "", Geometry::default()).unwrap().id;
        registry.set_active(&a);

        assert!(!registry.set_state(&a, PageState::Loading));
        assert!(!registry.set_state(&b, PageState::Active));
        assert!(registry.set_state(&b, PageState::Loading));
        assert_eq!(registry.get(&b).unwrap().state, PageState::Loading);
    }

    #[test]
    fn test_restore_keeps_id_and_timestamp() {
        let (mut registry, _) = registry();
        let id = PageId::from("persisted");
        let page = registry
            .restore(id.clone(), "claude", "", Geometry::default(), 7)
            .unwrap();
        assert_eq!(page.created_at, 7);
        assert!(registry
            .restore(id, "claude", "", Geometry::default(), 8)
            .is_err());
    }
}
