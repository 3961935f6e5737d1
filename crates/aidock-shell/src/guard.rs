//! Navigation allow-list and the load-failure retry affordance

use aidock_core::types::PageId;
use aidock_core::Platform;
use std::collections::{HashMap, HashSet};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    /// Hand the URL to the system browser instead
    OpenExternally,
}

/// A failed load awaiting the user's single retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub page_id: PageId,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NavigationGuard {
    allow_hosts: HashSet<String>,
    page_hosts: HashMap<PageId, Vec<String>>,
    failures: HashMap<PageId, LoadFailure>,
}

impl NavigationGuard {
    pub fn new(allow_hosts: &[String]) -> Self {
        let mut guard = Self::default();
        guard.set_allow_hosts(allow_hosts);
        guard
    }

    pub fn set_allow_hosts(&mut self, hosts: &[String]) {
        self.allow_hosts = hosts
            .iter()
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
    }

    /// Allow a page to roam its platform's hosts
    pub fn register_page(&mut self, id: &PageId, platform: &Platform) {
        self.page_hosts
            .insert(id.clone(), platform.allowed_hosts());
    }

    pub fn forget_page(&mut self, id: &PageId) {
        self.page_hosts.remove(id);
        self.failures.remove(id);
    }

    pub fn check(&self, id: &PageId, url: &str) -> NavigationDecision {
        let Ok(parsed) = Url::parse(url) else {
            return NavigationDecision::OpenExternally;
        };

        match parsed.scheme() {
            "about" | "data" | "blob" => return NavigationDecision::Allow,
            "http" | "https" => {}
            _ => return NavigationDecision::OpenExternally,
        }

        let Some(host) = parsed.host_str() else {
            return NavigationDecision::OpenExternally;
        };
        let host = host.to_ascii_lowercase();

        let page_hosts = self.page_hosts.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let allowed = self
            .allow_hosts
            .iter()
            .chain(page_hosts.iter())
            .any(|allowed| host_matches(&host, allowed));

        if allowed {
            NavigationDecision::Allow
        } else {
            log::debug!("Navigation to {} leaves page {}", host, id);
            NavigationDecision::OpenExternally
        }
    }

    /// Record a failed load, replacing any earlier pending failure for the page
    pub fn record_failure(&mut self, id: &PageId, url: &str, reason: &str) -> LoadFailure {
        let failure = LoadFailure {
            page_id: id.clone(),
            url: url.to_string(),
            reason: reason.to_string(),
        };
        log::warn!("Load failed for page {} ({}): {}", id, url, reason);
        self.failures.insert(id.clone(), failure.clone());
        failure
    }

    pub fn pending_failure(&self, id: &PageId) -> Option<&LoadFailure> {
        self.failures.get(id)
    }

    /// Consume the retry affordance. Yields the URL to reload at most once.
    pub fn take_retry(&mut self, id: &PageId) -> Option<String> {
        self.failures.remove(id).map(|failure| failure.url)
    }

    pub fn clear_failure(&mut self, id: &PageId) {
        self.failures.remove(id);
    }
}

/// Exact match or subdomain of `allowed`
fn host_matches(host: &str, allowed: &str) -> bool {
    host == allowed
        || (host.ends_with(allowed)
            && host.len() > allowed.len()
            && host.as_bytes()[host.len() - allowed.len() - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidock_core::PlatformCatalog;

    fn guard_with_claude() -> (NavigationGuard, PageId) {
        let catalog = PlatformCatalog::builtin();
        let mut guard = NavigationGuard::new(&["Example.com".to_string()]);
        let id = PageId::from("p1");
        guard.register_page(&id, catalog.get("claude").unwrap());
        (guard, id)
    }

    #[test]
    fn test_platform_hosts_are_allowed() {
        let (guard, id) = guard_with_claude();
        assert_eq!(guard.check(&id, "https://claude.ai/new"), NavigationDecision::Allow);
        assert_eq!(
            guard.check(&id, "https://console.anthropic.com/"),
            NavigationDecision::Allow
        );
    }

    #[test]
    fn test_configured_hosts_match_subdomains_only() {
        let (guard, id) = guard_with_claude();
        assert_eq!(guard.check(&id, "https://docs.example.com/"), NavigationDecision::Allow);
        assert_eq!(
            guard.check(&id, "https://notexample.com/"),
            NavigationDecision::OpenExternally
        );
    }

    #[test]
    fn test_foreign_and_odd_urls_go_external() {
        let (guard, id) = guard_with_claude();
        assert_eq!(
            guard.check(&id, "https://chatgpt.com/"),
            NavigationDecision::OpenExternally
        );
        assert_eq!(
            guard.check(&id, "mailto:someone@claude.ai"),
            NavigationDecision::OpenExternally
        );
        assert_eq!(guard.check(&id, "not a url"), NavigationDecision::OpenExternally);
        assert_eq!(guard.check(&id, "about:blank"), NavigationDecision::Allow);
    }

    #[test]
    fn test_retry_is_offered_exactly_once() {
        let (mut guard, id) = guard_with_claude();
        guard.record_failure(&id, "https://claude.ai/", "offline");

        assert!(guard.pending_failure(&id).is_some());
        assert_eq!(guard.take_retry(&id).as_deref(), Some("https://claude.ai/"));
        assert_eq!(guard.take_retry(&id), None);
    }

    #[test]
    fn test_forget_page_drops_failures() {
        let (mut guard, id) = guard_with_claude();
        guard.record_failure(&id, "https://claude.ai/", "offline");
        guard.forget_page(&id);
        assert!(guard.pending_failure(&id).is_none());
        assert_eq!(
            guard.check(&id, "https://claude.ai/"),
            NavigationDecision::OpenExternally
        );
    }
}
