//! Catalog of the AI chat services AiDock can host

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use url::Url;

/// One external AI chat service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Hosts the service needs besides its own (login, CDN)
    #[serde(default)]
    pub extra_hosts: Vec<String>,
}

impl Platform {
    fn new(id: &str, name: &str, url: &str, extra_hosts: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            extra_hosts: extra_hosts.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Host of the service's home URL
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }

    /// Every host a page of this platform may navigate to
    pub fn allowed_hosts(&self) -> Vec<String> {
        self.host()
            .into_iter()
            .chain(self.extra_hosts.iter().cloned())
            .collect()
    }
}

pub struct PlatformCatalog {
    platforms: Vec<Platform>,
    matcher: SkimMatcherV2,
}

impl PlatformCatalog {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self {
            platforms,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// The services shipped with AiDock
    pub fn builtin() -> Self {
        Self::new(vec![
            Platform::new(
                "chatgpt",
                "ChatGPT",
                "https://chatgpt.com/",
                &["openai.com", "auth.openai.com"],
            ),
            Platform::new("claude", "Claude", "https://claude.ai/", &["anthropic.com"]),
            Platform::new(
                "gemini",
                "Gemini",
                "https://gemini.google.com/",
                &["accounts.google.com"],
            ),
            Platform::new(
                "perplexity",
                "Perplexity",
                "https://www.perplexity.ai/",
                &["perplexity.ai"],
            ),
            Platform::new(
                "copilot",
                "Copilot",
                "https://copilot.microsoft.com/",
                &["login.microsoftonline.com", "login.live.com"],
            ),
            Platform::new("deepseek", "DeepSeek", "https://chat.deepseek.com/", &[]),
            Platform::new("grok", "Grok", "https://grok.com/", &["x.ai"]),
            Platform::new("mistral", "Le Chat", "https://chat.mistral.ai/", &["mistral.ai"]),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    /// Display name, falling back to the raw id for unknown platforms
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|p| p.name.as_str()).unwrap_or(id)
    }

    /// Fuzzy search by display name, best match first
    pub fn search(&self, query: &str) -> Vec<&Platform> {
        let mut results: Vec<(i64, &Platform)> = self
            .platforms
            .iter()
            .filter_map(|p| {
                self.matcher
                    .fuzzy_match(&p.name, query)
                    .map(|score| (score, p))
            })
            .collect();

        results.sort_by(|a, b| b.0.cmp(&a.0));
        results.into_iter().map(|(_, p)| p).collect()
    }
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = PlatformCatalog::builtin();
        let claude = catalog.get("claude").unwrap();
        assert_eq!(claude.host().as_deref(), Some("claude.ai"));
        assert!(claude.allowed_hosts().contains(&"anthropic.com".to_string()));
        assert_eq!(catalog.display_name("nope"), "nope");
    }

    #[test]
    fn test_search_ranks_matches() {
        let catalog = PlatformCatalog::builtin();
        let results = catalog.search("gem");
        assert_eq!(results.first().map(|p| p.id.as_str()), Some("gemini"));
        assert!(catalog.search("zzzz").is_empty());
    }
}
