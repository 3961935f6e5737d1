//! Messages posted by the web UI to the shell
//!
//! Each message is a JSON object tagged by `action`. Anything that does not
//! parse into a known `Command` is rejected.

use aidock_core::types::PageId;
use aidock_core::AiDockResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    AddPlatform { platform_id: String },

    #[serde(rename_all = "camelCase")]
    RemovePlatform { platform_id: String },

    #[serde(rename_all = "camelCase")]
    AddWindow { platform_id: String },

    #[serde(rename_all = "camelCase")]
    RemoveWindow {
        #[serde(default)]
        platform_id: Option<String>,
        window_id: PageId,
    },

    #[serde(rename = "selectDefaultAI", rename_all = "camelCase")]
    SelectDefaultAi { platform_id: String },

    NavigateToHomepage,

    GoBack,

    #[serde(rename = "handleAISelection", rename_all = "camelCase")]
    HandleAiSelection {
        platform_id: String,
        #[serde(default)]
        window_id: Option<PageId>,
    },

    /// The user pressed retry on a failed load
    #[serde(rename_all = "camelCase")]
    RetryLoad { window_id: PageId },

    /// Narrow the home grid to platforms matching `query`
    FilterPlatforms {
        #[serde(default)]
        query: String,
    },
}

impl Command {
    pub fn parse(message: &str) -> AiDockResult<Self> {
        Ok(serde_json::from_str(message)?)
    }

    pub fn from_value(value: serde_json::Value) -> AiDockResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            Self::AddPlatform { .. } => "addPlatform",
            Self::RemovePlatform { .. } => "removePlatform",
            Self::AddWindow { .. } => "addWindow",
            Self::RemoveWindow { .. } => "removeWindow",
            Self::SelectDefaultAi { .. } => "selectDefaultAI",
            Self::NavigateToHomepage => "navigateToHomepage",
            Self::GoBack => "goBack",
            Self::HandleAiSelection { .. } => "handleAISelection",
            Self::RetryLoad { .. } => "retryLoad",
            Self::FilterPlatforms { .. } => "filterPlatforms",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_every_action() {
        let cases = vec![
            (
                json!({ "action": "addPlatform", "platformId": "claude" }),
                Command::AddPlatform {
                    platform_id: "claude".into(),
                },
            ),
            (
                json!({ "action": "removeWindow", "platformId": "claude", "windowId": "w1" }),
                Command::RemoveWindow {
                    platform_id: Some("claude".into()),
                    window_id: PageId::from("w1"),
                },
            ),
            (
                json!({ "action": "selectDefaultAI", "platformId": "grok" }),
                Command::SelectDefaultAi {
                    platform_id: "grok".into(),
                },
            ),
            (json!({ "action": "navigateToHomepage" }), Command::NavigateToHomepage),
            (json!({ "action": "goBack" }), Command::GoBack),
            (
                json!({ "action": "retryLoad", "windowId": "w2" }),
                Command::RetryLoad {
                    window_id: PageId::from("w2"),
                },
            ),
            (
                json!({ "action": "filterPlatforms", "query": "gem" }),
                Command::FilterPlatforms {
                    query: "gem".into(),
                },
            ),
            (
                json!({ "action": "handleAISelection", "platformId": "gemini" }),
                Command::HandleAiSelection {
                    platform_id: "gemini".into(),
                    window_id: None,
                },
            ),
        ];

        for (value, expected) in cases {
            let command = Command::from_value(value).unwrap();
            assert_eq!(command, expected);
            let wire = serde_json::to_value(&command).unwrap();
            assert_eq!(wire["action"], command.action());
        }
    }

    #[test]
    fn test_ignores_extra_fields() {
        let command =
            Command::parse(r#"{"action":"goBack","channel":"navigation","extra":1}"#).unwrap();
        assert_eq!(command, Command::GoBack);
    }

    #[test]
    fn test_rejects_unknown_or_incomplete_messages() {
        assert!(Command::parse(r#"{"action":"launchRockets"}"#).is_err());
        assert!(Command::parse(r#"{"action":"addWindow"}"#).is_err());
        assert!(Command::parse(r#"{"platformId":"claude"}"#).is_err());
        assert!(Command::parse("not json").is_err());
    }
}
