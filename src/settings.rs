use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use crate::{
    core::FlashdeckError,
    persistence::{
        load_json_or_default,
        save_json,
    },
};

pub const SETTINGS_FILE: &str = "settings.json";
pub const ENV_API_URL: &str = "FLASHDECK_API_URL";
pub const ENV_API_TOKEN: &str = "FLASHDECK_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self { base_url: "http://localhost:8000/".to_string(), token: None, timeout_secs: None }
    }
}

/// Which proposed commands an approval accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "indexes", rename_all = "snake_case")]
pub enum AcceptPolicy {
    /// Always `[0]`, whatever the proposal holds.
    #[default]
    FirstOnly,
    All,
    Indexes(Vec<usize>),
}

impl AcceptPolicy {
    pub fn accepted_indexes(&self, command_count: usize) -> Vec<usize> {
        match self {
            AcceptPolicy::FirstOnly => vec![0],
            AcceptPolicy::All => (0..command_count).collect(),
            AcceptPolicy::Indexes(indexes) => {
                indexes.iter().copied().filter(|&i| i < command_count).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub acceptance: AcceptPolicy,
}

impl ClientSettings {
    /// Stored settings with environment overrides applied.
    pub fn load() -> Self {
        let mut settings: ClientSettings = load_json_or_default(SETTINGS_FILE);
        settings.apply_overrides(std::env::var(ENV_API_URL).ok(), std::env::var(ENV_API_TOKEN).ok());
        settings
    }

    pub fn save(&self) -> Result<(), FlashdeckError> {
        save_json(self, SETTINGS_FILE)?;
        info!("Settings saved");
        Ok(())
    }

    pub fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if let Some(base_url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = base_url;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::persistence::{
        load_json_from,
        save_json_to,
    };

    #[test]
    fn first_only_accepts_index_zero_regardless_of_count() {
        assert_eq!(AcceptPolicy::FirstOnly.accepted_indexes(3), vec![0]);
        assert_eq!(AcceptPolicy::FirstOnly.accepted_indexes(0), vec![0]);
    }

    #[test]
    fn all_and_explicit_policies_stay_in_range() {
        assert_eq!(AcceptPolicy::All.accepted_indexes(3), vec![0, 1, 2]);
        assert_eq!(AcceptPolicy::Indexes(vec![2, 5, 0]).accepted_indexes(3), vec![2, 0]);
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: ClientSettings =
            serde_json::from_value(json!({ "acceptance": { "mode": "all" } })).unwrap();
        assert_eq!(settings.acceptance, AcceptPolicy::All);
        assert_eq!(settings.api, ApiSettings::default());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = ClientSettings {
            api: ApiSettings {
                base_url: "https://study.example/api/".into(),
                token: Some("tok".into()),
                timeout_secs: Some(30),
            },
            acceptance: AcceptPolicy::Indexes(vec![1]),
        };
        save_json_to(&settings, &path).unwrap();
        let loaded: ClientSettings = load_json_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut settings = ClientSettings::default();
        settings.apply_overrides(Some(" ".into()), Some("secret".into()));
        assert_eq!(settings.api.base_url, ApiSettings::default().base_url);
        assert_eq!(settings.api.token.as_deref(), Some("secret"));
    }
}
