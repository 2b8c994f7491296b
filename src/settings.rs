//! Policy settings and the store they live in.
//!
//! The settings document is read fresh on every decision so that edits made
//! through the API (or by hand) apply on the next scheduler tick without a
//! restart.  Reads never fail: a missing file yields the defaults, a file
//! that is not JSON is logged and replaced by the defaults, and a single
//! unusable value only resets its own key.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Format, Json},
    Figment,
};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// Longest accepted background interval: one year, in minutes.
pub const MAX_CHECK_INTERVAL: u64 = 525_600;

/// Keys of the policy document this daemon understands.
const POLICY_KEYS: [&str; 4] = [
    "check_mode",
    "check_interval",
    "auto_update_mode",
    "auto_update_containers",
];

/// When checks run without an explicit request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    #[default]
    Manual,
    Startup,
    Background,
}

/// Which containers get updated automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoUpdateMode {
    #[default]
    Off,
    All,
    Selected,
}

/// The persisted policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub check_mode: CheckMode,
    /// Minutes between background cycles.
    pub check_interval: u64,
    pub auto_update_mode: AutoUpdateMode,
    pub auto_update_containers: BTreeSet<String>,
    /// Keys this daemon does not know about, kept so a save does not drop
    /// them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_mode: CheckMode::Manual,
            check_interval: 60,
            auto_update_mode: AutoUpdateMode::Off,
            auto_update_containers: BTreeSet::new(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Background cycle interval in seconds, at least one minute.
    pub fn interval_secs(&self) -> u64 {
        self.check_interval.max(1).saturating_mul(60)
    }

    /// Build settings from a stored document. Each recognised key falls
    /// back to its default on its own when its value is unusable; other
    /// keys are kept as they are.
    pub fn from_document(mut doc: Map<String, Value>) -> Self {
        let mut settings = Settings::default();
        for key in POLICY_KEYS {
            let Some(value) = doc.remove(key) else {
                continue;
            };
            let patch = Value::Object(Map::from_iter([(key.to_string(), value)]));
            if let Err(e) = settings.apply(&patch) {
                error!("Ignoring stored setting: {}", e);
            }
        }
        settings.extra = doc;
        settings
    }

    /// Apply a partial update. Only the four policy keys are taken from
    /// `patch`; anything else is ignored.  Nothing is applied unless every
    /// recognised key holds a valid value.
    pub fn apply(&mut self, patch: &Value) -> Result<(), SettingsError> {
        let patch = patch.as_object().ok_or(SettingsError::NotAnObject)?;
        let mut next = self.clone();

        if let Some(v) = patch.get("check_mode") {
            next.check_mode = field("check_mode", v)?;
        }
        if let Some(v) = patch.get("check_interval") {
            let minutes: u64 = field("check_interval", v)?;
            if !(1..=MAX_CHECK_INTERVAL).contains(&minutes) {
                return Err(SettingsError::InvalidField {
                    field: "check_interval",
                    reason: format!("must be between 1 and {} minutes", MAX_CHECK_INTERVAL),
                });
            }
            next.check_interval = minutes;
        }
        if let Some(v) = patch.get("auto_update_mode") {
            next.auto_update_mode = field("auto_update_mode", v)?;
        }
        if let Some(v) = patch.get("auto_update_containers") {
            next.auto_update_containers = field("auto_update_containers", v)?;
        }

        *self = next;
        Ok(())
    }
}

fn field<T: serde::de::DeserializeOwned>(
    name: &'static str,
    v: &Value,
) -> Result<T, SettingsError> {
    serde_json::from_value(v.clone()).map_err(|e| SettingsError::InvalidField {
        field: name,
        reason: e.to_string(),
    })
}

/// Where settings are kept.
pub trait SettingsStore: Send + Sync {
    /// Current settings merged over the defaults. Never fails.
    fn load(&self) -> Settings;
    /// Persist `settings`, returning `false` on failure.
    fn save(&self, settings: &Settings) -> bool;
}

/// Settings kept in a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Settings {
        match Figment::from(Json::file(&self.path)).extract::<Map<String, Value>>() {
            Ok(doc) => Settings::from_document(doc),
            Err(e) => {
                error!("Error loading settings from {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> bool {
        let write = || -> anyhow::Result<()> {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let body = serde_json::to_string_pretty(settings)?;
            std::fs::write(&self.path, body)?;
            Ok(())
        };
        match write() {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving settings to {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("config").join("config.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let (_dir, store) = store();
        let settings = store.load();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.check_mode, CheckMode::Manual);
        assert_eq!(settings.check_interval, 60);
        assert_eq!(settings.auto_update_mode, AutoUpdateMode::Off);
        assert!(settings.auto_update_containers.is_empty());
    }

    #[test]
    fn partial_file_is_merged_over_defaults() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"check_mode": "background", "theme": "dark"}"#,
        )
        .unwrap();

        let settings = store.load();
        assert_eq!(settings.check_mode, CheckMode::Background);
        assert_eq!(settings.check_interval, 60);
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn bad_field_only_resets_that_field() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{
                "check_mode": "hourly",
                "check_interval": 30,
                "auto_update_mode": "selected",
                "auto_update_containers": ["web"],
                "theme": "dark"
            }"#,
        )
        .unwrap();

        let settings = store.load();
        assert_eq!(settings.check_mode, CheckMode::Manual);
        assert_eq!(settings.check_interval, 30);
        assert_eq!(settings.auto_update_mode, AutoUpdateMode::Selected);
        assert!(settings.auto_update_containers.contains("web"));
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
        assert!(!settings.extra.contains_key("check_mode"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn save_round_trips_and_keeps_unknown_keys() {
        let (_dir, store) = store();
        let mut settings = Settings::default();
        settings.extra.insert("theme".into(), json!("dark"));
        settings
            .apply(&json!({
                "check_mode": "background",
                "check_interval": 5,
                "auto_update_mode": "selected",
                "auto_update_containers": ["web"]
            }))
            .unwrap();
        assert!(store.save(&settings));

        let loaded = store.load();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn save_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file cannot be written.
        let store = JsonFileStore::new(dir.path());
        assert!(!store.save(&Settings::default()));
    }

    #[test]
    fn apply_ignores_unrecognised_keys() {
        let mut settings = Settings::default();
        settings
            .apply(&json!({"check_interval": 15, "bind": "0.0.0.0:1"}))
            .unwrap();
        assert_eq!(settings.check_interval, 15);
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn apply_rejects_invalid_values_atomically() {
        let mut settings = Settings::default();
        let err = settings
            .apply(&json!({"check_mode": "background", "auto_update_mode": "some"}))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidField {
                field: "auto_update_mode",
                ..
            }
        ));
        assert_eq!(settings, Settings::default());

        assert!(settings.apply(&json!({"check_interval": 0})).is_err());
        assert!(matches!(
            settings.apply(&json!(["check_mode"])),
            Err(SettingsError::NotAnObject)
        ));
    }

    #[test]
    fn apply_rejects_out_of_range_intervals() {
        let mut settings = Settings::default();
        for minutes in [MAX_CHECK_INTERVAL + 1, u64::MAX / 60 + 1, u64::MAX] {
            let err = settings
                .apply(&json!({ "check_interval": minutes }))
                .unwrap_err();
            assert!(matches!(
                err,
                SettingsError::InvalidField {
                    field: "check_interval",
                    ..
                }
            ));
        }
        assert_eq!(settings.check_interval, 60);

        settings
            .apply(&json!({ "check_interval": MAX_CHECK_INTERVAL }))
            .unwrap();
        assert_eq!(settings.check_interval, MAX_CHECK_INTERVAL);
    }

    #[test]
    fn huge_stored_interval_saturates() {
        let settings = Settings {
            check_interval: u64::MAX / 60 + 1,
            ..Settings::default()
        };
        assert_eq!(settings.interval_secs(), u64::MAX);
    }

    #[test]
    fn zero_interval_counts_as_one_minute() {
        let settings = Settings {
            check_interval: 0,
            ..Settings::default()
        };
        assert_eq!(settings.interval_secs(), 60);
    }
}
