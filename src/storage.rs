/// Persistent data kept in chrome.storage.sync: settings and the BiS list
use crate::raids::RaidCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Store key for the settings record
pub const SETTINGS_KEY: &str = "settings";
/// Store key for the BiS list mapping
pub const BIS_DATA_KEY: &str = "bisData";

/// User preferences, written with defaults at install time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_analyze: bool,
    pub highlight_bis: bool,
    pub show_recommendations: bool,
    pub notifications_enabled: bool,
    pub character_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_analyze: true,
            highlight_bis: true,
            show_recommendations: true,
            notifications_enabled: true,
            character_name: String::new(),
        }
    }
}

/// Partial settings from an import bundle; only present fields override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub auto_analyze: Option<bool>,
    pub highlight_bis: Option<bool>,
    pub show_recommendations: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub character_name: Option<String>,
}

impl Settings {
    /// Shallow merge: fields present in the patch win
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.auto_analyze {
            self.auto_analyze = v;
        }
        if let Some(v) = patch.highlight_bis {
            self.highlight_bis = v;
        }
        if let Some(v) = patch.show_recommendations {
            self.show_recommendations = v;
        }
        if let Some(v) = patch.notifications_enabled {
            self.notifications_enabled = v;
        }
        if let Some(v) = &patch.character_name {
            self.character_name = v.clone();
        }
    }
}

/// One target item in a raid's BiS list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BisItem {
    pub name: String,
    /// Epoch milliseconds when the item was added
    pub added_date: f64,
}

/// The persistent BiS list: raid code => ordered target items.
/// Item names are unique per raid under case-insensitive comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BisData {
    #[serde(flatten)]
    raids: HashMap<RaidCode, Vec<BisItem>>,
}

impl BisData {
    pub fn new() -> Self {
        BisData::default()
    }

    pub fn items_for(&self, raid: RaidCode) -> &[BisItem] {
        self.raids.get(&raid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_names_for(&self, raid: RaidCode) -> Vec<String> {
        self.items_for(raid)
            .iter()
            .map(|item| item.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.raids.values().all(Vec::is_empty)
    }

    /// Append an item to a raid's list. Rejects empty names and
    /// case-insensitive duplicates without touching the list.
    pub fn add_item(&mut self, raid: RaidCode, name: &str, added_date: f64) -> Result<(), String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Please select a raid and enter an item name".to_string());
        }

        let items = self.raids.entry(raid).or_default();
        if items
            .iter()
            .any(|item| item.name.eq_ignore_ascii_case(name))
        {
            return Err("Item already in BiS list for this raid".to_string());
        }

        items.push(BisItem {
            name: name.to_string(),
            added_date,
        });
        Ok(())
    }

    /// Delete by exact name within one raid's list
    pub fn remove_item(&mut self, raid: RaidCode, name: &str) -> bool {
        let Some(items) = self.raids.get_mut(&raid) else {
            return false;
        };
        let original_len = items.len();
        items.retain(|item| item.name != name);
        items.len() < original_len
    }

    pub fn clear(&mut self) {
        self.raids.clear();
    }
}

/// Versioned export document: BiS data plus settings, verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub bis_data: BisData,
    pub settings: Settings,
    pub export_date: String,
    pub version: String,
}

/// Incoming import document; both sections optional, but an import with
/// no BiS data is rejected by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportBundle {
    pub bis_data: Option<BisData>,
    pub settings: Option<SettingsPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(settings.auto_analyze);
        assert!(settings.highlight_bis);
        assert!(settings.show_recommendations);
        assert!(settings.notifications_enabled);
        assert_eq!(settings.character_name, "");
    }

    #[test]
    fn test_settings_patch_shallow_merge() {
        let mut settings = Settings::default();
        let patch = SettingsPatch {
            auto_analyze: Some(false),
            character_name: Some("Bob".to_string()),
            ..Default::default()
        };

        settings.apply_patch(&patch);

        assert!(!settings.auto_analyze);
        assert_eq!(settings.character_name, "Bob");
        // Untouched fields keep their values
        assert!(settings.highlight_bis);
    }

    #[test]
    fn test_add_item() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::MC, "Thunderfury", 1698508200000.0)
            .unwrap();

        let items = bis.items_for(RaidCode::MC);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Thunderfury");
    }

    #[test]
    fn test_add_item_rejects_empty_name() {
        let mut bis = BisData::new();
        assert!(bis.add_item(RaidCode::MC, "  ", 0.0).is_err());
        assert!(bis.items_for(RaidCode::MC).is_empty());
    }

    #[test]
    fn test_add_item_rejects_case_insensitive_duplicate() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::AQ40, "Eye of C'Thun", 0.0).unwrap();

        let result = bis.add_item(RaidCode::AQ40, "EYE OF C'THUN", 1.0);
        assert!(result.is_err());
        assert_eq!(bis.items_for(RaidCode::AQ40).len(), 1);
    }

    #[test]
    fn test_same_item_allowed_in_different_raids() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::MC, "Onslaught Girdle", 0.0).unwrap();
        bis.add_item(RaidCode::BWL, "Onslaught Girdle", 0.0).unwrap();

        assert_eq!(bis.items_for(RaidCode::MC).len(), 1);
        assert_eq!(bis.items_for(RaidCode::BWL).len(), 1);
    }

    #[test]
    fn test_remove_item_exact_match_only() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::MC, "Thunderfury", 0.0).unwrap();

        assert!(!bis.remove_item(RaidCode::MC, "thunderfury"));
        assert_eq!(bis.items_for(RaidCode::MC).len(), 1);

        assert!(bis.remove_item(RaidCode::MC, "Thunderfury"));
        assert!(bis.items_for(RaidCode::MC).is_empty());
    }

    #[test]
    fn test_remove_from_missing_raid() {
        let mut bis = BisData::new();
        assert!(!bis.remove_item(RaidCode::NAXX, "anything"));
    }

    #[test]
    fn test_clear() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::MC, "Thunderfury", 0.0).unwrap();
        bis.clear();
        assert!(bis.is_empty());
    }

    #[test]
    fn test_bis_data_serializes_with_raid_tag_keys() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::AQ40, "Eye of C'Thun", 1698508200000.0)
            .unwrap();

        let json = serde_json::to_value(&bis).unwrap();
        assert!(json.get("AQ40").is_some());
        assert_eq!(json["AQ40"][0]["name"], "Eye of C'Thun");
        assert_eq!(json["AQ40"][0]["addedDate"], 1698508200000.0);
    }

    #[test]
    fn test_export_bundle_round_trip() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::NAXX, "Kingsfall", 0.0).unwrap();

        let bundle = ExportBundle {
            bis_data: bis,
            settings: Settings::default(),
            export_date: "2024-10-28T10:30:00Z".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_string(&bundle).unwrap();
        let back: ExportBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn test_import_bundle_tolerates_missing_sections() {
        let bundle: ImportBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.bis_data.is_none());
        assert!(bundle.settings.is_none());

        let bundle: ImportBundle =
            serde_json::from_str(r#"{"bisData": {"MC": []}, "exportDate": "x"}"#).unwrap();
        assert!(bundle.bis_data.is_some());
    }
}
