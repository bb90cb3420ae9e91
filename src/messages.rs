/// Cross-context message DTOs, dispatched on the "action" field
use crate::snapshot::ItemEntry;
use crate::storage::{ExportBundle, ImportBundle};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::JsValue;

/// Serialize a value for the messaging/storage boundary.
///
/// Chrome JSON-serializes message and storage payloads, and an ES `Map`
/// stringifies to `{}`, so map fields must cross as plain objects.
pub fn to_wire<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::json_compatible())
}

/// Every named request the three contexts exchange.
/// Wire form is `{"action": "...", ...fields}` so plain JS peers can
/// produce and consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    /// Popup/background -> analyzer: re-run extraction now
    #[serde(rename = "reanalyze")]
    Reanalyze,
    /// Popup -> analyzer: current RaidSnapshot (or null)
    #[serde(rename = "getRaidInfo")]
    GetRaidInfo,
    /// Popup -> analyzer: current ReservationSnapshot (or null)
    #[serde(rename = "getSoftresData")]
    GetSoftresData,
    /// Popup -> analyzer: scraped item list for autocomplete
    #[serde(rename = "getAvailableItems")]
    GetAvailableItems,
    /// Popup -> analyzer: re-apply BiS highlights
    #[serde(rename = "highlightBis")]
    HighlightBis,
    /// Background -> analyzer: show an in-page toast
    #[serde(rename = "showNotification")]
    ShowNotification {
        message: String,
        #[serde(rename = "type", default)]
        kind: String,
    },
    /// Popup -> background: trigger analysis on the active tab
    #[serde(rename = "analyzeCurrentTab")]
    AnalyzeCurrentTab,
    /// Popup -> background: read the badge text
    #[serde(rename = "getBadgeInfo")]
    GetBadgeInfo {
        #[serde(rename = "tabId", default)]
        tab_id: Option<i32>,
    },
    /// Popup -> background: forward a toast to the active tab
    #[serde(rename = "sendNotification")]
    SendNotification {
        message: String,
        #[serde(rename = "type", default)]
        kind: String,
    },
    /// Popup -> background: bundle up the store contents
    #[serde(rename = "exportBisData")]
    ExportBisData,
    /// Popup -> background: replace the store from a bundle
    #[serde(rename = "importBisData")]
    ImportBisData { data: ImportBundle },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Ack {
        Ack { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> ErrorReply {
        ErrorReply {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableItemsReply {
    pub available_items: Vec<ItemEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeInfoReply {
    pub badge_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReply {
    pub success: bool,
    pub data: ExportBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_value(&Request::GetRaidInfo).unwrap();
        assert_eq!(json["action"], "getRaidInfo");

        let json = serde_json::to_value(&Request::ShowNotification {
            message: "saved".to_string(),
            kind: "info".to_string(),
        })
        .unwrap();
        assert_eq!(json["action"], "showNotification");
        assert_eq!(json["message"], "saved");
        assert_eq!(json["type"], "info");
    }

    #[test]
    fn test_request_parses_bare_action() {
        let request: Request = serde_json::from_str(r#"{"action": "reanalyze"}"#).unwrap();
        assert_eq!(request, Request::Reanalyze);
    }

    #[test]
    fn test_get_badge_info_tab_id_optional() {
        let request: Request = serde_json::from_str(r#"{"action": "getBadgeInfo"}"#).unwrap();
        assert_eq!(request, Request::GetBadgeInfo { tab_id: None });

        let request: Request =
            serde_json::from_str(r#"{"action": "getBadgeInfo", "tabId": 7}"#).unwrap();
        assert_eq!(request, Request::GetBadgeInfo { tab_id: Some(7) });
    }

    #[test]
    fn test_unknown_action_fails_to_parse() {
        let result: Result<Request, _> = serde_json::from_str(r#"{"action": "selfDestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_import_request_carries_bundle() {
        let request: Request = serde_json::from_str(
            r#"{"action": "importBisData", "data": {"bisData": {"MC": []}}}"#,
        )
        .unwrap();
        match request {
            Request::ImportBisData { data } => assert!(data.bis_data.is_some()),
            other => panic!("unexpected request: {other:?}"),
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::raids::RaidCode;
    use crate::snapshot::{ItemEntry, ReservationSnapshot};
    use crate::storage::BisData;
    use std::collections::HashMap;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn test_bis_data_wire_form_is_plain_object() {
        let mut bis = BisData::new();
        bis.add_item(RaidCode::AQ40, "Eye of C'Thun", 0.0).unwrap();

        let js = to_wire(&bis).unwrap();
        // chrome.storage JSON-serializes its payload; an ES Map would
        // stringify to {} and wipe the list
        assert!(!js.is_instance_of::<js_sys::Map>());
        assert!(js.is_instance_of::<js_sys::Object>());
        assert!(js_sys::Reflect::has(&js, &JsValue::from_str("AQ40")).unwrap());

        let back: BisData = serde_wasm_bindgen::from_value(js).unwrap();
        assert_eq!(back, bis);
    }

    #[wasm_bindgen_test]
    fn test_snapshot_maps_cross_as_objects() {
        let mut players = HashMap::new();
        players.insert("Bob".to_string(), vec!["Thunderfury".to_string()]);
        let snapshot = ReservationSnapshot::new(
            vec![ItemEntry {
                name: "Thunderfury".to_string(),
                count: 4,
            }],
            players,
            0.0,
        );

        let js = to_wire(&snapshot).unwrap();
        let map = js_sys::Reflect::get(&js, &JsValue::from_str("playerReservesMap")).unwrap();
        assert!(!map.is_instance_of::<js_sys::Map>());

        let back: ReservationSnapshot = serde_wasm_bindgen::from_value(js).unwrap();
        assert_eq!(back, snapshot);
    }

    #[wasm_bindgen_test]
    fn test_none_crosses_as_null() {
        let js = to_wire(&None::<crate::snapshot::RaidSnapshot>).unwrap();
        assert!(js.is_null());
    }
}
