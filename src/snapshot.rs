/// Snapshot DTOs produced by the page analyzer and shipped over messaging
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of the raid page currently being viewed.
/// Rebuilt from scratch on every analysis pass, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidSnapshot {
    pub raid_name: String,
    pub total_players: u32,
    pub url: String,
    /// Epoch milliseconds, js_sys::Date::now()
    pub timestamp: f64,
}

/// One scraped item with its soft-reserve count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub name: String,
    pub count: u32,
}

/// Everything scraped from the reservation tables in one pass.
///
/// `items` keeps the scrape order of the items table; fuzzy name resolution
/// walks it front to back so that first-match-wins is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSnapshot {
    pub item_reserve_map: HashMap<String, u32>,
    pub player_reserves_map: HashMap<String, Vec<String>>,
    pub items: Vec<ItemEntry>,
    pub timestamp: f64,
}

impl ReservationSnapshot {
    pub fn new(
        items: Vec<ItemEntry>,
        player_reserves_map: HashMap<String, Vec<String>>,
        timestamp: f64,
    ) -> Self {
        let item_reserve_map = items
            .iter()
            .map(|entry| (entry.name.clone(), entry.count))
            .collect();
        ReservationSnapshot {
            item_reserve_map,
            player_reserves_map,
            items,
            timestamp,
        }
    }
}
