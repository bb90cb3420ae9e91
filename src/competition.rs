/// Competition math: item resolution, tiers, recommendations
use crate::snapshot::{ItemEntry, ReservationSnapshot};
use serde::{Deserialize, Serialize};

/// Reserve counts for one item, split into the user's own reserves and
/// everyone else's
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftresDetails {
    pub total_count: u32,
    pub your_count: u32,
    pub competition_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
}

impl CompetitionLevel {
    pub fn from_count(count: u32) -> CompetitionLevel {
        if count <= 2 {
            CompetitionLevel::Low
        } else if count <= 5 {
            CompetitionLevel::Medium
        } else {
            CompetitionLevel::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompetitionLevel::Low => "Low",
            CompetitionLevel::Medium => "Medium",
            CompetitionLevel::High => "High",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            CompetitionLevel::Low => "competition-low",
            CompetitionLevel::Medium => "competition-medium",
            CompetitionLevel::High => "competition-high",
        }
    }
}

/// Resolve an item name against the scraped entries: exact match first,
/// then case-insensitive exact, then case-insensitive substring in either
/// direction. Entries are walked in table scrape order, first match wins.
fn resolve_item<'a>(entries: &'a [ItemEntry], item_name: &str) -> Option<&'a ItemEntry> {
    if let Some(entry) = entries.iter().find(|e| e.name == item_name) {
        return Some(entry);
    }
    let lower = item_name.to_lowercase();
    if let Some(entry) = entries.iter().find(|e| e.name.to_lowercase() == lower) {
        return Some(entry);
    }
    entries.iter().find(|e| {
        let entry_lower = e.name.to_lowercase();
        entry_lower.contains(&lower) || lower.contains(&entry_lower)
    })
}

/// Reserve details for one BiS item against the current snapshot.
///
/// `your_count` only counts reserves under the configured character name;
/// with no character configured everything is competition.
pub fn item_softres_details(
    snapshot: &ReservationSnapshot,
    item_name: &str,
    character_name: &str,
) -> SoftresDetails {
    let Some(found) = resolve_item(&snapshot.items, item_name) else {
        return SoftresDetails::default();
    };

    let total_count = found.count;
    let mut your_count = 0u32;

    if !character_name.is_empty() {
        if let Some(reserves) = snapshot.player_reserves_map.get(character_name) {
            let canonical = found.name.to_lowercase();
            your_count = reserves
                .iter()
                .filter(|item| item.to_lowercase() == canonical)
                .count() as u32;
        }
    }

    SoftresDetails {
        total_count,
        your_count,
        competition_count: total_count.saturating_sub(your_count),
    }
}

/// A BiS item annotated with its competition data, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct RatedBisItem {
    pub name: String,
    pub details: SoftresDetails,
    pub level: CompetitionLevel,
}

/// Annotate a raid's BiS list and sort it ascending by competition count
pub fn rate_bis_items(
    snapshot: &ReservationSnapshot,
    bis_names: &[String],
    character_name: &str,
) -> Vec<RatedBisItem> {
    let mut rated: Vec<RatedBisItem> = bis_names
        .iter()
        .map(|name| {
            let details = item_softres_details(snapshot, name, character_name);
            RatedBisItem {
                name: name.clone(),
                level: CompetitionLevel::from_count(details.competition_count),
                details,
            }
        })
        .collect();
    rated.sort_by_key(|item| item.details.competition_count);
    rated
}

/// Textual recommendations for a rated BiS list (already sorted ascending)
pub fn build_recommendations(rated: &[RatedBisItem]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if !rated.is_empty() {
        let low: Vec<&str> = rated
            .iter()
            .filter(|item| item.level == CompetitionLevel::Low)
            .take(3)
            .map(|item| item.name.as_str())
            .collect();
        if !low.is_empty() {
            recommendations.push(format!("🎯 High chance items: {}", low.join(", ")));
        }

        let high: Vec<&str> = rated
            .iter()
            .filter(|item| item.level == CompetitionLevel::High)
            .take(3)
            .map(|item| item.name.as_str())
            .collect();
        if !high.is_empty() {
            recommendations.push(format!("⚠️ High competition: {}", high.join(", ")));
        }

        if rated.len() >= 2 {
            recommendations.push(format!(
                "💡 Consider soft reserving: {} ({} reserves) as your primary choice",
                rated[0].name, rated[0].details.competition_count
            ));
        }
    }

    if recommendations.is_empty() {
        recommendations.push("Configure your BiS items to see recommendations".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn snapshot_with(items: &[(&str, u32)], players: &[(&str, &[&str])]) -> ReservationSnapshot {
        let entries = items
            .iter()
            .map(|(name, count)| ItemEntry {
                name: name.to_string(),
                count: *count,
            })
            .collect();
        let player_map: HashMap<String, Vec<String>> = players
            .iter()
            .map(|(player, reserves)| {
                (
                    player.to_string(),
                    reserves.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        ReservationSnapshot::new(entries, player_map, 0.0)
    }

    #[test]
    fn test_competition_level_tiers() {
        assert_eq!(CompetitionLevel::from_count(0), CompetitionLevel::Low);
        assert_eq!(CompetitionLevel::from_count(2), CompetitionLevel::Low);
        assert_eq!(CompetitionLevel::from_count(3), CompetitionLevel::Medium);
        assert_eq!(CompetitionLevel::from_count(5), CompetitionLevel::Medium);
        assert_eq!(CompetitionLevel::from_count(6), CompetitionLevel::High);
    }

    #[test]
    fn test_details_case_insensitive_match_with_own_reserve() {
        let snapshot = snapshot_with(&[("Thunderfury", 4)], &[("Bob", &["Thunderfury"])]);

        let details = item_softres_details(&snapshot, "thunderfury", "Bob");
        assert_eq!(details.total_count, 4);
        assert_eq!(details.your_count, 1);
        assert_eq!(details.competition_count, 3);
    }

    #[test]
    fn test_details_exact_match_preferred_over_substring() {
        let snapshot = snapshot_with(&[("Eye of C'Thun", 3), ("Eye", 9)], &[]);

        let details = item_softres_details(&snapshot, "Eye", "");
        assert_eq!(details.total_count, 9);
    }

    #[test]
    fn test_details_substring_match_either_direction() {
        let snapshot = snapshot_with(&[("Dark Edge of Insanity", 7)], &[]);

        // Query is a fragment of the entry
        assert_eq!(
            item_softres_details(&snapshot, "dark edge", "").total_count,
            7
        );
        // Entry is a fragment of the query
        assert_eq!(
            item_softres_details(&snapshot, "the Dark Edge of Insanity axe", "").total_count,
            7
        );
    }

    #[test]
    fn test_details_no_match_is_zero() {
        let snapshot = snapshot_with(&[("Thunderfury", 4)], &[]);
        assert_eq!(
            item_softres_details(&snapshot, "Ashkandi", ""),
            SoftresDetails::default()
        );
    }

    #[test]
    fn test_details_without_character_name() {
        let snapshot = snapshot_with(&[("Thunderfury", 4)], &[("Bob", &["Thunderfury"])]);

        let details = item_softres_details(&snapshot, "Thunderfury", "");
        assert_eq!(details.your_count, 0);
        assert_eq!(details.competition_count, 4);
    }

    #[test]
    fn test_rate_bis_items_sorted_ascending() {
        let snapshot = snapshot_with(&[("A", 6), ("B", 1), ("C", 4)], &[]);
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        let rated = rate_bis_items(&snapshot, &names, "");
        let order: Vec<&str> = rated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(rated[0].level, CompetitionLevel::Low);
        assert_eq!(rated[2].level, CompetitionLevel::High);
    }

    #[test]
    fn test_recommendations_content() {
        let snapshot = snapshot_with(&[("A", 0), ("B", 1), ("C", 8)], &[]);
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let rated = rate_bis_items(&snapshot, &names, "");

        let recs = build_recommendations(&rated);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("High chance items: A, B"));
        assert!(recs[1].contains("High competition: C"));
        assert!(recs[2].contains("Consider soft reserving: A (0 reserves)"));
    }

    #[test]
    fn test_recommendations_empty_list_prompts_config() {
        let recs = build_recommendations(&[]);
        assert_eq!(
            recs,
            vec!["Configure your BiS items to see recommendations".to_string()]
        );
    }

    #[test]
    fn test_recommendations_single_item_no_primary_suggestion() {
        let snapshot = snapshot_with(&[("A", 1)], &[]);
        let rated = rate_bis_items(&snapshot, &["A".to_string()], "");

        let recs = build_recommendations(&rated);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("High chance"));
    }
}
