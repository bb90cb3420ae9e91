/// Table extraction: turns scraped rows into reserve maps
///
/// The DOM walk itself lives in the analyzer; these functions operate on the
/// plain scrape records so they can be tested off-browser.
use crate::snapshot::ItemEntry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// What the analyzer pulls out of a single table cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellScrape {
    /// Full text content, trimmed
    pub text: String,
    /// Text of the first recognized item link (wowhead/classicdb/wowdb)
    pub link_text: Option<String>,
    /// Texts of `.itemlink-text` spans inside recognized item links
    pub itemlink_texts: Vec<String>,
    /// Text of the first `span[title]`, used for player names
    pub titled_span: Option<String>,
    /// Number of `.item-row` markers, one per soft-reserving player
    pub marker_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowScrape {
    pub cells: Vec<CellScrape>,
}

/// All rows of one table, header included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableScrape {
    pub rows: Vec<RowScrape>,
}

fn quantity_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(\d+x\)\s*$").unwrap())
}

/// Strip a trailing "(2x)" style quantity suffix from an item name
pub fn strip_quantity_suffix(name: &str) -> String {
    quantity_suffix().replace(name, "").trim().to_string()
}

/// Number of players with reserves: rows of the reserved table minus the
/// header. Falls back to a generic `table tbody tr` row count when the
/// reserved table is missing. Never negative.
pub fn count_players(reserved_table: Option<&TableScrape>, generic_row_count: u32) -> u32 {
    if let Some(table) = reserved_table {
        return (table.rows.len() as u32).saturating_sub(1);
    }
    if generic_row_count > 1 {
        return generic_row_count - 1;
    }
    0
}

fn is_header_word(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.eq_ignore_ascii_case(word))
}

/// Item name from the first cell of an items-table row: recognized link
/// text first, else the raw cell text when it is long enough and not a
/// column header.
fn item_name_from_cell(cell: &CellScrape) -> Option<String> {
    if let Some(link) = &cell.link_text {
        let link = link.trim();
        if !link.is_empty() {
            return Some(link.to_string());
        }
    }
    let text = cell.text.trim();
    if text.len() > 2 && !is_header_word(text, &["name", "item"]) {
        return Some(text.to_string());
    }
    None
}

/// Player name from the first cell of a reserved-table row
fn player_name_from_cell(cell: &CellScrape) -> Option<String> {
    if let Some(span) = &cell.titled_span {
        let span = span.trim();
        if !span.is_empty() {
            return Some(span.to_string());
        }
    }
    let text = cell.text.trim();
    if text.len() > 1 && !is_header_word(text, &["name", "player"]) {
        return Some(text.to_string());
    }
    None
}

/// Build the ordered item => reserve-count list from the items table.
///
/// Rows need at least 5 cells (name, slot, ilvl, from, soft-reservers);
/// the reserve count is the number of `.item-row` markers in cell 5.
/// A repeated item name keeps the last row's count.
pub fn build_item_reserve_list(items_table: &TableScrape) -> Vec<ItemEntry> {
    let mut entries: Vec<ItemEntry> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for row in &items_table.rows {
        if row.cells.len() < 5 {
            continue;
        }
        let Some(name) = item_name_from_cell(&row.cells[0]) else {
            continue;
        };
        let count = row.cells[4].marker_count;

        match index_by_name.get(&name) {
            Some(&i) => entries[i].count = count,
            None => {
                index_by_name.insert(name.clone(), entries.len());
                entries.push(ItemEntry { name, count });
            }
        }
    }

    entries
}

/// Build the player => reserved-items map from the reserved table.
///
/// Rows need at least 3 cells (name, class, items). Item names come from
/// `.itemlink-text` spans with any "(Nx)" suffix stripped; players whose
/// row yields no items are dropped entirely.
pub fn build_player_reserves_map(reserved_table: &TableScrape) -> HashMap<String, Vec<String>> {
    let mut player_map = HashMap::new();

    for row in &reserved_table.rows {
        if row.cells.len() < 3 {
            continue;
        }
        let Some(player) = player_name_from_cell(&row.cells[0]) else {
            continue;
        };

        let items: Vec<String> = row.cells[2]
            .itemlink_texts
            .iter()
            .map(|text| strip_quantity_suffix(text))
            .filter(|name| !name.is_empty())
            .collect();

        if items.is_empty() {
            log::debug!("player {player:?} found but no valid items parsed");
            continue;
        }
        player_map.insert(player, items);
    }

    player_map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_cell(text: &str) -> CellScrape {
        CellScrape {
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn item_row(name: &str, markers: u32) -> RowScrape {
        RowScrape {
            cells: vec![
                CellScrape {
                    text: name.to_string(),
                    link_text: Some(name.to_string()),
                    ..Default::default()
                },
                text_cell("Weapon"),
                text_cell("77"),
                text_cell("C'Thun"),
                CellScrape {
                    marker_count: markers,
                    ..Default::default()
                },
            ],
        }
    }

    fn reserved_row(player: &str, items: &[&str]) -> RowScrape {
        RowScrape {
            cells: vec![
                CellScrape {
                    text: player.to_string(),
                    titled_span: Some(player.to_string()),
                    ..Default::default()
                },
                text_cell("Warrior"),
                CellScrape {
                    itemlink_texts: items.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                },
            ],
        }
    }

    fn table_with_rows(rows: Vec<RowScrape>) -> TableScrape {
        TableScrape { rows }
    }

    #[test]
    fn test_count_players_subtracts_header() {
        let table = table_with_rows(vec![
            RowScrape::default(), // header
            reserved_row("Bob", &["Thunderfury"]),
            reserved_row("Alice", &["Ashkandi"]),
            reserved_row("Carl", &["Dragonbreath Hand Cannon"]),
        ]);
        assert_eq!(count_players(Some(&table), 0), 3);
    }

    #[test]
    fn test_count_players_header_only_and_missing() {
        let header_only = table_with_rows(vec![RowScrape::default()]);
        assert_eq!(count_players(Some(&header_only), 0), 0);
        assert_eq!(count_players(Some(&table_with_rows(vec![])), 0), 0);
        assert_eq!(count_players(None, 0), 0);
    }

    #[test]
    fn test_count_players_generic_fallback() {
        assert_eq!(count_players(None, 26), 25);
        assert_eq!(count_players(None, 1), 0);
    }

    #[test]
    fn test_item_reserve_list_counts_markers() {
        let table = table_with_rows(vec![
            RowScrape {
                cells: vec![
                    text_cell("Name"),
                    text_cell("Slot"),
                    text_cell("ilvl"),
                    text_cell("From"),
                    text_cell("Soft-reservers"),
                ],
            },
            item_row("Eye of C'Thun", 3),
            item_row("Dark Edge of Insanity", 0),
        ]);

        let entries = build_item_reserve_list(&table);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Eye of C'Thun");
        assert_eq!(entries[0].count, 3);
        assert_eq!(entries[1].count, 0);
    }

    #[test]
    fn test_item_reserve_list_skips_short_rows() {
        let table = table_with_rows(vec![RowScrape {
            cells: vec![text_cell("Eye of C'Thun"), text_cell("Weapon")],
        }]);
        assert!(build_item_reserve_list(&table).is_empty());
    }

    #[test]
    fn test_item_reserve_list_header_word_rejected() {
        // Cell text "Item" is a column header, not an item
        let mut row = item_row("x", 2);
        row.cells[0].link_text = None;
        row.cells[0].text = "Item".to_string();
        let table = table_with_rows(vec![row]);
        assert!(build_item_reserve_list(&table).is_empty());
    }

    #[test]
    fn test_item_reserve_list_last_write_wins() {
        let table = table_with_rows(vec![item_row("Thunderfury", 2), item_row("Thunderfury", 5)]);
        let entries = build_item_reserve_list(&table);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count, 5);
    }

    #[test]
    fn test_player_reserves_map_basic() {
        let table = table_with_rows(vec![
            reserved_row("Bob", &["Thunderfury", "Band of Accuria (2x)"]),
            reserved_row("Alice", &[]),
        ]);

        let map = build_player_reserves_map(&table);
        assert_eq!(
            map.get("Bob"),
            Some(&vec![
                "Thunderfury".to_string(),
                "Band of Accuria".to_string()
            ])
        );
        // Rows with no parsed items are dropped, not stored empty
        assert!(!map.contains_key("Alice"));
    }

    #[test]
    fn test_player_reserves_map_skips_short_rows() {
        let table = table_with_rows(vec![RowScrape {
            cells: vec![text_cell("Bob"), text_cell("Warrior")],
        }]);
        assert!(build_player_reserves_map(&table).is_empty());
    }

    #[test]
    fn test_strip_quantity_suffix() {
        assert_eq!(strip_quantity_suffix("Thunderfury (2x)"), "Thunderfury");
        assert_eq!(strip_quantity_suffix("Thunderfury(10x)"), "Thunderfury");
        assert_eq!(strip_quantity_suffix("Thunderfury"), "Thunderfury");
        assert_eq!(strip_quantity_suffix("Eye (of) C'Thun"), "Eye (of) C'Thun");
    }
}
