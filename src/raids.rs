/// Raid identification: codes, keyword heuristics, name-to-code mapping
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short tag for a raid instance, used as the BiS list key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaidCode {
    MC,
    BWL,
    ZG,
    AQ20,
    AQ40,
    NAXX,
    UNKNOWN,
}

impl RaidCode {
    /// All selectable raids, in display order (UNKNOWN excluded)
    pub fn all() -> [RaidCode; 6] {
        [
            RaidCode::MC,
            RaidCode::BWL,
            RaidCode::ZG,
            RaidCode::AQ20,
            RaidCode::AQ40,
            RaidCode::NAXX,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RaidCode::MC => "Molten Core",
            RaidCode::BWL => "Blackwing Lair",
            RaidCode::ZG => "Zul'Gurub",
            RaidCode::AQ20 => "Ruins of Ahn'Qiraj",
            RaidCode::AQ40 => "Temple of Ahn'Qiraj",
            RaidCode::NAXX => "Naxxramas",
            RaidCode::UNKNOWN => "Unknown",
        }
    }

    pub fn from_tag(tag: &str) -> RaidCode {
        match tag {
            "MC" => RaidCode::MC,
            "BWL" => RaidCode::BWL,
            "ZG" => RaidCode::ZG,
            "AQ20" => RaidCode::AQ20,
            "AQ40" => RaidCode::AQ40,
            "NAXX" => RaidCode::NAXX,
            _ => RaidCode::UNKNOWN,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RaidCode::MC => "MC",
            RaidCode::BWL => "BWL",
            RaidCode::ZG => "ZG",
            RaidCode::AQ20 => "AQ20",
            RaidCode::AQ40 => "AQ40",
            RaidCode::NAXX => "NAXX",
            RaidCode::UNKNOWN => "UNKNOWN",
        }
    }
}

impl fmt::Display for RaidCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raid-name substrings to raid codes, checked in declaration order.
/// First substring match wins, so "Temple of Ahn'Qiraj" must come before
/// the bare "Ahn'Qiraj" entry.
const RAID_MAPPINGS: &[(&str, RaidCode)] = &[
    ("Molten Core", RaidCode::MC),
    ("MC", RaidCode::MC),
    ("Blackwing Lair", RaidCode::BWL),
    ("BWL", RaidCode::BWL),
    ("Zul'Gurub", RaidCode::ZG),
    ("ZG", RaidCode::ZG),
    ("Ruins of Ahn'Qiraj", RaidCode::AQ20),
    ("AQ20", RaidCode::AQ20),
    ("Temple of Ahn'Qiraj", RaidCode::AQ40),
    ("Ahn'Qiraj", RaidCode::AQ40),
    ("AQ40", RaidCode::AQ40),
    ("Naxxramas", RaidCode::NAXX),
    ("NAXX", RaidCode::NAXX),
];

/// Keywords that mark a heading as a plausible raid title
const RAID_KEYWORDS: &[&str] = &[
    "molten",
    "core",
    "mc",
    "blackwing",
    "lair",
    "bwl",
    "zul'gurub",
    "zulgarub",
    "zg",
    "ahn'qiraj",
    "aq20",
    "aq40",
    "ruins",
    "temple",
    "naxxramas",
    "naxx",
];

/// Exact raid-name strings scanned for in the full page text as a fallback
const RAID_NAMES: &[&str] = &[
    "Molten Core",
    "MC",
    "Blackwing Lair",
    "BWL",
    "Ruins of Ahn'Qiraj",
    "AQ20",
    "Temple of Ahn'Qiraj",
    "Ahn'Qiraj",
    "AQ40",
    "Naxxramas",
    "NAXX",
];

/// Map a scraped raid name to its code via the ordered substring table
pub fn detect_raid_type(raid_name: &str) -> RaidCode {
    for (key, code) in RAID_MAPPINGS {
        if raid_name.contains(key) {
            return *code;
        }
    }
    RaidCode::UNKNOWN
}

/// Does this heading text look like a raid name?
pub fn is_raid_name(text: &str) -> bool {
    let lower = text.to_lowercase();
    RAID_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Scan arbitrary page text for the first known raid-name string
pub fn find_raid_in_text(body_text: &str) -> Option<&'static str> {
    RAID_NAMES.iter().find(|name| body_text.contains(*name)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_raid_type_exact() {
        assert_eq!(detect_raid_type("Molten Core"), RaidCode::MC);
        assert_eq!(detect_raid_type("Naxxramas"), RaidCode::NAXX);
        assert_eq!(detect_raid_type("Zul'Gurub"), RaidCode::ZG);
    }

    #[test]
    fn test_detect_raid_type_substring() {
        // Table order decides: "Temple of Ahn'Qiraj" is checked before "Ahn'Qiraj"
        assert_eq!(
            detect_raid_type("Temple of Ahn'Qiraj Loot Council"),
            RaidCode::AQ40
        );
        assert_eq!(detect_raid_type("Ruins of Ahn'Qiraj pug"), RaidCode::AQ20);
        assert_eq!(detect_raid_type("Weekly BWL run"), RaidCode::BWL);
    }

    #[test]
    fn test_detect_raid_type_unknown() {
        assert_eq!(detect_raid_type("Karazhan"), RaidCode::UNKNOWN);
        assert_eq!(detect_raid_type(""), RaidCode::UNKNOWN);
    }

    #[test]
    fn test_is_raid_name() {
        assert!(is_raid_name("Molten Core - Sunday"));
        assert!(is_raid_name("TEMPLE OF AHN'QIRAJ"));
        assert!(is_raid_name("naxx 25.03"));
        assert!(!is_raid_name("Sign-up sheet"));
    }

    #[test]
    fn test_find_raid_in_text() {
        let body = "Welcome raiders! Blackwing Lair starts at 20:00 server time.";
        assert_eq!(find_raid_in_text(body), Some("Blackwing Lair"));
        assert_eq!(find_raid_in_text("nothing relevant here"), None);
    }

    #[test]
    fn test_raid_code_serializes_as_tag() {
        let json = serde_json::to_string(&RaidCode::AQ40).unwrap();
        assert_eq!(json, "\"AQ40\"");
        let back: RaidCode = serde_json::from_str("\"BWL\"").unwrap();
        assert_eq!(back, RaidCode::BWL);
    }

    #[test]
    fn test_from_tag_round_trip() {
        for code in RaidCode::all() {
            assert_eq!(RaidCode::from_tag(code.tag()), code);
        }
        assert_eq!(RaidCode::from_tag("nonsense"), RaidCode::UNKNOWN);
    }
}
