//! Translation table and display-name fallbacks.
//!
//! Catalogs frequently store dotted translation keys instead of literal
//! names (`nomifactory.quest.normal.vacuum_freezer`). When the pack's lang
//! file is available the key is looked up there; otherwise the last dot
//! segment is title-cased as a readable fallback.

use std::collections::HashMap;

/// A `key=value` translation table parsed from a Minecraft-style lang file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LangTable {
    entries: HashMap<String, String>,
}

impl LangTable {
    /// Create an empty table (no localization available).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse lang-file text. Blank lines and `#` comments are skipped;
    /// CR/CRLF line endings are tolerated.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a dotted translation key to a display name: table lookup
    /// first, heuristic title-casing of the last dot segment otherwise.
    #[must_use]
    pub fn display_name(&self, key: &str) -> String {
        if let Some(translated) = self.get(key) {
            return translated.to_string();
        }
        display_name_from_key(key)
    }
}

/// Heuristic fallback for a dotted translation key:
/// `pack.quest.normal.vacuum_freezer` becomes `Vacuum Freezer`.
#[must_use]
pub fn display_name_from_key(key: &str) -> String {
    let trimmed = key.trim();
    if !trimmed.contains('.') {
        return trimmed.to_string();
    }
    let last = trimmed.rsplit('.').next().unwrap_or(trimmed);
    last.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reward item names drop the mod prefix and title-case the remainder:
/// `gregtech:electric_motor` becomes `Electric Motor`.
#[must_use]
pub fn format_item_name(item_id: &str) -> String {
    let name = item_id.split_once(':').map_or(item_id, |(_, rest)| rest);
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_comments() {
        let text = "# header\r\nfoo.bar=Baz\r\n\r\nbroken line\r\na.b = spaced \r\n";
        let table = LangTable::parse(text);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("foo.bar"), Some("Baz"));
        assert_eq!(table.get("a.b"), Some("spaced"));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn display_name_prefers_table_over_heuristic() {
        let table = LangTable::parse("pack.quest.vacuum_freezer=The Freezer");
        assert_eq!(table.display_name("pack.quest.vacuum_freezer"), "The Freezer");
        assert_eq!(table.display_name("pack.quest.arc_furnace"), "Arc Furnace");
    }

    #[test]
    fn heuristic_title_cases_last_segment() {
        assert_eq!(display_name_from_key("a.b.vacuum_freezer"), "Vacuum Freezer");
        assert_eq!(display_name_from_key("a.b.HELLO_world"), "Hello World");
        assert_eq!(display_name_from_key("no_dots_here"), "no_dots_here");
    }

    #[test]
    fn item_names_drop_mod_prefix() {
        assert_eq!(format_item_name("minecraft:iron_ingot"), "Iron Ingot");
        assert_eq!(format_item_name("bare_item"), "Bare Item");
        // Casing after the first letter is preserved, unlike translation keys
        assert_eq!(format_item_name("mod:HV_capacitor"), "HV Capacitor");
    }
}
