//! Completion reconciliation over player progress trees.
//!
//! Progress files come in several historical shapes (NBT exports, JSON
//! exports, party snapshots). Instead of guessing a single schema, every
//! visited node is run through a fixed list of independent matchers; the
//! resulting id set is strictly additive.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::access::{base_key, entries, entry_key, get, id_string, unwrap_entry};

/// Depth guard for the recursive walk. Progress trees are not expected to
/// cycle, but depth is bounded anyway.
const MAX_DEPTH: u32 = 20;

/// Depth guard for the UUID scan.
const MAX_UUID_DEPTH: u32 = 10;

/// Fields interpreted by a matcher; the recursion does not re-enter them.
const CONSUMED_FIELDS: [&str; 6] = [
    "completedQuests",
    "completedQuestIds",
    "questProgress",
    "UserProgress",
    "PartyProgress",
    "quests",
];

/// Known leaf fields inside progress entries; descending into them can only
/// reinterpret substructure a matcher already consumed.
const LEAF_FIELDS: [&str; 11] = [
    "tasks",
    "userProgress",
    "completeUsers",
    "data",
    "completed",
    "claimed",
    "timestamp",
    "uuid",
    "taskID",
    "index",
    "questID",
];

/// Resolve the completed-id set for one player snapshot.
///
/// A precomputed set (e.g. restored from a share link) bypasses traversal
/// entirely and is used verbatim. With no player data at all, every unit is
/// simply incomplete.
#[must_use]
pub fn resolve_completed(
    shared: Option<&BTreeSet<String>>,
    progress_root: Option<&Value>,
) -> BTreeSet<String> {
    if let Some(shared) = shared {
        return shared.clone();
    }
    match progress_root {
        Some(root) => completed_set(root),
        None => BTreeSet::new(),
    }
}

/// Walk a progress tree and collect every unit id judged complete.
#[must_use]
pub fn completed_set(progress_root: &Value) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    walk(progress_root, 0, &mut ids);
    log::debug!("reconciled {} completed unit ids", ids.len());
    ids
}

/// The completion predicate: 1, `true`, `"1"`, or any non-empty container.
/// Several producers encode "completed" as an otherwise-empty marker map,
/// so presence of nested content counts as evidence.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Value::String(s) => s == "1",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn walk(node: &Value, depth: u32, ids: &mut BTreeSet<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    let Some(map) = node.as_object() else {
        return;
    };

    // Matchers run independently, without early exit.
    match_direct_id_lists(node, ids);
    let progress_table = match_progress_table(node, ids);
    match_direct_quest_map(node, progress_table, ids);
    match_party_progress(node, ids);

    for (key, child) in map {
        let base = base_key(key);
        if CONSUMED_FIELDS.contains(&base) || LEAF_FIELDS.contains(&base) {
            continue;
        }
        if child.is_object() {
            walk(child, depth + 1, ids);
        }
    }
}

/// `completedQuests` (list or map-of-keys) and `completedQuestIds` (list).
fn match_direct_id_lists(node: &Value, ids: &mut BTreeSet<String>) {
    if let Some(cq) = get(node, "completedQuests") {
        match cq {
            Value::Array(items) => {
                for item in items {
                    add_id(ids, item);
                }
            }
            Value::Object(map) => {
                for key in map.keys() {
                    ids.insert(key.clone());
                }
            }
            _ => {}
        }
    }
    if let Some(Value::Array(items)) = get(node, "completedQuestIds") {
        for item in items {
            add_id(ids, item);
        }
    }
}

/// The main `questProgress` table. Returns the matched value so the direct
/// `quests` matcher can avoid double-processing the same table under two
/// names.
fn match_progress_table<'a>(node: &'a Value, ids: &mut BTreeSet<String>) -> Option<&'a Value> {
    let table = get(node, "questProgress")?;
    for (_, raw_entry) in entries(table) {
        if !raw_entry.is_object() {
            continue;
        }
        let entry = unwrap_entry(raw_entry);
        // Entries carrying no id at all are skipped; the raw collection key
        // is positional (or suffixed junk like "0:10"), not a unit id.
        let Some(unit_id) = get(entry, "questID")
            .or_else(|| get(entry, "id"))
            .and_then(id_string)
            .or_else(|| entry_key(raw_entry))
        else {
            continue;
        };

        if entry_is_complete(entry) {
            ids.insert(unit_id);
        }
    }
    Some(table)
}

/// Completion test for one progress entry: a truthy `completed` or `claimed`
/// flag, else all sub-tasks individually complete.
fn entry_is_complete(entry: &Value) -> bool {
    if get(entry, "completed").is_some_and(is_truthy) {
        return true;
    }
    if get(entry, "claimed").is_some_and(is_truthy) {
        return true;
    }
    let Some(tasks) = get(entry, "tasks") else {
        return false;
    };
    let task_entries = entries(tasks);
    if task_entries.is_empty() {
        return false;
    }
    task_entries.iter().all(|(_, raw_task)| {
        if !raw_task.is_object() {
            return false;
        }
        let task = unwrap_entry(raw_task);
        match get(task, "completeUsers") {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(Value::String(s)) => !s.is_empty(),
        }
    })
}

/// Direct `quests` map keyed by unit id. Skipped when it aliases the
/// `questProgress` value already handled above.
fn match_direct_quest_map(
    node: &Value,
    progress_table: Option<&Value>,
    ids: &mut BTreeSet<String>,
) {
    let Some(quests) = get(node, "quests") else {
        return;
    };
    if progress_table.is_some_and(|table| std::ptr::eq(table, quests)) {
        return;
    }
    for (key, raw_entry) in entries(quests) {
        if !raw_entry.is_object() {
            continue;
        }
        let entry = unwrap_entry(raw_entry);
        if get(entry, "completed").is_some_and(is_truthy)
            || get(entry, "claimed").is_some_and(is_truthy)
        {
            let unit_id = get(entry, "questID").and_then(id_string).unwrap_or(key);
            ids.insert(unit_id);
        }
    }
}

/// `UserProgress` / `PartyProgress`: per-player `quests` tables keyed by
/// unit id.
fn match_party_progress(node: &Value, ids: &mut BTreeSet<String>) {
    let Some(progress) = get(node, "UserProgress").or_else(|| get(node, "PartyProgress")) else {
        return;
    };
    for (_, player) in entries(progress) {
        if !player.is_object() {
            continue;
        }
        let Some(quests) = get(player, "quests") else {
            continue;
        };
        for (unit_id, raw_state) in entries(quests) {
            if !raw_state.is_object() {
                continue;
            }
            let state = unwrap_entry(raw_state);
            if get(state, "completed").is_some_and(is_truthy)
                || get(state, "claimed").is_some_and(is_truthy)
            {
                ids.insert(unit_id);
            }
        }
    }
}

fn add_id(ids: &mut BTreeSet<String>, value: &Value) {
    if let Some(id) = id_string(value) {
        ids.insert(id);
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Scan a player tree for a UUID, either as a map key (party tables key
/// sub-players by UUID) or under a `uuid` field. Consumers hand the result
/// to the external identity service.
#[must_use]
pub fn find_player_uuid(node: &Value) -> Option<String> {
    find_uuid_inner(node, 0)
}

fn find_uuid_inner(node: &Value, depth: u32) -> Option<String> {
    if depth > MAX_UUID_DEPTH {
        return None;
    }
    if let Value::Array(items) = node {
        return items
            .iter()
            .find_map(|item| find_uuid_inner(item, depth + 1));
    }
    let map = node.as_object()?;
    for (key, child) in map {
        if UUID_RE.is_match(key) {
            return Some(key.clone());
        }
        if base_key(key) == "uuid"
            && let Some(text) = child.as_str()
            && text.len() >= 32
        {
            return Some(text.to_string());
        }
        if child.is_object() || child.is_array() {
            if let Some(found) = find_uuid_inner(child, depth + 1) {
                return Some(found);
            }
        }
    }
    None
}
