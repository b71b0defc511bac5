//! Catalog normalization: schema-variable quest databases in, canonical
//! quest and chapter records out.
//!
//! Catalogs drift across exporter versions: the root may be wrapped, the
//! database may live under several names, entries may carry `{key, value}`
//! wrappers, and display names may be literal text or translation keys.
//! Everything here resolves through the schema-tolerant accessor and
//! degrades instead of failing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::{collection_len, entries, entry_key, get, id_string, unwrap_entry};
use crate::lang::{LangTable, display_name_from_key, format_item_name};

/// Icon id used when a quest declares none.
pub const DEFAULT_ICON_ID: &str = "minecraft:book";

/// Item id marking a filled fluid container; combined with a `FluidName`
/// tag it becomes a synthetic `fluid:<name>` icon.
pub const FLUID_CONTAINER_ID: &str = "forge:bucketfilled";

/// Reward summary used when a quest has no recognizable rewards.
pub const NO_REWARDS: &str = "No rewards";

/// Icon descriptor for one quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconRef {
    pub id: String,
    pub damage: i64,
    pub count: i64,
    #[serde(default)]
    pub is_fluid: bool,
    #[serde(default)]
    pub fluid_name: Option<String>,
}

impl Default for IconRef {
    fn default() -> Self {
        Self {
            id: DEFAULT_ICON_ID.to_string(),
            damage: 0,
            count: 1,
            is_fluid: false,
            fluid_name: None,
        }
    }
}

/// Grid/graph placement hint carried by catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub x: f64,
    pub y: f64,
    pub size_x: f64,
    pub size_y: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            size_x: 24.0,
            size_y: 24.0,
        }
    }
}

/// One normalized quest, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: IconRef,
    pub rewards: String,
    #[serde(default)]
    pub chapter_id: Option<String>,
    pub pre_requisites: Vec<String>,
    pub layout: Layout,
    pub completed: bool,
}

/// One normalized chapter (quest line) with its member quests and their
/// per-chapter graph coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub name: String,
    pub quest_ids: Vec<String>,
    pub layouts: BTreeMap<String, Layout>,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub quests: Vec<QuestRecord>,
    pub chapters: Vec<ChapterRecord>,
}

impl Normalized {
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.quests.iter().filter(|q| q.completed).count()
    }
}

/// Externally supplied normalization knobs: localization, canonical chapter
/// ordering and the pack's translation-key prefixes.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub lang: LangTable,
    /// Canonical sidebar ordering; chapters matching by name (case
    /// insensitive, alias-aware) come first, the rest keep discovery order.
    pub chapter_order: Vec<String>,
    /// Known chapter-name variants, normalized lowercase -> lowercase.
    pub chapter_aliases: HashMap<String, String>,
    /// Prefix for chapter title keys, e.g. `<prefix>.<id>.title`.
    pub chapter_key_prefix: Option<String>,
    /// Prefix for per-quest title/desc keys, e.g. `<prefix>.<id>.title`.
    pub quest_key_prefix: Option<String>,
}

impl NormalizeOptions {
    /// Options matching the Nomifactory pack this tracker originally
    /// shipped for.
    #[must_use]
    pub fn nomifactory() -> Self {
        Self {
            lang: LangTable::empty(),
            chapter_order: [
                "Genesis",
                "The Beginning",
                "Simulating Resources",
                "Matter-Energy",
                "Early Game",
                "Into The Microverse",
                "Mid Game",
                "Late Game",
                "Fusion & Research",
                "End Game",
                "Processing Lines",
                "Progression",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            chapter_aliases: [("simulation resources", "simulating resources")]
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            chapter_key_prefix: Some("nomifactory.quest.normal.line".to_string()),
            quest_key_prefix: Some("nomifactory.quest.normal.db".to_string()),
        }
    }

    #[must_use]
    pub fn with_lang(mut self, lang: LangTable) -> Self {
        self.lang = lang;
        self
    }
}

/// Unwrap a one-level root wrapper: a `betterquesting` or `data` object, or
/// a single unknown key whose value is an object.
#[must_use]
pub fn effective_root(root: &Value) -> &Value {
    if let Some(inner) = root.get("betterquesting").filter(|v| v.is_object()) {
        return inner;
    }
    if let Some(inner) = root.get("data").filter(|v| v.is_object()) {
        return inner;
    }
    if let Some(map) = root.as_object()
        && map.len() == 1
        && let Some((_, only)) = map.iter().next()
        && only.is_object()
    {
        return only;
    }
    root
}

/// Normalize a catalog against a completed-id set.
#[must_use]
pub fn normalize(
    catalog_root: &Value,
    completed: &BTreeSet<String>,
    options: &NormalizeOptions,
) -> Normalized {
    let database = resolve_database(catalog_root);
    let mut quests = Vec::new();
    for (collection_key, raw_entry) in entries(database) {
        let quest = unwrap_entry(raw_entry);
        let fallback_id = entry_key(raw_entry).unwrap_or(collection_key);
        if let Some(record) = extract_quest(quest, &fallback_id, completed, options) {
            quests.push(record);
        }
    }
    log::debug!("normalized {} quests from catalog", quests.len());

    let chapters = extract_chapters(catalog_root, options);
    Normalized { quests, chapters }
}

/// Locate the quest database: known wrapper names first, then the largest
/// quest-shaped top-level collection, then the root itself.
fn resolve_database(root: &Value) -> &Value {
    for name in ["questDatabase", "questDB", "defaultQuests", "quests"] {
        if let Some(found) = get(root, name)
            && collection_len(found) > 0
        {
            return found;
        }
    }

    let mut best: Option<&Value> = None;
    let mut best_size = 0;
    if let Some(map) = root.as_object() {
        for candidate in map.values() {
            let size = collection_len(candidate);
            if size <= best_size {
                continue;
            }
            let Some((_, first)) = entries(candidate).into_iter().next() else {
                continue;
            };
            let sample = unwrap_entry(first);
            if get(sample, "properties").is_some()
                || get(sample, "name").is_some()
                || get(sample, "questID").is_some()
            {
                best = Some(candidate);
                best_size = size;
            }
        }
    }
    if let Some(found) = best {
        log::debug!("quest database located by shape heuristic");
        return found;
    }
    root
}

fn extract_quest(
    quest: &Value,
    fallback_id: &str,
    completed: &BTreeSet<String>,
    options: &NormalizeOptions,
) -> Option<QuestRecord> {
    if !quest.is_object() {
        return None;
    }
    let id = get(quest, "questID")
        .or_else(|| get(quest, "id"))
        .and_then(id_string)
        .unwrap_or_else(|| fallback_id.to_string());
    if id.is_empty() {
        return None;
    }

    let empty = Value::Object(serde_json::Map::new());
    let properties = get(quest, "properties").unwrap_or(&empty);
    let bq_props = get(properties, "betterquesting").unwrap_or(properties);

    let raw_name = get(bq_props, "name")
        .or_else(|| get(quest, "name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let raw_desc = get(bq_props, "desc")
        .or_else(|| get(quest, "description"))
        .and_then(Value::as_str)
        .unwrap_or("");

    // Entries with neither name nor description are catalog noise, not
    // quests.
    if raw_name.trim().is_empty() && raw_desc.trim().is_empty() {
        return None;
    }

    let mut name = if raw_name.contains('.') {
        options.lang.display_name(raw_name)
    } else if raw_name.is_empty() {
        format!("Quest {id}")
    } else {
        raw_name.to_string()
    };
    let mut description = if raw_desc.contains('.') && !raw_desc.contains(' ') {
        options.lang.display_name(raw_desc)
    } else {
        raw_desc.to_string()
    };

    // Per-quest lang overrides win over whatever the catalog carries.
    if let Some(prefix) = &options.quest_key_prefix {
        if let Some(title) = options.lang.get(&format!("{prefix}.{id}.title")) {
            name = title.to_string();
        }
        if let Some(desc) = options.lang.get(&format!("{prefix}.{id}.desc")) {
            description = desc.to_string();
        }
    }

    let chapter_id = get(quest, "chapterId")
        .or_else(|| get(quest, "lineId"))
        .and_then(id_string);

    Some(QuestRecord {
        completed: completed.contains(&id),
        icon: extract_icon(quest, bq_props),
        rewards: extract_rewards(quest),
        pre_requisites: extract_prerequisites(quest),
        layout: extract_layout(quest),
        chapter_id,
        id,
        name,
        description,
    })
}

fn extract_icon(quest: &Value, bq_props: &Value) -> IconRef {
    let empty = Value::Object(serde_json::Map::new());
    let icon = get(bq_props, "icon")
        .or_else(|| get(quest, "icon"))
        .unwrap_or(&empty);

    let item_id = get(icon, "id")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ICON_ID);
    let damage = get(icon, "Damage").and_then(Value::as_i64).unwrap_or(0);
    let count = get(icon, "Count").and_then(Value::as_i64).unwrap_or(1);

    if item_id == FLUID_CONTAINER_ID
        && let Some(tag) = get(icon, "tag")
        && let Some(fluid) = get(tag, "FluidName").and_then(Value::as_str)
    {
        return IconRef {
            id: format!("fluid:{fluid}"),
            damage: 0,
            count,
            is_fluid: true,
            fluid_name: Some(fluid.to_string()),
        };
    }

    IconRef {
        id: item_id.to_string(),
        damage,
        count,
        is_fluid: false,
        fluid_name: None,
    }
}

fn extract_rewards(quest: &Value) -> String {
    let mut summaries = Vec::new();
    if let Some(rewards) = get(quest, "rewards") {
        for (_, reward) in entries(rewards) {
            let Some(kind) = get(reward, "rewardID").and_then(Value::as_str) else {
                continue;
            };
            match kind {
                "bq_standard:item" => {
                    if let Some(items) = get(reward, "rewards") {
                        for (_, item) in entries(items) {
                            let item_id = get(item, "id")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown");
                            let count =
                                get(item, "Count").and_then(Value::as_i64).unwrap_or(1);
                            summaries.push(format!("{count}x {}", format_item_name(item_id)));
                        }
                    }
                }
                "bq_standard:xp" => {
                    let amount = get(reward, "amount").and_then(Value::as_i64).unwrap_or(0);
                    if amount > 0 {
                        summaries.push(format!("{amount} XP"));
                    }
                }
                // Unrecognized reward kinds (choice, command, ...) carry no
                // summary.
                _ => {}
            }
        }
    }
    if summaries.is_empty() {
        NO_REWARDS.to_string()
    } else {
        summaries.join(", ")
    }
}

fn extract_prerequisites(quest: &Value) -> Vec<String> {
    let Some(raw) = get(quest, "preRequisites") else {
        return Vec::new();
    };
    entries(raw)
        .into_iter()
        .filter_map(|(_, element)| {
            // Map-shaped lists may wrap each id in { value }.
            if let Some(inner) = element.get("value") {
                id_string(inner)
            } else {
                id_string(element)
            }
        })
        .collect()
}

fn extract_layout(node: &Value) -> Layout {
    let field = |name: &str, default: f64| {
        get(node, name)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };
    Layout {
        x: field("x", 0.0),
        y: field("y", 0.0),
        size_x: field("sizeX", 24.0),
        size_y: field("sizeY", 24.0),
    }
}

fn extract_chapters(root: &Value, options: &NormalizeOptions) -> Vec<ChapterRecord> {
    let mut chapters = Vec::new();
    let Some(lines) = get(root, "questLines") else {
        return chapters;
    };

    match lines {
        Value::Array(items) => {
            for (index, raw_entry) in items.iter().enumerate() {
                let line = unwrap_entry(raw_entry);
                let id = get(line, "lineID")
                    .or_else(|| get(line, "id"))
                    .and_then(id_string)
                    .or_else(|| entry_key(raw_entry))
                    .unwrap_or_else(|| index.to_string());
                let fallback = format!("Chapter {}", index + 1);
                chapters.push(build_chapter(line, id, &fallback, options));
            }
        }
        Value::Object(map) => {
            for (key, raw_entry) in map {
                let line = unwrap_entry(raw_entry);
                let fallback = format!("Chapter {key}");
                chapters.push(build_chapter(line, key.clone(), &fallback, options));
            }
        }
        _ => {}
    }

    reorder_chapters(chapters, options)
}

fn build_chapter(
    line: &Value,
    id: String,
    fallback_name: &str,
    options: &NormalizeOptions,
) -> ChapterRecord {
    let name = chapter_name(line, &id, fallback_name, options);
    let (quest_ids, layouts) = chapter_members(line);
    ChapterRecord {
        id,
        name,
        quest_ids,
        layouts,
    }
}

fn chapter_name(line: &Value, id: &str, fallback: &str, options: &NormalizeOptions) -> String {
    let empty = Value::Object(serde_json::Map::new());
    let properties = get(line, "properties").unwrap_or(&empty);
    let bq_props = get(properties, "betterquesting").unwrap_or(&empty);
    let raw_name = get(line, "name")
        .or_else(|| get(bq_props, "name"))
        .and_then(Value::as_str)
        .unwrap_or(fallback);

    if let Some(translated) = options.lang.get(raw_name) {
        return translated.to_string();
    }
    if let Some(prefix) = &options.chapter_key_prefix
        && let Some(translated) = options.lang.get(&format!("{prefix}.{id}.title"))
    {
        return translated.to_string();
    }
    raw_name.to_string()
}

/// Member quest ids plus their per-chapter layout coordinates, used when a
/// chapter renders as a dependency graph instead of a grid.
fn chapter_members(line: &Value) -> (Vec<String>, BTreeMap<String, Layout>) {
    let mut quest_ids = Vec::new();
    let mut layouts = BTreeMap::new();
    if let Some(raw) = get(line, "quests") {
        for (_, element) in entries(raw) {
            if !element.is_object() {
                continue;
            }
            let Some(quest_id) = get(element, "id").and_then(id_string) else {
                continue;
            };
            layouts.insert(quest_id.clone(), extract_layout(element));
            quest_ids.push(quest_id);
        }
    }
    (quest_ids, layouts)
}

/// Reorder chapters against the canonical ordering list; unmatched chapters
/// keep their discovery order at the end.
fn reorder_chapters(
    chapters: Vec<ChapterRecord>,
    options: &NormalizeOptions,
) -> Vec<ChapterRecord> {
    if options.chapter_order.is_empty() {
        return chapters;
    }

    let canonical = |name: &str| -> String {
        let normalized = name.trim().to_lowercase();
        options
            .chapter_aliases
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    };

    let mut used = vec![false; chapters.len()];
    let mut ordered = Vec::with_capacity(chapters.len());
    for wanted in &options.chapter_order {
        let wanted_norm = wanted.trim().to_lowercase();
        if let Some(index) = chapters
            .iter()
            .enumerate()
            .position(|(i, ch)| !used[i] && canonical(&ch.name) == wanted_norm)
        {
            used[index] = true;
            ordered.push(chapters[index].clone());
        }
    }
    for (index, chapter) in chapters.into_iter().enumerate() {
        if !used[index] {
            ordered.push(chapter);
        }
    }
    ordered
}
