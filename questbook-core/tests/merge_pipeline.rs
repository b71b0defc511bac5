//! End-to-end merge pipeline coverage: decode, reconcile, normalize.

use std::collections::BTreeSet;

use questbook_core::catalog::NormalizeOptions;
use questbook_core::lang::LangTable;
use questbook_core::{decode, decode_completed, encode_completed, merge, resolve_completed};
use serde_json::json;

fn sample_catalog() -> serde_json::Value {
    json!({
        "betterquesting": {
            "questDatabase:9": {
                "0:10": {
                    "questID:3": 1,
                    "properties:10": { "betterquesting:10": {
                        "name:8": "Getting Started",
                        "desc:8": "Break a log."
                    } },
                    "preRequisites:11": []
                },
                "1:10": {
                    "questID:3": 2,
                    "properties:10": { "betterquesting:10": {
                        "name:8": "nomifactory.quest.normal.db.2.title",
                        "desc:8": "Craft a furnace."
                    } },
                    "preRequisites:11": [1],
                    "rewards:9": {
                        "0:10": {
                            "rewardID:8": "bq_standard:item",
                            "rewards:9": {
                                "0:10": { "id:8": "minecraft:furnace", "Count:3": 1 }
                            }
                        }
                    }
                },
                "2:10": {
                    "questID:3": 99,
                    "properties:10": { "betterquesting:10": { "name:8": "", "desc:8": "" } }
                }
            },
            "questLines:9": {
                "0:10": {
                    "lineID:3": 0,
                    "name:8": "The Beginning",
                    "quests:9": {
                        "0:10": { "id:3": 1, "x:3": 0, "y:3": 0 },
                        "1:10": { "id:3": 2, "x:3": 48, "y:3": 0 }
                    }
                },
                "1:10": {
                    "lineID:3": 1,
                    "name:8": "GENESIS",
                    "quests:9": {}
                }
            }
        }
    })
}

#[test]
fn json_progress_merges_into_normalized_catalog() {
    let player = json!({
        "questProgress": [
            { "questID": 1, "completed": 1 },
            { "questID": 2, "completed": 0 }
        ]
    });
    let merged = merge(
        &sample_catalog(),
        Some(&player),
        None,
        &NormalizeOptions::default(),
    );

    // The noise entry (quest 99) is discarded.
    assert_eq!(merged.quests.len(), 2);
    assert_eq!(merged.completed_count(), 1);

    let started = merged.quests.iter().find(|q| q.id == "1").unwrap();
    assert!(started.completed);
    assert_eq!(started.name, "Getting Started");

    let furnace = merged.quests.iter().find(|q| q.id == "2").unwrap();
    assert!(!furnace.completed);
    assert_eq!(furnace.pre_requisites, vec!["1"]);
    assert_eq!(furnace.rewards, "1x Furnace");
}

#[test]
fn tag_tree_player_bytes_feed_the_same_pipeline() {
    // Hand-built tag tree: compound root holding an int-array of completed
    // quest ids, the oldest save schema.
    let mut bytes = vec![0x0a, 0x00, 0x00];
    bytes.push(0x0b);
    let name = b"completedQuests";
    bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
    bytes.extend_from_slice(name);
    bytes.extend_from_slice(&2i32.to_be_bytes());
    bytes.extend_from_slice(&1i32.to_be_bytes());
    bytes.extend_from_slice(&2i32.to_be_bytes());
    bytes.push(0x00);

    let root = decode(&bytes).unwrap().into_json();
    let completed = resolve_completed(None, Some(&root));
    assert_eq!(
        completed,
        BTreeSet::from(["1".to_string(), "2".to_string()])
    );

    let merged = merge(
        &sample_catalog(),
        Some(&root),
        None,
        &NormalizeOptions::default(),
    );
    assert_eq!(merged.completed_count(), 2);
}

#[test]
fn share_code_roundtrips_through_merge() {
    let player = json!({ "completedQuests": [1] });
    let merged = merge(
        &sample_catalog(),
        Some(&player),
        None,
        &NormalizeOptions::default(),
    );
    let completed: Vec<String> = merged
        .quests
        .iter()
        .filter(|q| q.completed)
        .map(|q| q.id.clone())
        .collect();
    let code = encode_completed(&completed).unwrap();

    let shared: BTreeSet<String> = decode_completed(&code).unwrap().into_iter().collect();
    let reloaded = merge(
        &sample_catalog(),
        None,
        Some(&shared),
        &NormalizeOptions::default(),
    );
    assert_eq!(reloaded.completed_count(), 1);
    assert!(reloaded.quests.iter().any(|q| q.id == "1" && q.completed));
}

#[test]
fn canonical_ordering_and_lang_overrides_apply() {
    let lang = LangTable::parse("nomifactory.quest.normal.db.2.title=Hot Stuff");
    let options = NormalizeOptions::nomifactory().with_lang(lang);
    let merged = merge(&sample_catalog(), None, None, &options);

    let names: Vec<&str> = merged.chapters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["GENESIS", "The Beginning"]);

    let furnace = merged.quests.iter().find(|q| q.id == "2").unwrap();
    assert_eq!(furnace.name, "Hot Stuff");

    let beginning = &merged.chapters[1];
    assert_eq!(beginning.quest_ids, vec!["1", "2"]);
    assert_eq!(beginning.layouts["2"].x, 48.0);
}
