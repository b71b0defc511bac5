//! Top-level merge pipeline: catalog plus player progress in, normalized
//! questbook out.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::catalog::{self, Normalized, NormalizeOptions};
use crate::progress;

/// Merge a quest catalog with optional player progress.
///
/// `shared` is a pre-resolved completed-id set (from a share link) and
/// bypasses progress reconciliation entirely when present. Otherwise the
/// completed set is reconciled from `player_root`, which may be absent for
/// a catalog-only view.
#[must_use]
pub fn merge(
    catalog_root: &Value,
    player_root: Option<&Value>,
    shared: Option<&BTreeSet<String>>,
    options: &NormalizeOptions,
) -> Normalized {
    let completed = progress::resolve_completed(shared, player_root);
    let unwrapped = catalog::effective_root(catalog_root);
    log::info!("merging catalog with {} completed quests", completed.len());
    catalog::normalize(unwrapped, &completed, options)
}
