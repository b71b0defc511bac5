//! Questbook Core
//!
//! Platform-agnostic merge pipeline for the questbook progress tracker.
//! This crate decodes tag-tree player saves, reconciles completion state
//! across historical save schemas and normalizes quest catalogs, without
//! any UI or platform-specific dependencies.

pub mod access;
pub mod atlas;
pub mod catalog;
pub mod lang;
pub mod merge;
pub mod nbt;
pub mod progress;
pub mod share;

// Re-export commonly used types
pub use atlas::{AtlasCache, AtlasFetcher, AtlasIndex, AtlasMap, FetchError, blob_mime};
pub use catalog::{
    ChapterRecord, IconRef, Layout, Normalized, NormalizeOptions, QuestRecord, effective_root,
    normalize,
};
pub use lang::{LangTable, display_name_from_key, format_item_name};
pub use merge::merge;
pub use nbt::{DecodeError, TagValue, decode, decode_named};
pub use progress::{completed_set, find_player_uuid, is_truthy, resolve_completed};
pub use share::{ShareDecodeError, decode_completed, encode_completed};
