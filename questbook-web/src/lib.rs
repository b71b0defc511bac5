//! Questbook Web
//!
//! Browser plumbing for the questbook progress tracker: data fetching,
//! uploaded-save sniffing, icon atlas transport and share links. The
//! rendering page talks to this crate through the exported bindings.

use std::collections::BTreeSet;

use questbook_core::catalog::NormalizeOptions;
use questbook_core::lang::LangTable;
use wasm_bindgen::prelude::*;

pub mod atlas_fetch;
pub mod loader;
pub mod share_link;

pub use atlas_fetch::HttpAtlasFetcher;
pub use loader::{LoadError, fetch_json, fetch_text, parse_player_bytes};
pub use share_link::{ShareLink, build_fragment, current_share, parse_fragment};

#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "panic-hook")]
    console_error_panic_hook::set_once();
}

/// Load and merge everything the page needs, returned as a JSON string of
/// the normalized questbook.
///
/// A share link in the current location overrides `player_bytes`.
///
/// # Errors
///
/// Returns a stringified error for transport or parse failures; a broken
/// share link is ignored rather than fatal.
#[wasm_bindgen]
pub async fn load_questbook(
    catalog_url: String,
    lang_url: Option<String>,
    player_bytes: Option<Vec<u8>>,
) -> Result<String, JsValue> {
    let catalog = loader::fetch_json(&catalog_url).await.map_err(to_js)?;

    let lang = match lang_url {
        Some(url) => match loader::fetch_text(&url).await {
            Ok(text) => LangTable::parse(&text),
            Err(err) => {
                log::warn!("lang file unavailable: {err}");
                LangTable::empty()
            }
        },
        None => LangTable::empty(),
    };
    let options = NormalizeOptions::nomifactory().with_lang(lang);

    let shared: Option<BTreeSet<String>> = share_link::current_share()
        .and_then(|link| match link.completed_ids() {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(err) => {
                log::warn!("ignoring malformed share link: {err}");
                None
            }
        });

    let player = match player_bytes {
        Some(bytes) => Some(loader::parse_player_bytes(&bytes).map_err(to_js)?),
        None => None,
    };

    let merged = questbook_core::merge(&catalog, player.as_ref(), shared.as_ref(), &options);
    serde_json::to_string(&merged).map_err(to_js)
}

/// Build a share fragment for the given completed quest ids, or `None`
/// when the list is empty.
#[wasm_bindgen]
#[must_use]
pub fn share_fragment(completed: Vec<String>, player: Option<String>) -> Option<String> {
    share_link::build_fragment(&completed, player.as_deref())
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
