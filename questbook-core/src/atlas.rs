//! Icon atlas cache with single-flight sheet loading.
//!
//! Icon blobs ship in per-category sheet files, each a JSON object mapping
//! icon ids to base64 image data. Sheets are fetched lazily; concurrent
//! requests for the same sheet share one in-flight fetch through a waiter
//! list instead of polling. A failed sheet is retried on the next request.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Read;
use std::rc::Rc;

use futures::channel::oneshot;
use serde_json::Value;
use thiserror::Error;

use crate::nbt::GZIP_MAGIC;

/// A loaded sheet: icon id to base64 blob. Shared by every waiter.
pub type AtlasMap = Rc<HashMap<String, String>>;

/// Transport-level fetch failure, produced by the platform fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("fetch failed: {0}")]
    Transport(String),
}

/// Platform hook for retrieving atlas bytes. Single-threaded async; the
/// browser build backs this with HTTP, tests back it with fixtures.
#[allow(async_fn_in_trait)]
pub trait AtlasFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Inverted atlas index: which sheet holds which icon id.
///
/// The index file maps category-qualified paths (`"Blocks/Ores"`) to id
/// lists. Sheets are fetched as `<base>/<name>.<ext>` with the category
/// already part of the base URL, so only the trailing name segment is kept
/// when the mapping is inverted at parse time.
#[derive(Debug, Clone, Default)]
pub struct AtlasIndex {
    sheet_by_id: HashMap<String, String>,
}

impl AtlasIndex {
    #[must_use]
    pub fn from_json(index: &Value) -> Self {
        let mut sheet_by_id = HashMap::new();
        if let Some(map) = index.as_object() {
            for (sheet_path, ids) in map {
                let sheet_name = sheet_path.rsplit('/').next().unwrap_or(sheet_path);
                if let Some(ids) = ids.as_array() {
                    for id in ids.iter().filter_map(Value::as_str) {
                        sheet_by_id.insert(id.to_string(), sheet_name.to_string());
                    }
                }
            }
        }
        Self { sheet_by_id }
    }

    #[must_use]
    pub fn sheet_for(&self, icon_id: &str) -> Option<&str> {
        self.sheet_by_id.get(icon_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sheet_by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheet_by_id.is_empty()
    }
}

enum SheetState {
    Loading(Vec<oneshot::Sender<Option<AtlasMap>>>),
    Loaded(AtlasMap),
    Failed,
}

/// Lazy, deduplicating sheet cache over an [`AtlasFetcher`].
pub struct AtlasCache<F> {
    fetcher: F,
    base: String,
    sheets: RefCell<HashMap<String, SheetState>>,
}

impl<F: AtlasFetcher> AtlasCache<F> {
    pub fn new(fetcher: F, base: impl Into<String>) -> Self {
        Self {
            fetcher,
            base: base.into(),
            sheets: RefCell::new(HashMap::new()),
        }
    }

    /// Fetch a sheet by key, deduplicating concurrent requests.
    ///
    /// The first caller performs the fetch; later callers park on a oneshot
    /// waiter until it resolves. `None` means the sheet could not be loaded
    /// this time.
    pub async fn sheet(&self, key: &str) -> Option<AtlasMap> {
        // The borrow must end before any await point.
        let waiter = {
            let mut sheets = self.sheets.borrow_mut();
            match sheets.get_mut(key) {
                Some(SheetState::Loaded(map)) => return Some(Rc::clone(map)),
                Some(SheetState::Loading(waiters)) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                Some(SheetState::Failed) | None => {
                    sheets.insert(key.to_string(), SheetState::Loading(Vec::new()));
                    None
                }
            }
        };
        if let Some(rx) = waiter {
            return rx.await.ok().flatten();
        }

        let result = self.load_sheet(key).await;
        let waiters = {
            let mut sheets = self.sheets.borrow_mut();
            let next = match &result {
                Some(map) => SheetState::Loaded(Rc::clone(map)),
                None => SheetState::Failed,
            };
            match sheets.insert(key.to_string(), next) {
                Some(SheetState::Loading(waiters)) => waiters,
                _ => Vec::new(),
            }
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
        result
    }

    /// Resolve one icon to a browser-ready data URL, loading the owning
    /// sheet on demand.
    pub async fn resolve_icon(&self, sheet_key: &str, icon_id: &str) -> Option<String> {
        let sheet = self.sheet(sheet_key).await?;
        let blob = sheet.get(icon_id)?;
        Some(format!("data:{};base64,{blob}", blob_mime(blob)))
    }

    async fn load_sheet(&self, key: &str) -> Option<AtlasMap> {
        // Compressed sheet first, plain JSON as the fallback.
        match self.fetcher.fetch(&format!("{}/{key}.gtbl", self.base)).await {
            Ok(bytes) => {
                if let Some(map) = parse_sheet_bytes(&bytes) {
                    return Some(Rc::new(map));
                }
                log::warn!("atlas sheet {key}.gtbl is unreadable, trying json");
            }
            Err(err) => log::debug!("atlas sheet {key}.gtbl unavailable: {err}"),
        }
        match self.fetcher.fetch(&format!("{}/{key}.json", self.base)).await {
            Ok(bytes) => parse_sheet_bytes(&bytes).map(Rc::new),
            Err(err) => {
                log::warn!("atlas sheet {key} failed to load: {err}");
                None
            }
        }
    }
}

/// Decode sheet bytes, gunzipping when the gzip magic is present, into the
/// id-to-blob map.
fn parse_sheet_bytes(bytes: &[u8]) -> Option<HashMap<String, String>> {
    let json: Vec<u8> = if bytes.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .ok()?;
        out
    } else {
        bytes.to_vec()
    };
    let parsed: Value = serde_json::from_slice(&json).ok()?;
    let map = parsed.as_object()?;
    Some(
        map.iter()
            .filter_map(|(id, blob)| Some((id.clone(), blob.as_str()?.to_string())))
            .collect(),
    )
}

/// Sniff the image type from the head of a base64 blob. PNG base64 always
/// starts with `iVBOR`; everything else the sheets carry is webp.
#[must_use]
pub fn blob_mime(blob: &str) -> &'static str {
    if blob.starts_with("iVBOR") {
        "image/png"
    } else {
        "image/webp"
    }
}
