//! HTTP-backed atlas fetcher for the browser build.

use questbook_core::atlas::{AtlasFetcher, FetchError};

/// Fetches atlas sheets relative to the site root.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpAtlasFetcher;

impl AtlasFetcher for HttpAtlasFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let response = gloo_net::http::Request::get(path)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        match response.status() {
            200 => response
                .binary()
                .await
                .map_err(|err| FetchError::Transport(err.to_string())),
            404 => Err(FetchError::NotFound(path.to_string())),
            status => Err(FetchError::Transport(format!(
                "status {status} for {path}"
            ))),
        }
    }
}
