//! HTTP client for the spreadsheet CSV export endpoint.

use std::time::Duration;

use rack_core::RawTable;
use reqwest::{Client, Url};

use crate::error::FetchError;
use crate::parse::parse_csv;
use crate::retry::retry_with_backoff;
use crate::sheet::SheetRef;

const DEFAULT_BASE_URL: &str = "https://docs.google.com";

/// Downloads a sheet tab as CSV and parses it into a [`RawTable`].
///
/// Transient failures (network, timeout, 429, 5xx) are retried up to
/// `max_retries` extra times. Use [`SheetClient::with_base_url`] to point at a
/// mock server in tests.
pub struct SheetClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SheetClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, FetchError> {
        Self::with_base_url(
            timeout_secs,
            user_agent,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`FetchError::InvalidSheetUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| FetchError::InvalidSheetUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches one tab of a spreadsheet.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RateLimited`] on HTTP 429 after all retries, or at once
    ///   when the host asks for a wait longer than the back-off cap.
    /// - [`FetchError::NotFound`] on HTTP 404.
    /// - [`FetchError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`FetchError::NotCsv`] when the host returns an HTML page.
    /// - [`FetchError::InvalidCsv`] when the body is not valid CSV.
    /// - [`FetchError::Http`] on network failure or timeout after all retries.
    pub async fn fetch(&self, sheet_id: &str, sheet_name: &str) -> Result<RawTable, FetchError> {
        let url = self.export_url(sheet_id, sheet_name)?;
        tracing::debug!(%url, "fetching sheet export");

        let table = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move { self.fetch_once(url).await }
        })
        .await?;

        tracing::info!(
            sheet_id,
            sheet_name,
            columns = table.columns().len(),
            rows = table.len(),
            "fetched sheet"
        );
        Ok(table)
    }

    /// Convenience wrapper over [`SheetClient::fetch`] for a resolved source.
    ///
    /// # Errors
    ///
    /// See [`SheetClient::fetch`].
    pub async fn fetch_sheet(&self, sheet: &SheetRef) -> Result<RawTable, FetchError> {
        self.fetch(&sheet.sheet_id, &sheet.sheet_name).await
    }

    async fn fetch_once(&self, url: Url) -> Result<RawTable, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if content_type.starts_with("text/html") {
            return Err(FetchError::NotCsv {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await?;
        if looks_like_html(&body) {
            return Err(FetchError::NotCsv {
                url: url.to_string(),
                content_type,
            });
        }
        parse_csv(&body)
    }

    /// Builds `<base>/spreadsheets/d/<id>/gviz/tq?tqx=out:csv&sheet=<name>`.
    fn export_url(&self, sheet_id: &str, sheet_name: &str) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&format!("spreadsheets/d/{sheet_id}/gviz/tq"))
            .map_err(|e| FetchError::InvalidSheetUrl {
                url: sheet_id.to_owned(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:csv")
            .append_pair("sheet", sheet_name);
        Ok(url)
    }
}

/// Sign-in and error pages sometimes arrive under a non-HTML content type.
fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start()
        .chars()
        .take(14)
        .flat_map(char::to_lowercase)
        .collect();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
