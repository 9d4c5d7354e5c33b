use thiserror::Error;

/// Failure to obtain the raw book table from the spreadsheet.
///
/// Every variant is non-fatal for the caller: it is surfaced to the user and
/// the next refresh tries again.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by spreadsheet host (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("sheet not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The host answered with a page instead of CSV, which is what a sheet
    /// that is not shared publicly looks like.
    #[error("expected CSV from {url} but got {content_type}; share the sheet as \"anyone with the link can view\"")]
    NotCsv { url: String, content_type: String },

    #[error("invalid CSV: {source}")]
    InvalidCsv {
        #[source]
        source: csv::Error,
    },

    #[error("invalid sheet URL \"{url}\": {reason}")]
    InvalidSheetUrl { url: String, reason: String },

    #[error("no spreadsheet configured")]
    NotConfigured,
}
