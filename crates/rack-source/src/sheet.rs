//! Spreadsheet addressing: turning an admin-pasted share URL into the pieces
//! the CSV export endpoint needs.

use std::sync::LazyLock;

use rack_core::StoredConfig;
use regex::Regex;

use crate::error::FetchError;

static SHEET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid sheet id regex"));

/// Extracts the spreadsheet ID from a share URL such as
/// `https://docs.google.com/spreadsheets/d/<ID>/edit#gid=0`.
///
/// Returns `None` for an empty URL or one without a `/d/<ID>` segment.
#[must_use]
pub fn extract_sheet_id(url: &str) -> Option<&str> {
    SHEET_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A spreadsheet ID plus the tab to export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub sheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    /// Resolves the source recorded in `config`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::NotConfigured`] when the URL or sheet name is blank.
    /// - [`FetchError::InvalidSheetUrl`] when the URL carries no sheet ID.
    pub fn from_config(config: &StoredConfig) -> Result<Self, FetchError> {
        if !config.has_source() {
            return Err(FetchError::NotConfigured);
        }
        Self::from_url(&config.sheet_url, config.sheet_name.trim())
    }

    /// # Errors
    ///
    /// Returns [`FetchError::InvalidSheetUrl`] when `url` carries no sheet ID.
    pub fn from_url(url: &str, sheet_name: &str) -> Result<Self, FetchError> {
        let sheet_id = extract_sheet_id(url).ok_or_else(|| FetchError::InvalidSheetUrl {
            url: url.to_owned(),
            reason: "no /d/<id> segment".to_owned(),
        })?;
        Ok(Self {
            sheet_id: sheet_id.to_owned(),
            sheet_name: sheet_name.to_owned(),
        })
    }
}
