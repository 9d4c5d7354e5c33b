pub mod cache;
pub mod client;
pub mod error;
pub mod parse;
pub mod sheet;

mod retry;

pub use cache::{Cached, CachedSheetSource, TtlCache};
pub use client::SheetClient;
pub use error::FetchError;
pub use parse::parse_csv;
pub use sheet::{extract_sheet_id, SheetRef};
