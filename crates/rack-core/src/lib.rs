pub mod app_config;
pub mod config;
pub mod error;
pub mod fields;
pub mod host_link;
pub mod mapping;
pub mod normalize;
pub mod pagination;
pub mod query;
pub mod row;
pub mod store;
pub mod table;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, parse_flag};
pub use error::{ConfigError, MappingError};
pub use fields::{FieldMapping, SemanticField};
pub use host_link::{rewrite_host_link, HostLinkRewriter};
pub use mapping::{apply_mapping, check_columns, duplicate_columns, FieldMapper};
pub use pagination::{Page, PageWindow};
pub use query::{filter, filter_by_identifier, suggest, EmptyQuery, Scope, Suggestion};
pub use row::MappedRow;
pub use store::{ConfigStore, JsonFileStore, StoredConfig};
pub use table::RawTable;
