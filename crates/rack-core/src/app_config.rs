use std::net::SocketAddr;
use std::path::PathBuf;

use crate::host_link::HostLinkRewriter;
use crate::mapping::FieldMapper;
use crate::pagination::PageWindow;
use crate::query::EmptyQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub config_path: PathBuf,
    /// `None` keeps the admin gate closed.
    pub admin_password: Option<String>,
    pub sheets_base_url: String,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_base_ms: u64,
    pub cache_ttl_secs: u64,
    pub empty_query: EmptyQuery,
    pub price_required: bool,
    pub page_size: usize,
    pub suggestion_limit: usize,
    pub image_host: String,
}

impl AppConfig {
    /// Field mapper carrying the configured price policy and image host.
    #[must_use]
    pub fn field_mapper(&self) -> FieldMapper {
        FieldMapper::new()
            .price_required(self.price_required)
            .image_host(HostLinkRewriter::new(&self.image_host))
    }

    /// Window for a request that may echo back an earlier `limit`.
    #[must_use]
    pub fn page_window(&self, limit: Option<usize>) -> PageWindow {
        match limit {
            Some(limit) => PageWindow::at(limit, self.page_size),
            None => PageWindow::new(self.page_size),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("config_path", &self.config_path)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[redacted]"),
            )
            .field("sheets_base_url", &self.sheets_base_url)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field(
                "fetch_retry_backoff_base_ms",
                &self.fetch_retry_backoff_base_ms,
            )
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("empty_query", &self.empty_query)
            .field("price_required", &self.price_required)
            .field("page_size", &self.page_size)
            .field("suggestion_limit", &self.suggestion_limit)
            .field("image_host", &self.image_host)
            .finish()
    }
}
