use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::query::EmptyQuery;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("RACK_ENV", "development"));

    let bind_addr: SocketAddr = parse_var(&lookup, "RACK_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("RACK_LOG_LEVEL", "info");
    let config_path = PathBuf::from(or_default("RACK_CONFIG_PATH", "./config/rack.json"));

    let admin_password = lookup("RACK_ADMIN_PASSWORD")
        .ok()
        .filter(|p| !p.is_empty());
    if admin_password.is_none() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("RACK_ADMIN_PASSWORD".to_string()));
    }

    let sheets_base_url = or_default("RACK_SHEETS_BASE_URL", "https://docs.google.com")
        .trim_end_matches('/')
        .to_string();
    let fetch_timeout_secs: u64 = parse_var(&lookup, "RACK_FETCH_TIMEOUT_SECS", "10")?;
    let fetch_user_agent = or_default("RACK_FETCH_USER_AGENT", "rack-search/0.1");
    let fetch_max_retries: u32 = parse_var(&lookup, "RACK_FETCH_MAX_RETRIES", "0")?;
    let fetch_retry_backoff_base_ms: u64 =
        parse_var(&lookup, "RACK_FETCH_RETRY_BACKOFF_BASE_MS", "500")?;
    let cache_ttl_secs: u64 = parse_var(&lookup, "RACK_CACHE_TTL_SECS", "3600")?;

    let empty_query: EmptyQuery = parse_var(&lookup, "RACK_EMPTY_QUERY", "no_results")?;
    let price_required =
        parse_bool("RACK_PRICE_REQUIRED", &or_default("RACK_PRICE_REQUIRED", "false"))?;

    let page_size: usize = parse_var(&lookup, "RACK_PAGE_SIZE", "50")?;
    if page_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "RACK_PAGE_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let suggestion_limit: usize = parse_var(&lookup, "RACK_SUGGESTION_LIMIT", "7")?;
    let image_host = or_default("RACK_IMAGE_HOST", "https://drive.google.com");

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        config_path,
        admin_password,
        sheets_base_url,
        fetch_timeout_secs,
        fetch_user_agent,
        fetch_max_retries,
        fetch_retry_backoff_base_ms,
        cache_ttl_secs,
        empty_query,
        price_required,
        page_size,
        suggestion_limit,
        image_host,
    })
}

/// Parses `var` as `T`, falling back to `default` when unset.
fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Reads an on/off flag: `1`, `true`, `yes`, `on` or `0`, `false`, `no`,
/// `off`, empty. Case and surrounding whitespace are ignored.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    parse_flag(raw).ok_or_else(|| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: format!("expected a boolean, got '{}'", raw.trim()),
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn production_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("RACK_ENV", "production");
        m.insert("RACK_ADMIN_PASSWORD", "s3cret");
        m
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("OFF"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn development_defaults_without_any_vars() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).expect("defaults are valid");
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.config_path, std::path::PathBuf::from("./config/rack.json"));
        assert!(cfg.admin_password.is_none());
        assert_eq!(cfg.sheets_base_url, "https://docs.google.com");
        assert_eq!(cfg.fetch_timeout_secs, 10);
        assert_eq!(cfg.fetch_user_agent, "rack-search/0.1");
        assert_eq!(cfg.fetch_max_retries, 0);
        assert_eq!(cfg.fetch_retry_backoff_base_ms, 500);
        assert_eq!(cfg.cache_ttl_secs, 3600);
        assert_eq!(cfg.empty_query, EmptyQuery::NoResults);
        assert!(!cfg.price_required);
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.suggestion_limit, 7);
        assert_eq!(cfg.image_host, "https://drive.google.com");
    }

    #[test]
    fn production_requires_admin_password() {
        let mut map = production_env();
        map.remove("RACK_ADMIN_PASSWORD");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "RACK_ADMIN_PASSWORD"),
            "expected MissingEnvVar(RACK_ADMIN_PASSWORD), got: {result:?}"
        );
    }

    #[test]
    fn empty_admin_password_counts_as_missing() {
        let mut map = production_env();
        map.insert("RACK_ADMIN_PASSWORD", "");
        assert!(build_app_config(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let mut map = production_env();
        map.insert("RACK_EMPTY_QUERY", "show_all");
        map.insert("RACK_PRICE_REQUIRED", "true");
        map.insert("RACK_PAGE_SIZE", "20");
        map.insert("RACK_FETCH_MAX_RETRIES", "2");
        map.insert("RACK_SHEETS_BASE_URL", "http://127.0.0.1:9000/");
        let cfg = build_app_config(lookup_from_map(&map)).expect("valid overrides");
        assert_eq!(cfg.env, Environment::Production);
        assert_eq!(cfg.empty_query, EmptyQuery::ShowAll);
        assert!(cfg.price_required);
        assert_eq!(cfg.page_size, 20);
        assert_eq!(cfg.fetch_max_retries, 2);
        assert_eq!(cfg.sheets_base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let mut map = production_env();
        map.insert("RACK_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RACK_BIND_ADDR"),
            "expected InvalidEnvVar(RACK_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn invalid_empty_query_mode_is_rejected() {
        let mut map = production_env();
        map.insert("RACK_EMPTY_QUERY", "sometimes");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RACK_EMPTY_QUERY"),
            "expected InvalidEnvVar(RACK_EMPTY_QUERY), got: {result:?}"
        );
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let mut map = production_env();
        map.insert("RACK_PRICE_REQUIRED", "maybe");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RACK_PRICE_REQUIRED"),
            "expected InvalidEnvVar(RACK_PRICE_REQUIRED), got: {result:?}"
        );
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut map = production_env();
        map.insert("RACK_PAGE_SIZE", "0");
        assert!(build_app_config(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn debug_redacts_admin_password() {
        let map = production_env();
        let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("[redacted]"));
    }

    #[test]
    fn field_mapper_follows_price_policy() {
        let mut map = production_env();
        map.insert("RACK_PRICE_REQUIRED", "yes");
        let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
        assert!(cfg
            .field_mapper()
            .mandatory_fields()
            .contains(&crate::SemanticField::Price));
    }
}
