use std::collections::HashMap;
use std::time::Duration;

use gateway::{GatewayConfig, RetryPolicy, Route};
use url::Url;

use crate::errors::{AppError, AppResult};
use crate::storage::DEFAULT_LATENCY;

const ENV_PREFIX: &str = "NEWSDESK_";

/// `NEWSDESK_DB_PATH` value selecting the volatile in-process store.
pub const IN_MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    /// Per-route path overrides, keyed by route.
    pub route_overrides: HashMap<Route, String>,
    pub api_timeout: Duration,
    pub api_max_retries: u32,
    pub api_retry_base: Duration,
    pub api_min_interval: Duration,
    pub db_path: String,
    pub store_latency: Duration,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> AppResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(name, _)| name.starts_with(ENV_PREFIX))
            .collect();

        let default_db = exe_dir
            .map(|d| d.join("newsdesk.db").to_string_lossy().into_owned())
            .unwrap_or_else(|| "./newsdesk.db".to_string());

        Self::from_vars(&vars, default_db)
    }

    /// Builds the configuration from `NEWSDESK_*` variables.
    pub fn from_vars(vars: &HashMap<String, String>, default_db: String) -> AppResult<Self> {
        let get = |name: &str| {
            vars.get(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_base_url = match get("API_BASE_URL") {
            Some(raw) => {
                Url::parse(&raw).map_err(|e| AppError::Config(format!("NEWSDESK_API_BASE_URL: {}", e)))?;
                Some(raw)
            }
            None => None,
        };

        // Present-but-empty overrides are kept: they disable the route.
        let route_overrides = Route::ALL
            .iter()
            .filter_map(|route| {
                vars.get(&format!("{}API_ROUTE_{}", ENV_PREFIX, route.env_suffix()))
                    .map(|path| (*route, path.trim().to_string()))
            })
            .collect();

        Ok(Self {
            api_base_url,
            api_token: get("API_TOKEN"),
            route_overrides,
            api_timeout: millis(get("API_TIMEOUT_MS"), "API_TIMEOUT_MS", 15_000)?,
            api_max_retries: number(get("API_MAX_RETRIES"), "API_MAX_RETRIES", 2)?,
            api_retry_base: millis(get("API_RETRY_BASE_MS"), "API_RETRY_BASE_MS", 500)?,
            api_min_interval: millis(get("API_MIN_INTERVAL_MS"), "API_MIN_INTERVAL_MS", 0)?,
            db_path: get("DB_PATH").unwrap_or(default_db),
            store_latency: millis(
                get("STORE_LATENCY_MS"),
                "STORE_LATENCY_MS",
                DEFAULT_LATENCY.as_millis() as u64,
            )?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_path == IN_MEMORY_DB
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::new()
            .with_timeout(self.api_timeout)
            .with_retry(RetryPolicy::new(self.api_max_retries, self.api_retry_base))
            .with_min_interval(self.api_min_interval);

        if let Some(base_url) = &self.api_base_url {
            config = config.with_base_url(base_url.as_str());
        }
        if let Some(token) = &self.api_token {
            config = config.with_token(token.as_str());
        }
        for (route, path) in &self.route_overrides {
            config = config.with_route(*route, path.as_str());
        }
        config
    }
}

fn number<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> AppResult<T> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| {
            AppError::Config(format!(
                "{}{} must be a non-negative integer, got {:?}",
                ENV_PREFIX, name, raw
            ))
        }),
        None => Ok(default),
    }
}

fn millis(raw: Option<String>, name: &str, default: u64) -> AppResult<Duration> {
    number(raw, name, default).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new(), "default.db".to_string()).unwrap();

        assert_eq!(config.api_base_url, None);
        assert_eq!(config.api_timeout, Duration::from_millis(15_000));
        assert_eq!(config.api_max_retries, 2);
        assert_eq!(config.api_retry_base, Duration::from_millis(500));
        assert_eq!(config.store_latency, DEFAULT_LATENCY);
        assert_eq!(config.db_path, "default.db");
        assert!(!config.gateway_config().is_configured());
    }

    #[test]
    fn test_reads_remote_settings() {
        let config = Config::from_vars(
            &vars(&[
                ("NEWSDESK_API_BASE_URL", "https://api.example.com/v1/"),
                ("NEWSDESK_API_TOKEN", "secret"),
                ("NEWSDESK_API_TIMEOUT_MS", "2500"),
                ("NEWSDESK_API_MAX_RETRIES", "4"),
                ("NEWSDESK_API_ROUTE_FETCH_REAL_NEWS", "/custom/fetch"),
                ("NEWSDESK_API_ROUTE_SEND_TEAMS", ""),
            ]),
            "x.db".to_string(),
        )
        .unwrap();

        let gateway = config.gateway_config();
        assert_eq!(
            gateway.url_for(Route::FetchRealNews).as_deref(),
            Some("https://api.example.com/v1/custom/fetch")
        );
        assert!(!gateway.is_route_configured(Route::SendToTeams));
        assert!(gateway.is_route_configured(Route::SendToEmail));
        assert_eq!(gateway.token(), Some("secret"));
        assert_eq!(gateway.timeout, Duration::from_millis(2500));
        assert_eq!(gateway.retry.max_retries, 4);
    }

    #[test]
    fn test_rejects_malformed_number() {
        let result = Config::from_vars(&vars(&[("NEWSDESK_API_MAX_RETRIES", "dois")]), "x.db".to_string());

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let result = Config::from_vars(&vars(&[("NEWSDESK_API_BASE_URL", "not a url")]), "x.db".to_string());

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_memory_store_selection() {
        let config = Config::from_vars(&vars(&[("NEWSDESK_DB_PATH", ":memory:")]), "x.db".to_string()).unwrap();

        assert!(config.uses_memory_store());
    }
}
