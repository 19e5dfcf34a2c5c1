use std::collections::BTreeMap;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::route::Route;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the gateway sends requests and how hard it tries.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    base_url: Option<String>,
    token: Option<String>,
    routes: BTreeMap<Route, String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub min_interval: Duration,
}

impl GatewayConfig {
    /// Every route mapped to its default path, no base URL.
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            routes: Route::ALL
                .iter()
                .map(|route| (*route, route.default_path().to_string()))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            min_interval: Duration::ZERO,
        }
    }

    /// Sets the base URL. Blank values disable every route; a trailing slash
    /// is dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        self.base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then(|| token.trim().to_string());
        self
    }

    /// Overrides a route's path. An empty path leaves the route unconfigured.
    pub fn with_route(mut self, route: Route, path: impl Into<String>) -> Self {
        self.routes.insert(route, path.into().trim().to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn path(&self, route: Route) -> Option<&str> {
        self.routes
            .get(&route)
            .map(String::as_str)
            .filter(|path| !path.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn is_route_configured(&self, route: Route) -> bool {
        self.is_configured() && self.path(route).is_some()
    }

    /// Base URL followed by the route path, or `None` when either is missing.
    pub fn url_for(&self, route: Route) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let path = self.path(route)?;
        if path.starts_with('/') {
            Some(format!("{}{}", base, path))
        } else {
            Some(format!("{}/{}", base, path))
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_base_url_means_nothing_configured() {
        let config = GatewayConfig::new();
        assert!(!config.is_configured());
        for route in Route::ALL {
            assert!(!config.is_route_configured(route));
            assert!(config.url_for(route).is_none());
        }
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let config = GatewayConfig::new().with_base_url("https://api.example.com/v1/");
        assert_eq!(
            config.url_for(Route::ClearAllNews).unwrap(),
            "https://api.example.com/v1/news/clear"
        );
    }

    #[test]
    fn test_empty_override_disables_route() {
        let config = GatewayConfig::new()
            .with_base_url("https://api.example.com")
            .with_route(Route::SendToTeams, "");

        assert!(config.is_route_configured(Route::SendToEmail));
        assert!(!config.is_route_configured(Route::SendToTeams));
    }

    #[test]
    fn test_override_without_leading_slash() {
        let config = GatewayConfig::new()
            .with_base_url("https://api.example.com")
            .with_route(Route::ResetSources, "catalog/reset");

        assert_eq!(
            config.url_for(Route::ResetSources).unwrap(),
            "https://api.example.com/catalog/reset"
        );
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let config = GatewayConfig::new().with_token("   ");
        assert!(config.token().is_none());
    }
}
