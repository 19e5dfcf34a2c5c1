use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::retry::RateLimiter;
use crate::route::Route;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Per-call knobs. Anything left unset falls back to the gateway config.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub cancel: Option<CancellationToken>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::POST,
            body: None,
            headers: Vec::new(),
            cancel: None,
            timeout: None,
            retries: None,
        }
    }
}

impl RequestOptions {
    pub fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 204/205 or an empty body.
    Empty,
    Json(Value),
    /// Body that was not valid JSON, returned verbatim.
    Text(String),
}

impl ResponseBody {
    fn from_response(response: HttpResponse) -> Self {
        if matches!(response.status, 204 | 205) || response.body.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(&response.body) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(response.body),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// JSON-over-HTTP client for the configured backend routes.
pub struct Gateway {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    limiter: Option<RateLimiter>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let limiter = (!config.min_interval.is_zero()).then(|| RateLimiter::new(config.min_interval));
        Self {
            config,
            transport,
            limiter,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn is_route_configured(&self, route: Route) -> bool {
        self.config.is_route_configured(route)
    }

    fn url_for(&self, route: Route) -> Result<String, GatewayError> {
        self.config.url_for(route).ok_or_else(|| {
            let reason = if self.config.base_url().is_none() {
                "base URL is not set".to_string()
            } else {
                "route path is empty".to_string()
            };
            GatewayError::Configuration { route, reason }
        })
    }

    fn build_request(&self, url: &str, options: &RequestOptions) -> Result<HttpRequest, GatewayError> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(options.headers.iter().cloned());
        if let Some(token) = self.config.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let body = match &options.body {
            Some(body) => Some(serde_json::to_string(body)?),
            None => None,
        };

        Ok(HttpRequest {
            method: options.method.clone(),
            url: url.to_string(),
            headers,
            body,
        })
    }

    /// Sends `options.body` to `route`, retrying retryable failures with
    /// exponential backoff. Configuration errors and cancellation are never
    /// retried.
    #[instrument(skip_all, fields(route = %route))]
    pub async fn request(&self, route: Route, options: RequestOptions) -> Result<ResponseBody, GatewayError> {
        let url = self.url_for(route)?;
        let request = self.build_request(&url, &options)?;
        let retries = options.retries.unwrap_or(self.config.retry.max_retries);
        let timeout = options.timeout.unwrap_or(self.config.timeout);

        let mut attempt = 0u32;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            debug!(attempt, %url, "sending request");
            let error = match self
                .attempt(request.clone(), timeout, options.cancel.as_ref())
                .await
            {
                Ok(response) => {
                    debug!(attempt, status = response.status, "request succeeded");
                    return Ok(ResponseBody::from_response(response));
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= retries {
                if attempt > 0 {
                    warn!(attempts = attempt + 1, error = %error, "giving up");
                }
                return Err(error);
            }

            let delay = self.config.retry.delay_for(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying");
            self.backoff(delay, options.cancel.as_ref(), &url).await?;
            attempt += 1;
        }
    }

    /// POSTs `body` as JSON with default options.
    pub async fn post<B: Serialize>(&self, route: Route, body: &B) -> Result<ResponseBody, GatewayError> {
        let body = serde_json::to_value(body)?;
        self.request(route, RequestOptions::json(body)).await
    }

    /// POSTs `body` and decodes a JSON response into `R`. Empty responses
    /// yield `None`.
    pub async fn call<B, R>(&self, route: Route, body: &B) -> Result<Option<R>, GatewayError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        match self.post(route, body).await? {
            ResponseBody::Empty => Ok(None),
            ResponseBody::Json(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                GatewayError::Decode {
                    url: self.config.url_for(route).unwrap_or_default(),
                    message: e.to_string(),
                }
            }),
            ResponseBody::Text(text) => Err(GatewayError::Decode {
                url: self.config.url_for(route).unwrap_or_default(),
                message: format!("expected JSON, got {:?}", truncate(&text, 120)),
            }),
        }
    }

    async fn attempt(
        &self,
        request: HttpRequest,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<HttpResponse, GatewayError> {
        let url = request.url.clone();
        let cancelled = wait_cancelled(cancel);

        let response = tokio::select! {
            biased;
            _ = cancelled => return Err(GatewayError::Cancelled { url }),
            _ = tokio::time::sleep(timeout) => {
                return Err(GatewayError::Timeout { url, after: timeout });
            }
            result = self.transport.send(request) => result?,
        };

        if response.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Http {
                url,
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            })
        }
    }

    async fn backoff(
        &self,
        delay: Duration,
        cancel: Option<&CancellationToken>,
        url: &str,
    ) -> Result<(), GatewayError> {
        tokio::select! {
            biased;
            _ = wait_cancelled(cancel) => Err(GatewayError::Cancelled { url: url.to_string() }),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

async fn wait_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{FixedJitter, RetryPolicy};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays canned responses and records when each call happened.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<HttpResponse, GatewayError>>>,
        calls: Mutex<Vec<(Instant, HttpRequest)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<HttpResponse, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GatewayError> {
            self.calls.lock().unwrap().push((Instant::now(), request));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(ok(200, "{}")))
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, GatewayError> {
            std::future::pending().await
        }
    }

    fn ok(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: String::new(),
            body: body.to_string(),
        }
    }

    fn configured(retries: u32, base_ms: u64) -> GatewayConfig {
        GatewayConfig::new()
            .with_base_url("http://api.test")
            .with_token("secret")
            .with_timeout(Duration::from_millis(1_000))
            .with_retry(
                RetryPolicy::new(retries, Duration::from_millis(base_ms))
                    .with_jitter(FixedJitter(Duration::from_millis(7))),
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_503_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Ok(ok(503, "busy")),
            Ok(ok(503, "busy")),
            Ok(ok(200, r#"{"success":true}"#)),
        ]);
        let gateway = Gateway::with_transport(configured(3, 100), transport.clone());

        let body = gateway
            .request(Route::FetchRealNews, RequestOptions::json(serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(body, ResponseBody::Json(serde_json::json!({"success": true})));
        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_millis(100));
        assert!(times[2] - times[1] >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_http_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(ok(500, "first")),
            Ok(ok(502, "second")),
            Ok(ok(504, "last")),
        ]);
        let gateway = Gateway::with_transport(configured(2, 10), transport.clone());

        let err = gateway
            .request(Route::ClearAllNews, RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(504));
        assert!(err.to_string().contains("last"));
        assert_eq!(transport.call_times().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        let transport = ScriptedTransport::new(vec![Ok(ok(400, "bad payload"))]);
        let gateway = Gateway::with_transport(configured(5, 10), transport.clone());

        let err = gateway
            .request(Route::SendToEmail, RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(transport.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(GatewayError::Network {
                url: "http://api.test".to_string(),
                message: "connection reset".to_string(),
            }),
            Ok(ok(204, "")),
        ]);
        let gateway = Gateway::with_transport(configured(1, 10), transport.clone());

        let body = gateway
            .request(Route::ResetSources, RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(body, ResponseBody::Empty);
        assert_eq!(transport.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_transport_times_out() {
        let gateway = Gateway::with_transport(
            configured(0, 10).with_timeout(Duration::from_millis(250)),
            Arc::new(HangingTransport),
        );
        let start = Instant::now();

        let err = gateway
            .request(Route::VerifyNewsDates, RequestOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() <= Duration::from_millis(260));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_overrides_config() {
        let gateway = Gateway::with_transport(configured(0, 10), Arc::new(HangingTransport));
        let start = Instant::now();

        let err = gateway
            .request(
                Route::GenerateNews,
                RequestOptions::default().with_timeout(Duration::from_millis(40)),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancel_is_not_a_timeout() {
        let gateway = Gateway::with_transport(configured(3, 10), Arc::new(HangingTransport));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = gateway
            .request(Route::SendToTelegram, RequestOptions::default().with_cancel(token))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_unconfigured_route_fails_without_calling_transport() {
        let transport = ScriptedTransport::new(vec![]);
        let gateway = Gateway::with_transport(GatewayConfig::new(), transport.clone());

        let err = gateway
            .request(Route::FetchRealNews, RequestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Configuration { .. }));
        assert!(transport.call_times().is_empty());
    }

    #[tokio::test]
    async fn test_headers_include_json_and_bearer_token() {
        let transport = ScriptedTransport::new(vec![Ok(ok(200, "ok"))]);
        let gateway = Gateway::with_transport(configured(0, 10), transport.clone());

        let body = gateway
            .request(
                Route::SendToWhatsApp,
                RequestOptions::json(serde_json::json!({"a": 1})).with_header("X-Trace", "abc"),
            )
            .await
            .unwrap();

        assert_eq!(body, ResponseBody::Text("ok".to_string()));
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "http://api.test/integrations/whatsapp/send-test");
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
        assert!(request
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer secret".to_string())));
        assert!(request
            .headers
            .contains(&("X-Trace".to_string(), "abc".to_string())));
    }

    #[tokio::test]
    async fn test_call_decodes_typed_response() {
        #[derive(serde::Deserialize)]
        struct Ack {
            success: bool,
        }

        let transport = ScriptedTransport::new(vec![Ok(ok(200, r#"{"success":true}"#))]);
        let gateway = Gateway::with_transport(configured(0, 10), transport);

        let ack: Option<Ack> = gateway
            .call(Route::SendToTeams, &serde_json::json!({}))
            .await
            .unwrap();

        assert!(ack.unwrap().success);
    }
}
