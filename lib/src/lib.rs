//! Remote gateway for the newsdesk backend.
//!
//! Maps logical routes onto a single base URL and performs JSON POSTs with a
//! per-call timeout, optional external cancellation, and retry with
//! exponential backoff plus jitter for transient failures.

mod client;
mod config;
mod error;
mod retry;
mod route;
mod transport;

pub use client::{Gateway, RequestOptions, ResponseBody};
pub use config::{GatewayConfig, DEFAULT_TIMEOUT};
pub use error::{GatewayError, RETRYABLE_STATUSES};
pub use retry::{FixedJitter, JitterSource, RandomJitter, RateLimiter, RetryPolicy};
pub use route::Route;
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
