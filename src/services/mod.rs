pub mod demo;
pub mod dispatch_service;
pub mod news_service;
pub mod source_service;

pub use dispatch_service::{DispatchOutcome, DispatchService};
pub use news_service::{
    identity_key, parse_remote_date, sanitize_remote_news, FetchNewsParams, GenerateNewsParams, NewsService,
    DEFAULT_SAMPLE_SIZE,
};
pub use source_service::SourceService;
