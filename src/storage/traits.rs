use crate::errors::AppResult;

/// Raw string storage keyed by collection key. Implementations must be
/// shareable across tasks.
#[cfg_attr(test, mockall::automock)]
pub trait BlobBackend: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}
