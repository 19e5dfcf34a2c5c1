use std::sync::Arc;
use std::time::Duration;

use crate::domain::{EmailConfig, News, Source, TeamsConfig, TelegramConfig, WhatsAppConfig};
use crate::errors::AppResult;
use crate::storage::blob::BlobStore;
use crate::storage::memory::MemoryBackend;
use crate::storage::repository::Collection;
use crate::storage::sqlite::{SqliteBackend, SqliteStorage};

/// Every collection of the application over one blob store.
#[derive(Clone)]
pub struct Database {
    pub news: Collection<News>,
    pub sources: Collection<Source>,
    pub telegram_configs: Collection<TelegramConfig>,
    pub whatsapp_configs: Collection<WhatsAppConfig>,
    pub teams_configs: Collection<TeamsConfig>,
    pub email_configs: Collection<EmailConfig>,
}

impl Database {
    pub fn new(store: BlobStore, latency: Duration) -> Self {
        Self {
            news: Collection::new(store.clone()).with_latency(latency),
            sources: Collection::new(store.clone()).with_latency(latency),
            telegram_configs: Collection::new(store.clone()).with_latency(latency),
            whatsapp_configs: Collection::new(store.clone()).with_latency(latency),
            teams_configs: Collection::new(store.clone()).with_latency(latency),
            email_configs: Collection::new(store).with_latency(latency),
        }
    }

    /// Volatile database, used by tests and `NEWSDESK_DB_PATH=:memory:`.
    pub fn in_memory(latency: Duration) -> Self {
        Self::new(BlobStore::new(Arc::new(MemoryBackend::new())), latency)
    }

    /// Database persisted in a SQLite file at `path`.
    pub fn open(path: &str, latency: Duration) -> AppResult<Self> {
        let storage = SqliteStorage::new(path)?;
        Ok(Self::new(BlobStore::new(Arc::new(SqliteBackend::new(storage))), latency))
    }

    /// Drops every stored collection; defaults come back on next access.
    pub fn wipe(&self) -> AppResult<()> {
        self.news.forget()?;
        self.sources.forget()?;
        self.telegram_configs.forget()?;
        self.whatsapp_configs.forget()?;
        self.teams_configs.forget()?;
        self.email_configs.forget()
    }
}
