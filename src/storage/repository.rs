use std::marker::PhantomData;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::domain::Record;
use crate::errors::{AppError, AppResult};
use crate::storage::blob::BlobStore;
use crate::storage::query::{sort_records, Criteria, QueryOptions};

/// Delay added to every operation except `count`, mimicking a remote store.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(120);

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `<prefix>_<6 random base36 chars><base36 epoch millis>`.
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let random: String = (0..6)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    format!("{}_{}{}", prefix, random, to_base36(millis))
}

/// CRUD and query access to one typed collection.
///
/// Every operation reloads the whole collection from the blob store and,
/// when it changes anything, writes the whole collection back. Two
/// concurrent writers on the same collection can therefore lose an update.
pub struct Collection<T: Record> {
    store: BlobStore,
    key: String,
    latency: Duration,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            latency: self.latency,
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: BlobStore) -> Self {
        let key = store.key_for(T::COLLECTION);
        Self {
            store,
            key,
            latency: DEFAULT_LATENCY,
            _record: PhantomData,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> AppResult<Vec<T>> {
        self.store.read(&self.key, &T::defaults())
    }

    fn persist(&self, records: &[T]) -> AppResult<()> {
        self.store.write(&self.key, records)
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// All records sorted by `order` (default order when `None`), truncated to `limit`.
    pub async fn list(&self, order: Option<&str>, limit: Option<usize>) -> AppResult<Vec<T>> {
        let mut records = sort_records(self.load()?, order, T::DEFAULT_ORDER)?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        self.settle().await;
        Ok(records)
    }

    /// Records matching every clause of `criteria`, then sorted and truncated.
    pub async fn filter(&self, criteria: &Criteria, options: &QueryOptions) -> AppResult<Vec<T>> {
        let mut matching = Vec::new();
        for record in self.load()? {
            let json = serde_json::to_value(&record)?;
            if criteria.matches(&json) {
                matching.push(record);
            }
        }

        let mut records = sort_records(matching, options.order.as_deref(), T::DEFAULT_ORDER)?;
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }
        self.settle().await;
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<T>> {
        let record = self.load()?.into_iter().find(|r| r.id() == id);
        self.settle().await;
        Ok(record)
    }

    /// Appends a record. A blank id is replaced by a generated one; an id
    /// already present in the collection is rejected.
    pub async fn create(&self, mut record: T) -> AppResult<T> {
        let mut records = self.load()?;

        if record.id().trim().is_empty() {
            record.meta_mut().id = generate_id(T::COLLECTION);
        } else if records.iter().any(|r| r.id() == record.id()) {
            return Err(AppError::InvalidInput(format!(
                "{} already has a record with id {}",
                T::COLLECTION,
                record.id()
            )));
        }

        record.meta_mut().touch(Utc::now());
        record.normalize();

        records.push(record.clone());
        self.persist(&records)?;
        debug!(collection = T::COLLECTION, id = record.id(), "created record");

        self.settle().await;
        Ok(record)
    }

    /// Merges `changes` (a JSON object of field values) into the record.
    ///
    /// Unknown fields are rejected, `id` is ignored, and the merged value
    /// must still deserialize as `T`.
    pub async fn update(&self, id: &str, changes: Value) -> AppResult<T> {
        let Value::Object(changes) = changes else {
            return Err(AppError::InvalidInput(format!(
                "changes for {} must be a JSON object",
                T::COLLECTION
            )));
        };

        let mut records = self.load()?;
        let index = self.position(&records, id)?;

        let mut merged = match serde_json::to_value(&records[index])? {
            Value::Object(fields) => fields,
            _ => {
                return Err(AppError::InvalidRecord {
                    collection: T::COLLECTION,
                    message: "record does not serialize to an object".to_string(),
                })
            }
        };

        for (field, value) in changes {
            if field == "id" {
                continue;
            }
            if !merged.contains_key(&field) {
                return Err(AppError::InvalidInput(format!(
                    "{} has no field named {}",
                    T::COLLECTION,
                    field
                )));
            }
            merged.insert(field, value);
        }

        let updated: T = serde_json::from_value(Value::Object(merged)).map_err(|e| AppError::InvalidRecord {
            collection: T::COLLECTION,
            message: e.to_string(),
        })?;

        let updated = self.replace_at(records.as_mut_slice(), index, updated);
        self.persist(&records)?;
        debug!(collection = T::COLLECTION, id, "updated record");

        self.settle().await;
        Ok(updated)
    }

    /// Typed variant of [`Collection::update`].
    pub async fn update_with<F>(&self, id: &str, edit: F) -> AppResult<T>
    where
        F: FnOnce(&mut T),
    {
        let mut records = self.load()?;
        let index = self.position(&records, id)?;

        let mut updated = records[index].clone();
        edit(&mut updated);

        let updated = self.replace_at(records.as_mut_slice(), index, updated);
        self.persist(&records)?;
        debug!(collection = T::COLLECTION, id, "updated record");

        self.settle().await;
        Ok(updated)
    }

    /// Removes the record; `false` when no record had that id.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut records = self.load()?;
        let Some(index) = records.iter().position(|r| r.id() == id) else {
            return Ok(false);
        };

        records.remove(index);
        self.persist(&records)?;
        debug!(collection = T::COLLECTION, id, "deleted record");

        self.settle().await;
        Ok(true)
    }

    /// Empties the collection. The empty state is stored, so defaults are
    /// not reseeded on the next read.
    pub async fn clear(&self) -> AppResult<()> {
        self.persist(&[])?;
        self.settle().await;
        Ok(())
    }

    /// Restores the built-in dataset and returns it in default order.
    pub async fn reset(&self) -> AppResult<Vec<T>> {
        self.persist(&T::defaults())?;
        self.settle().await;
        self.list(None, None).await
    }

    pub async fn count(&self) -> AppResult<usize> {
        Ok(self.load()?.len())
    }

    /// Stores `records` as the whole collection, after normalizing them.
    pub async fn replace_all(&self, records: Vec<T>) -> AppResult<Vec<T>> {
        let now = Utc::now();
        let records: Vec<T> = records
            .into_iter()
            .map(|mut record| {
                if record.id().trim().is_empty() {
                    record.meta_mut().id = generate_id(T::COLLECTION);
                }
                record.meta_mut().touch(now);
                record.normalize();
                record
            })
            .collect();

        self.persist(&records)?;
        self.settle().await;
        Ok(records)
    }

    /// Drops the stored value entirely; the next read reseeds defaults.
    pub fn forget(&self) -> AppResult<()> {
        self.store.clear(&self.key)
    }

    fn position(&self, records: &[T], id: &str) -> AppResult<usize> {
        records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| AppError::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            })
    }

    fn replace_at(&self, records: &mut [T], index: usize, mut updated: T) -> T {
        updated.meta_mut().id = records[index].id().to_string();
        updated.meta_mut().touch(Utc::now());
        updated.normalize();

        records[index] = updated.clone();
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Importance, News, RecordMeta, Source};
    use chrono::NaiveDate;
    use serde_json::json;

    fn setup_news() -> Collection<News> {
        Collection::new(BlobStore::in_memory()).with_latency(Duration::ZERO)
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("news");
        let suffix = id.strip_prefix("news_").unwrap();

        assert!(suffix.len() > 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_id("news"), generate_id("news"));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[tokio::test]
    async fn test_empty_store_seeds_defaults() {
        let news = setup_news();

        assert_eq!(news.count().await.unwrap(), News::defaults().len());
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let news = setup_news();

        let created = news
            .create(News::new("Prazo do IRPF", Category::Fiscal, Importance::Alta))
            .await
            .unwrap();

        assert!(created.id().starts_with("news_"));
        assert!(created.meta.created_at.is_some());
        assert_eq!(created.meta.created_date, created.meta.created_at);
        assert_eq!(created.publication_date, created.meta.created_at.map(|at| at.date_naive()));

        let fetched = news.get(created.id()).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let news = setup_news();
        let mut duplicate = News::new("x", Category::Contabil, Importance::Baixa);
        duplicate.meta.id = "news_esocial".to_string();

        let result = news.create(duplicate).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let news = setup_news();
        let created = news
            .create(News::new("Mais recente", Category::Contabil, Importance::Media))
            .await
            .unwrap();

        let listed = news.list(Some("-created_at"), Some(2)).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id(), created.id());
        assert_eq!(listed[1].id(), "news_local_launch");
    }

    #[tokio::test]
    async fn test_list_ascending_by_publication_date() {
        let news = setup_news();

        let listed = news.list(Some("publication_date"), None).await.unwrap();

        assert_eq!(listed[0].id(), "news_esocial");
        assert_eq!(listed[2].id(), "news_local_launch");
    }

    #[tokio::test]
    async fn test_filter_by_category() {
        let news = setup_news();
        news.create(
            News::new("Nova obrigação fiscal", Category::Fiscal, Importance::Alta)
                .with_publication_date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
        )
        .await
        .unwrap();

        let fiscal = news
            .filter(&Criteria::new().eq("category", Category::Fiscal), &QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(fiscal.len(), 1);
        assert_eq!(fiscal[0].title, "Nova obrigação fiscal");
    }

    #[tokio::test]
    async fn test_filter_sorts_matches_before_limit() {
        let news = setup_news();
        let dated = |title: &str, category: Category, (y, m, d): (i32, u32, u32), created: &str| {
            let mut item = News::new(title, category, Importance::Media)
                .with_publication_date(NaiveDate::from_ymd_opt(y, m, d).unwrap());
            item.meta = RecordMeta::seeded("", created);
            item
        };
        news.create(dated("Fiscal dezembro", Category::Fiscal, (2024, 12, 20), "2025-03-01"))
            .await
            .unwrap();
        news.create(dated("Fiscal fevereiro", Category::Fiscal, (2025, 2, 1), "2025-03-03"))
            .await
            .unwrap();
        news.create(dated("Tributária abril", Category::Tributaria, (2025, 4, 1), "2025-03-04"))
            .await
            .unwrap();
        news.create(dated("Fiscal março", Category::Fiscal, (2025, 3, 15), "2025-03-02"))
            .await
            .unwrap();
        let fiscal = Criteria::new().eq("category", Category::Fiscal);
        let titles = |items: Vec<News>| items.into_iter().map(|n| n.title).collect::<Vec<_>>();

        let by_date = news
            .filter(&fiscal, &QueryOptions::new().order("-publication_date"))
            .await
            .unwrap();
        let by_creation = news
            .filter(&fiscal, &QueryOptions::new().order("created_at"))
            .await
            .unwrap();
        let newest_two = news
            .filter(&fiscal, &QueryOptions::new().order("-publication_date").limit(2))
            .await
            .unwrap();

        assert_eq!(titles(by_date), vec!["Fiscal março", "Fiscal fevereiro", "Fiscal dezembro"]);
        assert_eq!(titles(by_creation), vec!["Fiscal dezembro", "Fiscal março", "Fiscal fevereiro"]);
        assert_eq!(titles(newest_two), vec!["Fiscal março", "Fiscal fevereiro"]);
    }

    #[tokio::test]
    async fn test_filter_with_null_criterion_is_unconstrained() {
        let news = setup_news();

        let all = news
            .filter(
                &Criteria::new().maybe_eq::<Category>("category", None).eq("source_id", serde_json::Value::Null),
                &QueryOptions::new().limit(10),
            )
            .await
            .unwrap();

        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_filter_contains_and_order() {
        let news = setup_news();

        let found = news
            .filter(
                &Criteria::new().contains("tags", "PERSE"),
                &QueryOptions::new().order("title"),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "news_perse_2025");
    }

    #[tokio::test]
    async fn test_update_merges_and_touches() {
        let news = setup_news();

        let updated = news
            .update("news_esocial", json!({"importance": "alta", "id": "ignored"}))
            .await
            .unwrap();

        assert_eq!(updated.id(), "news_esocial");
        assert_eq!(updated.importance, Importance::Alta);
        assert!(updated.meta.updated_at > updated.meta.created_at);

        let stored = news.get("news_esocial").await.unwrap().unwrap();
        assert_eq!(stored.importance, Importance::Alta);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let news = setup_news();

        let result = news.update("nope", json!({"title": "x"})).await;

        assert!(matches!(result, Err(AppError::NotFound { collection: "news", .. })));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_field() {
        let news = setup_news();

        let result = news.update("news_esocial", json!({"headline": "x"})).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_value() {
        let news = setup_news();

        let result = news.update("news_esocial", json!({"importance": "urgente"})).await;

        assert!(matches!(result, Err(AppError::InvalidRecord { .. })));
    }

    #[tokio::test]
    async fn test_update_with_closure() {
        let sources: Collection<Source> = Collection::new(BlobStore::in_memory()).with_latency(Duration::ZERO);

        let updated = sources
            .update_with("source_forum", |source| source.is_active = true)
            .await
            .unwrap();

        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let news = setup_news();

        assert!(news.delete("news_esocial").await.unwrap());
        assert!(!news.delete("news_esocial").await.unwrap());
        assert_eq!(news.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_does_not_reseed() {
        let news = setup_news();

        news.clear().await.unwrap();

        assert_eq!(news.count().await.unwrap(), 0);
        assert!(news.list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let news = setup_news();
        news.clear().await.unwrap();

        let restored = news.reset().await.unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored[0].id(), "news_local_launch");
    }

    #[tokio::test]
    async fn test_forget_reseeds_on_next_read() {
        let news = setup_news();
        news.clear().await.unwrap();

        news.forget().unwrap();

        assert_eq!(news.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_returned_records_are_copies() {
        let news = setup_news();

        let mut listed = news.list(None, None).await.unwrap();
        listed[0].title = "alterado".to_string();

        let again = news.list(None, None).await.unwrap();
        assert_ne!(again[0].title, "alterado");
    }

    #[tokio::test]
    async fn test_replace_all_normalizes() {
        let news = setup_news();
        let item = News::new("Importada", Category::Ifrs, Importance::Baixa).with_tags(["ifrs", "ifrs", " "]);

        let stored = news.replace_all(vec![item]).await.unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tags, vec!["ifrs"]);
        assert_eq!(news.count().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_wait_for_latency() {
        let news: Collection<News> = Collection::new(BlobStore::in_memory());
        let started = tokio::time::Instant::now();

        news.list(None, None).await.unwrap();

        assert!(started.elapsed() >= DEFAULT_LATENCY);
    }
}
