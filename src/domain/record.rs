use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bookkeeping fields shared by every stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Alias of `created_at`, kept for consumers that read the older name.
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Meta for built-in records: all timestamps at 09:00 UTC on `date`.
    pub fn seeded(id: &str, date: &str) -> Self {
        let at = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .map(|naive| naive.and_utc());

        Self {
            id: id.to_string(),
            created_at: at,
            created_date: at,
            updated_at: at,
        }
    }

    /// Stamps timestamps for a write: `created_at` is kept when already set,
    /// `created_date` mirrors it, `updated_at` is always `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let created = *self.created_at.get_or_insert(now);
        self.created_date = Some(created);
        self.updated_at = Some(now);
    }
}

/// A typed record persisted in its own collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name. Also the storage key suffix and the generated id prefix.
    const COLLECTION: &'static str;

    /// Sort applied when a query does not name one.
    const DEFAULT_ORDER: &'static str = "-created_at";

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Collection-specific clean-up applied on every create and update.
    fn normalize(&mut self) {}

    /// Built-in dataset used to seed an empty store and by `reset`.
    fn defaults() -> Vec<Self>;

    fn id(&self) -> &str {
        &self.meta().id
    }
}

/// Trims each entry, drops blanks and duplicates, keeps first-seen order.
pub fn dedup_strings(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain_mut(|value| {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
        !value.is_empty() && seen.insert(value.clone())
    });
}
