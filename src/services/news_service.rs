use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gateway::{Gateway, GatewayError, ResponseBody, Route};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::{
    Category, ClearReport, DateCheck, DateCheckStatus, DateVerificationReport, FetchReport, Importance, News,
    NewsDraft, Record, RecordMeta, Source,
};
use crate::errors::{AppError, AppResult};
use crate::services::demo;
use crate::storage::Collection;

const TITLE_LIMIT: usize = 200;
const SUMMARY_LIMIT: usize = 800;
const CONTENT_LIMIT: usize = 4000;
const SOURCE_NAME_LIMIT: usize = 120;
const URL_LIMIT: usize = 500;
const MAX_TAGS: usize = 8;
const TAG_LIMIT: usize = 40;
const DRAFT_TITLE_LIMIT: usize = 120;
const DRAFT_SUMMARY_LIMIT: usize = 400;

/// Largest gap, in days, between creation and publication still accepted.
const DATE_TOLERANCE_DAYS: i64 = 2;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// What to pull news about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchNewsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_website: Option<String>,
}

impl FetchNewsParams {
    pub fn for_source(source: &Source, category: Category) -> Self {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
        Self {
            source_id: non_empty(source.id()),
            source_name: non_empty(source.name.as_str()),
            category,
            rss_feed_url: source.rss_url().map(str::to_string),
            topic: None,
            source_website: non_empty(source.website.as_str()),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        self.topic = (!topic.trim().is_empty()).then_some(topic);
        self
    }
}

/// Input of the news text generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateNewsParams {
    pub topic: String,
    pub source_name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_website: Option<String>,
}

/// Dedup key of a news item: its id when it has one, otherwise a hash of
/// the normalized title, publication date and source.
pub fn identity_key(news: &News) -> String {
    if !news.id().trim().is_empty() {
        return format!("id:{}", news.id());
    }
    content_key(news)
}

fn content_key(news: &News) -> String {
    let source = news
        .source_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(&news.source_name);
    let date = news.publication_date.map(|d| d.to_string()).unwrap_or_default();
    let raw = format!("{}|{}|{}", normalize_text(&news.title), date, normalize_text(source));

    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn cap(text: &str, limit: usize) -> String {
    text.trim().chars().take(limit).collect()
}

fn text_field(item: &Value, field: &str) -> String {
    match item.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn date_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap(),
            Regex::new(r"(\d{2})/(\d{2})/(\d{4})").unwrap(),
        ]
    })
}

/// Accepts RFC 3339, `YYYY-MM-DD[THH:MM:SS]` and `DD/MM/YYYY`, also when
/// embedded in surrounding text.
pub fn parse_remote_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc).date_naive());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.date());
    }

    let [iso, brazilian] = date_patterns();
    if let Some(caps) = iso.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }
    if let Some(caps) = brazilian.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }
    None
}

/// Coerces one remotely produced item into a `News`, capping text lengths.
/// Items without a usable publication date are rejected.
pub fn sanitize_remote_news(item: &Value) -> Result<News, String> {
    if !item.is_object() {
        return Err("item is not an object".to_string());
    }

    let publication_date = parse_remote_date(&text_field(item, "publication_date"))
        .ok_or_else(|| "publication date not found".to_string())?;

    let title = cap(&text_field(item, "title"), TITLE_LIMIT);
    if title.is_empty() {
        return Err("title is empty".to_string());
    }

    let tags = match item.get("tags") {
        Some(Value::Array(tags)) => tags
            .iter()
            .map(|tag| match tag {
                Value::String(s) => cap(s, TAG_LIMIT),
                other => cap(&other.to_string(), TAG_LIMIT),
            })
            .take(MAX_TAGS)
            .collect(),
        _ => Vec::new(),
    };

    let external_url = cap(&text_field(item, "external_url"), URL_LIMIT);
    let source_id = text_field(item, "source_id");
    let created_at = item
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc));

    let mut news = News::new(
        title,
        text_field(item, "category").parse().unwrap_or_default(),
        text_field(item, "importance").parse().unwrap_or(Importance::Media),
    )
    .with_summary(cap(&text_field(item, "summary"), SUMMARY_LIMIT))
    .with_content(cap(&text_field(item, "content"), CONTENT_LIMIT))
    .with_tags(tags)
    .with_source(
        cap(&text_field(item, "source_name"), SOURCE_NAME_LIMIT),
        (!source_id.trim().is_empty()).then(|| source_id.trim().to_string()),
    )
    .with_publication_date(publication_date);

    news.meta = RecordMeta {
        id: text_field(item, "id").trim().to_string(),
        created_at,
        ..RecordMeta::default()
    };
    news.external_url = (!external_url.is_empty()).then_some(external_url);
    news.is_highlighted = item.get("is_highlighted").and_then(Value::as_bool).unwrap_or(false);

    Ok(news)
}

/// Applies the house rules to a generator draft: capped text, content
/// falling back to the summary, importance taken from the analysis.
fn finish_draft(mut draft: NewsDraft) -> NewsDraft {
    draft.title = cap(&draft.title, DRAFT_TITLE_LIMIT);
    draft.summary = cap(&draft.summary, DRAFT_SUMMARY_LIMIT);
    draft.content = cap(&draft.content, CONTENT_LIMIT);
    if draft.content.is_empty() {
        draft.content = draft.summary.clone();
    }
    if let Some(analysis) = &draft.importance_analysis {
        draft.importance = analysis.importance();
    }
    draft
}

/// Items from any of the accepted fetch response shapes.
fn remote_items(body: ResponseBody) -> Vec<Value> {
    match body.into_json() {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => ["created_news", "news"]
            .iter()
            .find_map(|field| match map.remove(*field) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn classify(news: &News, now: DateTime<Utc>) -> DateCheck {
    let external_url = news.external_url.clone();
    let (Some(saved), Some(created)) = (news.publication_date, news.meta.created_date.or(news.meta.created_at)) else {
        return DateCheck {
            title: news.title.clone(),
            status: DateCheckStatus::UnableToVerify,
            saved_date: news.publication_date,
            found_date: None,
            difference_days: None,
            confidence: None,
            message: "Notícia sem data de publicação definida.".to_string(),
            external_url,
        };
    };

    let saved_at = saved.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()).unwrap_or(created);
    let difference_days = ((created - saved_at).num_minutes() as f64 / 1440.0).round() as i64;
    let in_future = saved > now.date_naive();

    if !in_future && difference_days.abs() <= DATE_TOLERANCE_DAYS {
        return DateCheck {
            title: news.title.clone(),
            status: DateCheckStatus::Correct,
            saved_date: Some(saved),
            found_date: Some(saved),
            difference_days: Some(0),
            confidence: Some("high".to_string()),
            message: "Data consistente com o registro criado.".to_string(),
            external_url,
        };
    }

    let message = if in_future {
        "Data de publicação no futuro. Revise a fonte original."
    } else {
        "Data divergente do momento de criação. Revise a fonte original."
    };

    DateCheck {
        title: news.title.clone(),
        status: DateCheckStatus::Incorrect,
        saved_date: Some(saved),
        found_date: Some(created.date_naive()),
        difference_days: Some(difference_days),
        confidence: Some("medium".to_string()),
        message: message.to_string(),
        external_url,
    }
}

/// Builds the report totals from per-item checks.
pub fn summarize_checks(results: Vec<DateCheck>) -> DateVerificationReport {
    let count = |status: DateCheckStatus| results.iter().filter(|r| r.status == status).count();
    let correct_dates = count(DateCheckStatus::Correct);
    let incorrect_dates = count(DateCheckStatus::Incorrect);
    let unable_to_verify = count(DateCheckStatus::UnableToVerify);
    let total_verified = results.len();

    let accuracy_percentage = if total_verified == 0 {
        100
    } else {
        ((correct_dates as f64 / total_verified as f64) * 100.0).round() as u32
    };

    let recommendation = if incorrect_dates == 0 {
        "Nenhuma divergência identificada. Continue monitorando periodicamente."
    } else {
        "Existe(m) divergência(s) entre a data salva e a encontrada. Valide as notícias sinalizadas e ajuste a \
         fonte, se necessário."
    };

    DateVerificationReport {
        total_verified,
        correct_dates,
        incorrect_dates,
        unable_to_verify,
        accuracy_percentage,
        recommendation: recommendation.to_string(),
        results,
    }
}

/// News pulls, reconciliation, date checks and bulk clean-up.
pub struct NewsService {
    gateway: Arc<Gateway>,
    news: Collection<News>,
}

impl NewsService {
    pub fn new(gateway: Arc<Gateway>, news: Collection<News>) -> Self {
        Self { gateway, news }
    }

    /// Pulls news for a source. Uses the backend when its route is
    /// configured, falling back to one demo item when it is not or when the
    /// call fails.
    pub async fn fetch_real_news(&self, params: &FetchNewsParams) -> AppResult<FetchReport> {
        if self.gateway.is_route_configured(Route::FetchRealNews) {
            match self.fetch_remote(params).await {
                Ok(report) => return Ok(report),
                Err(AppError::Remote(error)) if !error.is_cancelled() => {
                    warn!(error = %error, "remote news fetch failed, using demo news");
                }
                Err(error) => return Err(error),
            }
        }

        let news = self
            .news
            .create(demo::demo_news(params, Utc::now().date_naive()))
            .await?;
        info!(id = news.id(), "created demo news");

        Ok(FetchReport {
            success: true,
            created_count: 1,
            created_news: vec![news],
            demo: true,
            ..FetchReport::default()
        })
    }

    async fn fetch_remote(&self, params: &FetchNewsParams) -> AppResult<FetchReport> {
        let body = self.gateway.post(Route::FetchRealNews, params).await?;

        let mut accepted = Vec::new();
        let mut rejected_count = 0;
        for item in remote_items(body) {
            match sanitize_remote_news(&item) {
                Ok(news) => accepted.push(news),
                Err(reason) => {
                    rejected_count += 1;
                    warn!(reason = %reason, "rejected remote news item");
                }
            }
        }

        let mut report = self.reconcile(accepted).await?;
        report.rejected_count = rejected_count;
        info!(
            created = report.created_count,
            updated = report.updated_count,
            skipped = report.skipped_count,
            rejected = report.rejected_count,
            "reconciled remote news"
        );
        Ok(report)
    }

    /// Merges `items` into the local collection. Items whose id is already
    /// stored update that record; items without an id that match stored
    /// content are skipped; everything else is inserted. Running the same
    /// batch twice changes nothing the second time.
    pub async fn reconcile(&self, items: Vec<News>) -> AppResult<FetchReport> {
        let existing = self.news.list(None, None).await?;
        let mut stored: HashMap<String, News> = existing
            .iter()
            .map(|news| (identity_key(news), news.clone()))
            .collect();
        let mut seen_content: HashSet<String> = existing.iter().map(content_key).collect();

        let mut report = FetchReport {
            success: true,
            ..FetchReport::default()
        };

        for mut item in items {
            // Compare in stored form: tags deduplicated, blank urls dropped.
            item.normalize();
            let key = identity_key(&item);
            let content = content_key(&item);

            if let Some(current) = stored.get(&key) {
                if same_content(current, &item) {
                    report.skipped_count += 1;
                    continue;
                }
                let updated = self
                    .news
                    .update_with(current.id(), |record| {
                        let meta = record.meta.clone();
                        *record = item.clone();
                        record.meta = meta;
                    })
                    .await?;
                stored.insert(key, updated);
                report.updated_count += 1;
                continue;
            }

            if seen_content.contains(&content) {
                report.skipped_count += 1;
                continue;
            }

            let created = self.news.create(item).await?;
            seen_content.insert(content);
            stored.insert(identity_key(&created), created.clone());
            report.created_count += 1;
            report.created_news.push(created);
        }

        Ok(report)
    }

    /// Checks a random sample of the newest news for implausible
    /// publication dates.
    pub async fn verify_news_dates(&self, sample_size: usize) -> AppResult<DateVerificationReport> {
        if self.gateway.is_route_configured(Route::VerifyNewsDates) {
            match self.verify_remote(sample_size).await {
                Ok(report) => return Ok(report),
                Err(AppError::Remote(error)) if !error.is_cancelled() => {
                    warn!(error = %error, "remote date verification failed, checking locally");
                }
                Err(error) => return Err(error),
            }
        }

        let newest = self.news.list(Some("-created_at"), None).await?;
        let now = Utc::now();
        let results = demo::sample(newest, sample_size)
            .iter()
            .map(|news| classify(news, now))
            .collect();

        Ok(summarize_checks(results))
    }

    async fn verify_remote(&self, sample_size: usize) -> AppResult<DateVerificationReport> {
        let body = self
            .gateway
            .post(Route::VerifyNewsDates, &json!({ "sample_size": sample_size }))
            .await?;

        let Some(Value::Object(mut map)) = body.into_json() else {
            return Ok(summarize_checks(Vec::new()));
        };

        // Older backends nest the recommendation under `summary`.
        if !map.contains_key("recommendation") {
            if let Some(recommendation) = map.get("summary").and_then(|s| s.get("recommendation")).cloned() {
                map.insert("recommendation".to_string(), recommendation);
            }
        }

        serde_json::from_value(Value::Object(map)).map_err(|e| {
            AppError::Remote(GatewayError::Decode {
                url: self.gateway.config().url_for(Route::VerifyNewsDates).unwrap_or_default(),
                message: format!("unreadable date verification report: {}", e),
            })
        })
    }

    /// Removes every news item, on the backend too when configured.
    pub async fn clear_all_news(&self) -> AppResult<ClearReport> {
        let remote_count = if self.gateway.is_route_configured(Route::ClearAllNews) {
            let body = self.gateway.post(Route::ClearAllNews, &json!({})).await?;
            body.into_json()
                .and_then(|json| json.get("deleted_count").and_then(Value::as_u64))
                .map(|count| count as usize)
        } else {
            None
        };

        let local_count = self.news.count().await?;
        self.news.clear().await?;

        let deleted_count = remote_count.unwrap_or(local_count);
        info!(deleted_count, "cleared news");

        Ok(ClearReport {
            success: true,
            deleted_count,
            message: format!("{} notícia(s) removidas do armazenamento local.", deleted_count),
        })
    }

    /// Drafts a news text about a topic without storing it.
    pub async fn generate_news(&self, params: &GenerateNewsParams) -> AppResult<NewsDraft> {
        if self.gateway.is_route_configured(Route::GenerateNews) {
            match self.gateway.call::<_, NewsDraft>(Route::GenerateNews, params).await {
                Ok(Some(draft)) => return Ok(finish_draft(draft)),
                Ok(None) => warn!("news generator returned no content, drafting locally"),
                Err(error) if !error.is_cancelled() => {
                    warn!(error = %error, "news generation failed, drafting locally");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(demo::local_draft(params, Utc::now().date_naive()))
    }
}

fn same_content(current: &News, incoming: &News) -> bool {
    current.title == incoming.title
        && current.summary == incoming.summary
        && current.content == incoming.content
        && current.category == incoming.category
        && current.importance == incoming.importance
        && current.tags == incoming.tags
        && current.source_name == incoming.source_name
        && current.source_id == incoming.source_id
        && current.publication_date == incoming.publication_date
        && current.external_url == incoming.external_url
        && current.is_highlighted == incoming.is_highlighted
}
