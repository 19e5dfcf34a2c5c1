use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppResult;

type Predicate = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// How one field is tested.
#[derive(Clone)]
pub enum Matcher {
    /// Strict equality. A `null` literal places no constraint.
    Literal(Value),
    /// Field equals any of the values.
    OneOf(Vec<Value>),
    /// Case-insensitive substring of the field's text form.
    Contains(String),
    /// Strict equality, including against `null`.
    Equals(Value),
    /// Called with the field value and the whole record.
    Predicate(Predicate),
}

impl Matcher {
    fn matches(&self, value: &Value, record: &Value) -> bool {
        match self {
            Matcher::Literal(Value::Null) => true,
            Matcher::Literal(expected) | Matcher::Equals(expected) => value == expected,
            Matcher::OneOf(options) => options.contains(value),
            Matcher::Contains(needle) => text_of(value)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Matcher::Predicate(predicate) => predicate(value, record),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Matcher::OneOf(v) => f.debug_tuple("OneOf").field(v).finish(),
            Matcher::Contains(v) => f.debug_tuple("Contains").field(v).finish(),
            Matcher::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Text form used by `contains`: strings as-is, arrays comma-joined, null empty.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Field constraints combined with logical AND.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    clauses: Vec<(String, Matcher)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn with(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.clauses.push((field.into(), matcher));
        self
    }

    /// Field equals `value`; values serializing to `null` are ignored.
    pub fn eq(self, field: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.with(field, Matcher::Literal(value))
    }

    /// Adds an equality clause only when `value` is present.
    pub fn maybe_eq<V: Serialize>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn one_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        let values = values
            .into_iter()
            .filter_map(|v| serde_json::to_value(v).ok())
            .collect();
        self.with(field, Matcher::OneOf(values))
    }

    pub fn contains(self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.with(field, Matcher::Contains(needle.into()))
    }

    pub fn equals(self, field: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.with(field, Matcher::Equals(value))
    }

    pub fn predicate<F>(self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.with(field, Matcher::Predicate(Arc::new(predicate)))
    }

    /// Tests a record already converted to JSON. Missing fields read as `null`.
    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|(field, matcher)| {
            let value = record.get(field).unwrap_or(&Value::Null);
            matcher.matches(value, record)
        })
    }
}

/// Sort and page settings for list-style queries.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub order: Option<String>,
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn as_timestamp(value: &Value) -> Option<i64> {
    let s = value.as_str()?.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Nulls first, then dates, then numbers, then plain string order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a, b) {
        (Value::Null, _) => return Ordering::Less,
        (_, Value::Null) => return Ordering::Greater,
        _ => {}
    }

    if let (Some(left), Some(right)) = (as_timestamp(a), as_timestamp(b)) {
        return left.cmp(&right);
    }

    if let (Some(left), Some(right)) = (a.as_f64(), b.as_f64()) {
        return left.partial_cmp(&right).unwrap_or(Ordering::Equal);
    }

    text_of(a).cmp(&text_of(b))
}

/// Sorts by `order` (or `fallback` when unset), `-field` meaning descending.
/// Ties keep their stored order.
pub fn sort_records<T: Serialize>(records: Vec<T>, order: Option<&str>, fallback: &str) -> AppResult<Vec<T>> {
    let order = order.map(str::trim).filter(|o| !o.is_empty()).unwrap_or(fallback);
    if order.is_empty() {
        return Ok(records);
    }

    let (field, descending) = match order.strip_prefix('-') {
        Some(field) => (field, true),
        None => (order, false),
    };

    let mut keyed = records
        .into_iter()
        .map(|record| {
            let json = serde_json::to_value(&record)?;
            let key = json.get(field).cloned().unwrap_or(Value::Null);
            Ok((key, record))
        })
        .collect::<AppResult<Vec<_>>>()?;

    keyed.sort_by(|(left, _), (right, _)| {
        let ordering = compare_values(left, right);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nulls_sort_first() {
        assert_eq!(compare_values(&Value::Null, &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_dates_compare_chronologically() {
        assert_eq!(
            compare_values(&json!("2024-01-02"), &json!("2024-01-01T23:00:00Z")),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&json!("2024-01-10T00:00:00Z"), &json!("2024-01-09T00:00:00+03:00")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(10), &json!(9)), Ordering::Greater);
        assert_eq!(compare_values(&json!(2.5), &json!(2.25)), Ordering::Greater);
    }

    #[test]
    fn test_strings_compare_lexically() {
        assert_eq!(compare_values(&json!("alta"), &json!("baixa")), Ordering::Less);
    }

    #[test]
    fn test_sort_descending_by_created_at() {
        let records = vec![
            json!({"id": "older", "created_at": "2024-01-01"}),
            json!({"id": "newer", "created_at": "2024-01-02"}),
        ];

        let sorted = sort_records(records, Some("-created_at"), "").unwrap();

        assert_eq!(sorted[0]["id"], "newer");
        assert_eq!(sorted[1]["id"], "older");
    }

    #[test]
    fn test_sort_falls_back_to_default_order() {
        let records = vec![json!({"id": "b", "n": 2}), json!({"id": "a", "n": 1})];

        let sorted = sort_records(records, None, "n").unwrap();

        assert_eq!(sorted[0]["id"], "a");
    }

    #[test]
    fn test_sort_keeps_ties_in_stored_order() {
        let records = vec![
            json!({"id": "first", "n": 1}),
            json!({"id": "second", "n": 1}),
            json!({"id": "third", "n": 0}),
        ];

        let sorted = sort_records(records, Some("-n"), "").unwrap();

        let ids: Vec<_> = sorted.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_criteria_literal_and_null() {
        let record = json!({"category": "fiscal", "importance": "alta"});

        assert!(Criteria::new().eq("category", "fiscal").matches(&record));
        assert!(!Criteria::new().eq("category", "contabil").matches(&record));
        assert!(Criteria::new().eq("category", Value::Null).matches(&record));
        assert!(Criteria::new()
            .maybe_eq::<&str>("category", None)
            .matches(&record));
    }

    #[test]
    fn test_criteria_membership() {
        let record = json!({"importance": "media"});

        assert!(Criteria::new()
            .one_of("importance", ["alta", "media"])
            .matches(&record));
        assert!(!Criteria::new()
            .one_of("importance", ["alta"])
            .matches(&record));
    }

    #[test]
    fn test_criteria_contains_is_case_insensitive() {
        let record = json!({"title": "Receita Federal publica IN", "tags": ["perse", "IRPJ"]});

        assert!(Criteria::new().contains("title", "receita").matches(&record));
        assert!(Criteria::new().contains("tags", "irpj").matches(&record));
        assert!(!Criteria::new().contains("summary", "receita").matches(&record));
    }

    #[test]
    fn test_criteria_equals_matches_null() {
        let record = json!({"source_id": null});

        assert!(Criteria::new().equals("source_id", Value::Null).matches(&record));
        assert!(!Criteria::new().equals("source_id", "x").matches(&record));
    }

    #[test]
    fn test_criteria_predicate_sees_whole_record() {
        let record = json!({"importance": "alta", "is_highlighted": true});
        let criteria = Criteria::new().predicate("importance", |value, record| {
            value == "alta" && record["is_highlighted"] == true
        });

        assert!(criteria.matches(&record));
    }

    #[test]
    fn test_criteria_all_clauses_must_match() {
        let record = json!({"category": "fiscal", "importance": "baixa"});
        let criteria = Criteria::new()
            .eq("category", "fiscal")
            .eq("importance", "alta");

        assert!(!criteria.matches(&record));
    }
}
