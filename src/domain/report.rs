use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel::Channel;
use super::news::News;
use super::source::Source;
use super::taxonomy::{Category, Importance};

/// Outcome of a news pull, local or remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchReport {
    pub success: bool,
    pub created_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub rejected_count: usize,
    pub created_news: Vec<News>,
    /// Set when the news was synthesized locally instead of fetched.
    pub demo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateCheckStatus {
    Correct,
    Incorrect,
    UnableToVerify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateCheck {
    pub title: String,
    pub status: DateCheckStatus,
    pub saved_date: Option<NaiveDate>,
    pub found_date: Option<NaiveDate>,
    pub difference_days: Option<i64>,
    #[serde(default)]
    pub confidence: Option<String>,
    pub message: String,
    #[serde(default)]
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateVerificationReport {
    pub total_verified: usize,
    pub correct_dates: usize,
    pub incorrect_dates: usize,
    pub unable_to_verify: usize,
    pub accuracy_percentage: u32,
    pub recommendation: String,
    pub results: Vec<DateCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearReport {
    pub success: bool,
    pub deleted_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetReport {
    pub success: bool,
    pub message: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPreview {
    pub channel: Channel,
    pub title: String,
    pub publication_date: Option<NaiveDate>,
    pub importance: Importance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageVerdict {
    pub approved: bool,
    pub reason: String,
}

/// Result of pushing one news item to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub preview: Option<SendPreview>,
    #[serde(default, alias = "aiAnalysis")]
    pub ai_analysis: Option<TriageVerdict>,
    #[serde(default)]
    pub demo: bool,
    /// Whatever else the backend returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceAnalysis {
    pub creates_new_obligation: bool,
    pub urgent_deadline: bool,
    pub universal_impact: bool,
    pub changes_mandatory_rule: bool,
    pub only_informative: bool,
}

impl ImportanceAnalysis {
    /// Any obligation-type flag makes news `alta`; purely informative news is
    /// `baixa`; everything else is `media`.
    pub fn importance(&self) -> Importance {
        if self.creates_new_obligation || self.urgent_deadline || self.universal_impact || self.changes_mandatory_rule
        {
            Importance::Alta
        } else if self.only_informative {
            Importance::Baixa
        } else {
            Importance::Media
        }
    }
}

/// Unsaved news text produced by the generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsDraft {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: Category,
    pub importance: Importance,
    /// When present, decides `importance` over the generator's own label.
    pub importance_analysis: Option<ImportanceAnalysis>,
    pub tags: Vec<String>,
    pub is_highlighted: bool,
    pub publication_date: Option<NaiveDate>,
    pub demo: bool,
}
