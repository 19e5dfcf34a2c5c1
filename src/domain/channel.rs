use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::news::News;
use super::record::{dedup_strings, Record, RecordMeta};
use super::taxonomy::{CategoryFilter, Importance};

/// Delivery channels news can be pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Telegram,
    WhatsApp,
    Teams,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Telegram, Channel::WhatsApp, Channel::Teams, Channel::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Telegram => "telegram",
            Channel::WhatsApp => "whatsapp",
            Channel::Teams => "teams",
            Channel::Email => "email",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "telegram" => Ok(Channel::Telegram),
            "whatsapp" => Ok(Channel::WhatsApp),
            "teams" => Ok(Channel::Teams),
            "email" | "e-mail" => Ok(Channel::Email),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common view over the per-channel delivery settings.
pub trait ChannelConfig: Record {
    const CHANNEL: Channel;

    fn is_active(&self) -> bool;

    fn sends_automatically(&self) -> bool;

    fn category(&self) -> CategoryFilter;

    fn min_importance(&self) -> Importance;

    /// Human-readable destination, used in demo responses and CLI output.
    fn target_label(&self) -> String;

    /// Active, important enough, and in the configured category.
    fn accepts(&self, news: &News) -> bool {
        self.is_active() && news.importance >= self.min_importance() && self.category().matches(news.category)
    }
}

fn first_non_empty(candidates: &[&str], fallback: &str) -> String {
    candidates
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub bot_token: String,
    pub channel_id: String,
    pub message_thread_id: String,
    pub channel_name: String,
    pub category: CategoryFilter,
    pub min_importance: Importance,
    pub is_active: bool,
    pub send_automatically: bool,
    pub summary_footer: String,
    pub use_ai_triage: bool,
}

impl Record for TelegramConfig {
    const COLLECTION: &'static str = "telegramConfigs";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        self.bot_token = self.bot_token.trim().to_string();
        self.channel_id = self.channel_id.trim().to_string();
        self.message_thread_id = self.message_thread_id.trim().to_string();
    }

    fn defaults() -> Vec<Self> {
        vec![TelegramConfig {
            meta: RecordMeta::seeded("telegram_default", "2025-01-11"),
            bot_token: "000000:LOCAL-SAMPLE-TOKEN".to_string(),
            channel_id: "@contabil_news_demo".to_string(),
            message_thread_id: String::new(),
            channel_name: "Contábil News · Telegram".to_string(),
            category: CategoryFilter::All,
            min_importance: Importance::Media,
            is_active: true,
            send_automatically: false,
            summary_footer: "Mensagem enviada do ambiente local Contábil News.".to_string(),
            use_ai_triage: false,
        }]
    }
}

impl ChannelConfig for TelegramConfig {
    const CHANNEL: Channel = Channel::Telegram;

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn sends_automatically(&self) -> bool {
        self.send_automatically
    }

    fn category(&self) -> CategoryFilter {
        self.category
    }

    fn min_importance(&self) -> Importance {
        self.min_importance
    }

    fn target_label(&self) -> String {
        first_non_empty(&[self.channel_name.as_str(), self.channel_id.as_str()], "canal sem nome")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub account_name: String,
    pub target_number: String,
    pub category: CategoryFilter,
    pub min_importance: Importance,
    pub is_active: bool,
    pub send_automatically: bool,
    pub summary_footer: String,
}

impl Record for WhatsAppConfig {
    const COLLECTION: &'static str = "whatsappConfigs";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        self.target_number = self.target_number.trim().to_string();
    }

    fn defaults() -> Vec<Self> {
        vec![WhatsAppConfig {
            meta: RecordMeta::seeded("whatsapp_default", "2025-01-11"),
            account_name: "Contábil Bot".to_string(),
            target_number: "+55 11 90000-0000".to_string(),
            category: CategoryFilter::All,
            min_importance: Importance::Media,
            is_active: false,
            send_automatically: false,
            summary_footer: String::new(),
        }]
    }
}

impl ChannelConfig for WhatsAppConfig {
    const CHANNEL: Channel = Channel::WhatsApp;

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn sends_automatically(&self) -> bool {
        self.send_automatically
    }

    fn category(&self) -> CategoryFilter {
        self.category
    }

    fn min_importance(&self) -> Importance {
        self.min_importance
    }

    fn target_label(&self) -> String {
        first_non_empty(&[self.target_number.as_str(), self.account_name.as_str()], "destinatário")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub team_name: String,
    pub webhook_url: String,
    pub category: CategoryFilter,
    pub min_importance: Importance,
    pub mention_users: Vec<String>,
    pub is_active: bool,
}

impl Record for TeamsConfig {
    const COLLECTION: &'static str = "teamsConfigs";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        self.webhook_url = self.webhook_url.trim().to_string();
        dedup_strings(&mut self.mention_users);
    }

    fn defaults() -> Vec<Self> {
        vec![TeamsConfig {
            meta: RecordMeta::seeded("teams_default", "2025-01-11"),
            team_name: "Canal Fiscal".to_string(),
            webhook_url: "https://contabil-news.local/webhook/teams".to_string(),
            category: CategoryFilter::All,
            min_importance: Importance::Media,
            mention_users: vec!["tributos@empresa.com.br".to_string()],
            is_active: false,
        }]
    }
}

impl ChannelConfig for TeamsConfig {
    const CHANNEL: Channel = Channel::Teams;

    fn is_active(&self) -> bool {
        self.is_active
    }

    // Teams delivery is always operator-triggered.
    fn sends_automatically(&self) -> bool {
        false
    }

    fn category(&self) -> CategoryFilter {
        self.category
    }

    fn min_importance(&self) -> Importance {
        self.min_importance
    }

    fn target_label(&self) -> String {
        first_non_empty(&[self.team_name.as_str(), self.webhook_url.as_str()], "canal Teams")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub list_name: String,
    pub to_addresses: Vec<String>,
    pub cc_addresses: Vec<String>,
    pub bcc_addresses: Vec<String>,
    pub category: CategoryFilter,
    pub min_importance: Importance,
    pub is_active: bool,
    pub send_automatically: bool,
}

impl Record for EmailConfig {
    const COLLECTION: &'static str = "emailConfigs";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        dedup_strings(&mut self.to_addresses);
        dedup_strings(&mut self.cc_addresses);
        dedup_strings(&mut self.bcc_addresses);
    }

    fn defaults() -> Vec<Self> {
        vec![EmailConfig {
            meta: RecordMeta::seeded("email_default", "2025-01-11"),
            list_name: "Contabilidade Interna".to_string(),
            to_addresses: vec!["financeiro@empresa.com.br".to_string()],
            cc_addresses: Vec::new(),
            bcc_addresses: Vec::new(),
            category: CategoryFilter::All,
            min_importance: Importance::Media,
            is_active: true,
            send_automatically: false,
        }]
    }
}

impl ChannelConfig for EmailConfig {
    const CHANNEL: Channel = Channel::Email;

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn sends_automatically(&self) -> bool {
        self.send_automatically
    }

    fn category(&self) -> CategoryFilter {
        self.category
    }

    fn min_importance(&self) -> Importance {
        self.min_importance
    }

    fn target_label(&self) -> String {
        if self.to_addresses.is_empty() {
            "lista de emails".to_string()
        } else {
            self.to_addresses.join(", ")
        }
    }
}
