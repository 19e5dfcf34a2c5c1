use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::{Record, RecordMeta};

/// How news is pulled from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    Rss,
    #[default]
    Llm,
    Api,
}

impl UpdateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMethod::Rss => "rss",
            UpdateMethod::Llm => "llm",
            UpdateMethod::Api => "api",
        }
    }
}

impl FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rss" => Ok(UpdateMethod::Rss),
            "llm" => Ok(UpdateMethod::Llm),
            "api" => Ok(UpdateMethod::Api),
            _ => Err(format!("Unknown update method: {}", s)),
        }
    }
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityLevel {
    Baixa,
    #[default]
    Media,
    Alta,
}

impl CredibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredibilityLevel::Baixa => "baixa",
            CredibilityLevel::Media => "media",
            CredibilityLevel::Alta => "alta",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub description: String,
    pub website: String,
    pub logo_url: String,
    pub update_method: UpdateMethod,
    pub rss_feed_url: String,
    pub api_endpoint: String,
    pub is_active: bool,
    pub credibility_level: CredibilityLevel,
}

impl Source {
    pub fn new(name: impl Into<String>, update_method: UpdateMethod) -> Self {
        Self {
            name: name.into(),
            update_method,
            is_active: true,
            ..Self::default()
        }
    }

    pub fn with_rss_feed(mut self, url: impl Into<String>) -> Self {
        self.rss_feed_url = url.into();
        self
    }

    /// RSS URL when the source is RSS-driven and has one.
    pub fn rss_url(&self) -> Option<&str> {
        (self.update_method == UpdateMethod::Rss && !self.rss_feed_url.is_empty())
            .then_some(self.rss_feed_url.as_str())
    }
}

impl Record for Source {
    const COLLECTION: &'static str = "sources";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.website = self.website.trim().trim_end_matches('/').to_string();
        self.rss_feed_url = self.rss_feed_url.trim().to_string();
        self.api_endpoint = self.api_endpoint.trim().to_string();
    }

    fn defaults() -> Vec<Self> {
        vec![
            Source {
                meta: RecordMeta::seeded("source_receita", "2025-01-10"),
                name: "Receita Federal".to_string(),
                description: "Atualizações oficiais sobre legislação fiscal, tributos e obrigações acessórias."
                    .to_string(),
                website: "https://www.gov.br/receitafederal".to_string(),
                logo_url: String::new(),
                update_method: UpdateMethod::Rss,
                rss_feed_url: "https://www.gov.br/receitafederal/pt-br/assuntos/noticias/rss.xml".to_string(),
                api_endpoint: String::new(),
                is_active: true,
                credibility_level: CredibilityLevel::Alta,
            },
            Source {
                meta: RecordMeta::seeded("source_cfoc", "2025-01-09"),
                name: "CFC - Conselho Federal de Contabilidade".to_string(),
                description: "Comunicados e deliberações do Conselho Federal de Contabilidade.".to_string(),
                website: "https://cfc.org.br".to_string(),
                logo_url: String::new(),
                update_method: UpdateMethod::Llm,
                rss_feed_url: String::new(),
                api_endpoint: String::new(),
                is_active: true,
                credibility_level: CredibilityLevel::Alta,
            },
            Source {
                meta: RecordMeta::seeded("source_forum", "2025-01-07"),
                name: "Fórum Tributário Independente".to_string(),
                description: "Seleção manual de análises e opiniões sobre reforma tributária.".to_string(),
                website: String::new(),
                logo_url: String::new(),
                update_method: UpdateMethod::Llm,
                rss_feed_url: String::new(),
                api_endpoint: String::new(),
                is_active: false,
                credibility_level: CredibilityLevel::Media,
            },
        ]
    }
}
