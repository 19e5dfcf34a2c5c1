use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Contabil,
    Fiscal,
    FolhaPagamento,
    Tributaria,
    ReformaTributaria,
    Ifrs,
    Usgaap,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Contabil,
        Category::Fiscal,
        Category::FolhaPagamento,
        Category::Tributaria,
        Category::ReformaTributaria,
        Category::Ifrs,
        Category::Usgaap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Contabil => "contabil",
            Category::Fiscal => "fiscal",
            Category::FolhaPagamento => "folha_pagamento",
            Category::Tributaria => "tributaria",
            Category::ReformaTributaria => "reforma_tributaria",
            Category::Ifrs => "ifrs",
            Category::Usgaap => "usgaap",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// News importance. Variant order is significant: `Baixa < Media < Alta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Baixa,
    #[default]
    Media,
    Alta,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Baixa => "baixa",
            Importance::Media => "media",
            Importance::Alta => "alta",
        }
    }
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixa" => Ok(Importance::Baixa),
            "media" | "média" => Ok(Importance::Media),
            "alta" => Ok(Importance::Alta),
            _ => Err(format!("Unknown importance: {}", s)),
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category filter on a delivery channel: `geral` lets every category through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("geral") {
            return Ok(CategoryFilter::All);
        }
        trimmed.parse().map(CategoryFilter::Only)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        match filter {
            CategoryFilter::All => "geral".to_string(),
            CategoryFilter::Only(category) => category.as_str().to_string(),
        }
    }
}
