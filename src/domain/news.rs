use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{dedup_strings, Record, RecordMeta};
use super::taxonomy::{Category, Importance};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct News {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: Category,
    pub importance: Importance,
    /// Set-like: normalized to unique, non-blank entries.
    pub tags: Vec<String>,
    pub source_name: String,
    pub source_id: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub external_url: Option<String>,
    pub is_highlighted: bool,
}

impl News {
    pub fn new(title: impl Into<String>, category: Category, importance: Importance) -> Self {
        Self {
            title: title.into(),
            category,
            importance,
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source(mut self, source_name: impl Into<String>, source_id: Option<String>) -> Self {
        self.source_name = source_name.into();
        self.source_id = source_id;
        self
    }

    pub fn with_publication_date(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = Some(url.into());
        self
    }
}

impl Record for News {
    const COLLECTION: &'static str = "news";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn normalize(&mut self) {
        if self.publication_date.is_none() {
            self.publication_date = self.meta.created_at.map(|at| at.date_naive());
        }
        dedup_strings(&mut self.tags);
        if self.external_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            self.external_url = None;
        }
    }

    fn defaults() -> Vec<Self> {
        vec![
            News {
                meta: RecordMeta::seeded("news_local_launch", "2025-01-15"),
                title: "Contábil News agora funciona offline".to_string(),
                summary: "O projeto foi adaptado para rodar em modo local, permitindo customizações livres.".to_string(),
                content: "Com a nova camada de armazenamento local, você pode testar fluxos e experimentar \
                          estratégias de curadoria sem depender de um backend. Os dados podem ser redefinidos \
                          a qualquer momento."
                    .to_string(),
                category: Category::Contabil,
                importance: Importance::Media,
                tags: vec!["contabil".into(), "produto".into(), "release".into()],
                source_name: "Equipe Contábil News".to_string(),
                source_id: None,
                publication_date: NaiveDate::from_ymd_opt(2025, 1, 15),
                external_url: Some("https://contabil-news.local/noticia/offline".to_string()),
                is_highlighted: true,
            },
            News {
                meta: RecordMeta::seeded("news_perse_2025", "2025-01-12"),
                title: "Receita Federal publica novas orientações do PERSE".to_string(),
                summary: "Instrução Normativa consolida procedimentos para adesão ao PERSE em 2025.".to_string(),
                content: "A Receita Federal atualizou o manual do PERSE com prazos revisados para comprovação \
                          de CNAE. Escritórios contábeis devem orientar clientes sobre o envio até o último dia \
                          útil de março."
                    .to_string(),
                category: Category::Tributaria,
                importance: Importance::Alta,
                tags: vec!["tributaria".into(), "perse".into(), "receita federal".into()],
                source_name: "Receita Federal".to_string(),
                source_id: Some("source_receita".to_string()),
                publication_date: NaiveDate::from_ymd_opt(2025, 1, 12),
                external_url: Some("https://www.gov.br/receitafederal/pt-br/perse".to_string()),
                is_highlighted: true,
            },
            News {
                meta: RecordMeta::seeded("news_esocial", "2025-01-08"),
                title: "eSocial simplifica eventos de SST para pequenas empresas".to_string(),
                summary: "Nova versão do layout dispensa envio de eventos duplicados para o Simples Nacional.".to_string(),
                content: "A nota técnica 08/2024 do eSocial começa a valer em fevereiro e inclui checagens de \
                          consistência para afastamentos sem CAT e pendências de ASO."
                    .to_string(),
                category: Category::FolhaPagamento,
                importance: Importance::Media,
                tags: vec!["folha_pagamento".into(), "esocial".into(), "sst".into()],
                source_name: "Portal eSocial".to_string(),
                source_id: None,
                publication_date: NaiveDate::from_ymd_opt(2025, 1, 8),
                external_url: Some("https://www.gov.br/esocial".to_string()),
                is_highlighted: false,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_normalize_defaults_publication_date_to_creation_day() {
        let mut news = News::new("Prazo da DCTFWeb", Category::Fiscal, Importance::Alta);
        news.meta.created_at = Some(Utc.with_ymd_and_hms(2025, 3, 4, 22, 10, 0).unwrap());

        news.normalize();

        assert_eq!(news.publication_date, NaiveDate::from_ymd_opt(2025, 3, 4));
    }

    #[test]
    fn test_normalize_keeps_explicit_publication_date() {
        let mut news = News::new("x", Category::Fiscal, Importance::Alta)
            .with_publication_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        news.meta.created_at = Some(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());

        news.normalize();

        assert_eq!(news.publication_date, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let news: News = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "title": "Somente título"
        }))
        .unwrap();

        assert_eq!(news.meta.id, "n1");
        assert_eq!(news.category, Category::Contabil);
        assert_eq!(news.importance, Importance::Media);
        assert!(news.tags.is_empty());
    }

    #[test]
    fn test_defaults_have_unique_ids() {
        let defaults = News::defaults();
        let mut ids: Vec<_> = defaults.iter().map(|n| n.id().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), defaults.len());
    }
}
