//! Locally synthesized content used when no backend route is configured.

use chrono::NaiveDate;
use rand::seq::SliceRandom;

use crate::domain::{
    Category, Channel, ChannelConfig, ImportanceAnalysis, Importance, News, NewsDraft, SendPreview, SendReceipt,
    TriageVerdict,
};
use crate::services::news_service::{FetchNewsParams, GenerateNewsParams};

/// Deadline and obligation topics are `alta`, events are `baixa`.
pub fn choose_importance(topic: &str) -> Importance {
    let topic = topic.to_lowercase();
    if ["prazo", "obrig", "perse"].iter().any(|k| topic.contains(k)) {
        Importance::Alta
    } else if ["evento", "congresso"].iter().any(|k| topic.contains(k)) {
        Importance::Baixa
    } else {
        Importance::Media
    }
}

/// Category, up to three topic words longer than four characters, and the
/// first word of the source name. Lowercase, no duplicates.
pub fn build_tags(category: Category, topic: &str, source_name: &str) -> Vec<String> {
    let mut tags = vec![category.as_str().to_string()];

    tags.extend(
        topic
            .split_whitespace()
            .filter(|word| word.chars().count() > 4)
            .take(3)
            .map(str::to_lowercase),
    );

    if let Some(first) = source_name.split_whitespace().next() {
        tags.push(first.to_lowercase());
    }

    let mut unique = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

pub fn default_topic(category: Category) -> String {
    format!("tendências recentes em {}", category)
}

/// One plausible news item for `params`, dated `today`.
pub fn demo_news(params: &FetchNewsParams, today: NaiveDate) -> News {
    let topic = params.topic.clone().unwrap_or_else(|| default_topic(params.category));
    let importance = choose_importance(&topic);
    let source_name = params.source_name.as_deref().unwrap_or_default();
    let origin = params
        .source_name
        .as_deref()
        .or(params.source_id.as_deref())
        .unwrap_or("local");

    let mut news = News::new(
        format!("{} destaca {}", params.source_name.as_deref().unwrap_or("Fonte"), topic),
        params.category,
        importance,
    )
    .with_summary(format!(
        "Resumo automático sobre {}, gerado a partir da fonte {}.",
        topic, origin
    ))
    .with_content(format!(
        "Esta notícia foi gerada localmente para representar uma importação via RSS. Ajuste livremente o \
         conteúdo, categoria e tags para refletir seu cenário real.\n\nFonte original: {}.",
        params.rss_feed_url.as_deref().unwrap_or("arquivo local")
    ))
    .with_tags(build_tags(params.category, &topic, source_name))
    .with_source(
        params.source_name.clone().unwrap_or_else(|| "Fonte Local".to_string()),
        params.source_id.clone(),
    )
    .with_publication_date(today);

    news.external_url = params.rss_feed_url.clone();
    news.is_highlighted = importance == Importance::Alta;
    news
}

/// Draft built from the topic alone, for when no generator is reachable.
pub fn local_draft(params: &GenerateNewsParams, today: NaiveDate) -> NewsDraft {
    let guess = choose_importance(&params.topic);
    let analysis = ImportanceAnalysis {
        creates_new_obligation: guess == Importance::Alta,
        urgent_deadline: guess == Importance::Alta,
        universal_impact: guess == Importance::Alta,
        changes_mandatory_rule: false,
        only_informative: guess == Importance::Baixa,
    };
    let importance = analysis.importance();
    let mut title: String = params.topic.clone();
    if let Some(first) = title.chars().next() {
        title.replace_range(..first.len_utf8(), &first.to_uppercase().to_string());
    }

    NewsDraft {
        title: format!("{} ({})", title, params.source_name),
        summary: format!(
            "Resumo automático sobre {}, criado para auxiliar nos testes locais da aplicação.",
            params.topic
        ),
        content: format!(
            "Esta notícia é um conteúdo gerado localmente para evitar dependências externas. Ajuste o texto \
             conforme necessário para o seu fluxo de trabalho.\n\nCategoria: {}.",
            params.category
        ),
        category: params.category,
        importance,
        importance_analysis: Some(analysis),
        tags: build_tags(params.category, &params.topic, &params.source_name),
        is_highlighted: importance == Importance::Alta,
        publication_date: Some(today),
        demo: true,
    }
}

fn triage_reason(channel: Channel) -> &'static str {
    match channel {
        Channel::Telegram => "Triagem local aprovada com base na importância e categoria.",
        Channel::WhatsApp => "Conteúdo classificado como relevante para o envio.",
        Channel::Teams => "Resumo local confirmou aderência ao canal.",
        Channel::Email => "Newsletter simulada aprovada com base na importância mínima.",
    }
}

/// Simulated successful delivery of `news` through `config`.
pub fn demo_receipt<C: ChannelConfig>(config: &C, news: &News, use_ai_triage: bool) -> SendReceipt {
    SendReceipt {
        success: true,
        message: format!("Mensagem simulada enviada para {}.", config.target_label()),
        preview: Some(SendPreview {
            channel: C::CHANNEL,
            title: news.title.clone(),
            publication_date: news.publication_date,
            importance: news.importance,
        }),
        ai_analysis: use_ai_triage.then(|| TriageVerdict {
            approved: true,
            reason: triage_reason(C::CHANNEL).to_string(),
        }),
        demo: true,
        remote: None,
    }
}

/// Up to `max` items taken from the front of `items`, in random order.
pub fn sample<T>(mut items: Vec<T>, max: usize) -> Vec<T> {
    items.truncate(max);
    items.shuffle(&mut rand::rng());
    items
}
