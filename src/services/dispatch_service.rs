use std::sync::Arc;

use gateway::{Gateway, ResponseBody, Route};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::domain::{
    Channel, ChannelConfig, EmailConfig, News, Record, SendReceipt, TeamsConfig, TelegramConfig, WhatsAppConfig,
};
use crate::errors::{AppError, AppResult};
use crate::services::demo;
use crate::storage::{Collection, Database};

fn route_for(channel: Channel) -> Route {
    match channel {
        Channel::Telegram => Route::SendToTelegram,
        Channel::WhatsApp => Route::SendToWhatsApp,
        Channel::Teams => Route::SendToTeams,
        Channel::Email => Route::SendToEmail,
    }
}

/// Name of the config member in the request body, e.g. `telegramConfig`.
fn config_field(channel: Channel) -> &'static str {
    match channel {
        Channel::Telegram => "telegramConfig",
        Channel::WhatsApp => "whatsappConfig",
        Channel::Teams => "teamsConfig",
        Channel::Email => "emailConfig",
    }
}

/// Reads a backend send response. Known fields land in the receipt; the
/// whole body is kept in `remote`.
fn receipt_from(body: ResponseBody) -> SendReceipt {
    let fallback = |remote: Option<Value>| SendReceipt {
        success: true,
        message: "Mensagem enviada.".to_string(),
        preview: None,
        ai_analysis: None,
        demo: false,
        remote,
    };

    match body {
        ResponseBody::Empty => fallback(None),
        ResponseBody::Text(text) => fallback(Some(Value::String(text))),
        ResponseBody::Json(json) => match serde_json::from_value::<SendReceipt>(json.clone()) {
            Ok(mut receipt) => {
                receipt.demo = false;
                receipt.remote = Some(json);
                receipt
            }
            Err(_) => fallback(Some(json)),
        },
    }
}

/// Result of one automatic delivery.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub channel: Channel,
    pub config_id: String,
    pub target: String,
    pub result: AppResult<SendReceipt>,
}

/// Pushes news to the delivery channels.
pub struct DispatchService {
    gateway: Arc<Gateway>,
    telegram: Collection<TelegramConfig>,
    whatsapp: Collection<WhatsAppConfig>,
    teams: Collection<TeamsConfig>,
    email: Collection<EmailConfig>,
}

impl DispatchService {
    pub fn new(gateway: Arc<Gateway>, db: &Database) -> Self {
        Self {
            gateway,
            telegram: db.telegram_configs.clone(),
            whatsapp: db.whatsapp_configs.clone(),
            teams: db.teams_configs.clone(),
            email: db.email_configs.clone(),
        }
    }

    async fn send<C: ChannelConfig>(&self, news: &News, config: &C, use_ai_triage: bool) -> AppResult<SendReceipt> {
        let route = route_for(C::CHANNEL);
        if !self.gateway.is_route_configured(route) {
            return Ok(demo::demo_receipt(config, news, use_ai_triage));
        }

        let mut body = Map::new();
        body.insert("news".to_string(), serde_json::to_value(news)?);
        body.insert(config_field(C::CHANNEL).to_string(), serde_json::to_value(config)?);
        body.insert("useAiTriage".to_string(), Value::Bool(use_ai_triage));

        let response = self.gateway.post(route, &Value::Object(body)).await?;
        let receipt = receipt_from(response);
        info!(channel = %C::CHANNEL, news = news.id(), success = receipt.success, "sent news");
        Ok(receipt)
    }

    pub async fn send_to_telegram(
        &self,
        news: &News,
        config: &TelegramConfig,
        use_ai_triage: bool,
    ) -> AppResult<SendReceipt> {
        self.send(news, config, use_ai_triage).await
    }

    pub async fn send_to_whatsapp(
        &self,
        news: &News,
        config: &WhatsAppConfig,
        use_ai_triage: bool,
    ) -> AppResult<SendReceipt> {
        self.send(news, config, use_ai_triage).await
    }

    pub async fn send_to_teams(&self, news: &News, config: &TeamsConfig, use_ai_triage: bool) -> AppResult<SendReceipt> {
        self.send(news, config, use_ai_triage).await
    }

    pub async fn send_to_email(&self, news: &News, config: &EmailConfig, use_ai_triage: bool) -> AppResult<SendReceipt> {
        self.send(news, config, use_ai_triage).await
    }

    /// Sends through the config with `config_id`, or the newest active
    /// config of the channel when none is given.
    pub async fn send_to_channel(
        &self,
        channel: Channel,
        news: &News,
        config_id: Option<&str>,
    ) -> AppResult<SendReceipt> {
        match channel {
            Channel::Telegram => {
                let config = pick_config(&self.telegram, config_id).await?;
                let triage = config.use_ai_triage;
                self.send_to_telegram(news, &config, triage).await
            }
            Channel::WhatsApp => {
                let config = pick_config(&self.whatsapp, config_id).await?;
                self.send_to_whatsapp(news, &config, false).await
            }
            Channel::Teams => {
                let config = pick_config(&self.teams, config_id).await?;
                self.send_to_teams(news, &config, false).await
            }
            Channel::Email => {
                let config = pick_config(&self.email, config_id).await?;
                self.send_to_email(news, &config, false).await
            }
        }
    }

    /// Sends `news` to every active config that sends automatically and
    /// whose filters accept it. A failing channel does not stop the others.
    pub async fn dispatch_automatic(&self, news: &News) -> AppResult<Vec<DispatchOutcome>> {
        let mut outcomes = Vec::new();

        for config in automatic_configs(&self.telegram, news).await? {
            let result = self.send_to_telegram(news, &config, config.use_ai_triage).await;
            outcomes.push(outcome(&config, result));
        }
        for config in automatic_configs(&self.whatsapp, news).await? {
            let result = self.send_to_whatsapp(news, &config, false).await;
            outcomes.push(outcome(&config, result));
        }
        for config in automatic_configs(&self.teams, news).await? {
            let result = self.send_to_teams(news, &config, false).await;
            outcomes.push(outcome(&config, result));
        }
        for config in automatic_configs(&self.email, news).await? {
            let result = self.send_to_email(news, &config, false).await;
            outcomes.push(outcome(&config, result));
        }

        for failed in outcomes.iter().filter(|o| o.result.is_err()) {
            warn!(channel = %failed.channel, config = %failed.config_id, "automatic delivery failed");
        }
        Ok(outcomes)
    }
}

async fn pick_config<C: ChannelConfig>(configs: &Collection<C>, config_id: Option<&str>) -> AppResult<C> {
    match config_id {
        Some(id) => configs.get(id).await?.ok_or_else(|| AppError::NotFound {
            collection: C::COLLECTION,
            id: id.to_string(),
        }),
        None => configs
            .list(None, None)
            .await?
            .into_iter()
            .find(|config| config.is_active())
            .ok_or_else(|| AppError::InvalidInput(format!("no active {} configuration", C::CHANNEL))),
    }
}

async fn automatic_configs<C: ChannelConfig>(configs: &Collection<C>, news: &News) -> AppResult<Vec<C>> {
    Ok(configs
        .list(None, None)
        .await?
        .into_iter()
        .filter(|config| config.sends_automatically() && config.accepts(news))
        .collect())
}

fn outcome<C: ChannelConfig>(config: &C, result: AppResult<SendReceipt>) -> DispatchOutcome {
    DispatchOutcome {
        channel: C::CHANNEL,
        config_id: config.id().to_string(),
        target: config.target_label(),
        result,
    }
}
