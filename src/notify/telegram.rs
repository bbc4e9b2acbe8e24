//! Telegram delivery — formats events as HTML and posts them via the Bot API.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use super::{NotifyEvent, NotifySink};
use crate::config::TelegramConfig;
use crate::error::{BotError, Result};

pub struct TelegramNotifier {
    token: Option<String>,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.is_none() {
            warn!("telegram bot token not configured, notifications disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            token: config.bot_token.clone(),
            client,
        })
    }

    async fn send_message(&self, token: &str, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Notify(format!(
                "telegram API error for chat {chat_id}: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotifySink for TelegramNotifier {
    fn enabled(&self) -> bool {
        self.token.is_some()
    }

    async fn deliver(&self, channel_id: i64, event: &NotifyEvent) -> Result<()> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| BotError::Notify("bot token not configured".into()))?;
        let text = format_event(event);
        self.send_message(token, channel_id, &text).await
    }
}

fn store_url(app_id: i64) -> String {
    format!("https://store.steampowered.com/app/{app_id}")
}

/// Format an event into a Telegram alert message.
fn format_event(event: &NotifyEvent) -> String {
    match event {
        NotifyEvent::NewLow {
            app_id,
            name,
            region,
            price,
            previous_low,
            drop_percent,
            discount,
            currency,
        } => {
            let mut price_line = format!("💰 Now: <b>{currency} {price:.2}</b>");
            if *discount > 0 {
                price_line.push_str(&format!(" (-{discount}%)"));
            }
            format!(
                "🔥 <b>Historical Low!</b>\n\
                <b>{name}</b> just hit its lowest price ever in {region}\n\n\
                {price_line}\n\
                📊 Previous low: {currency} {previous_low:.2}\n\
                📉 Drop: {drop_percent:.1}%\n\n\
                {url}",
                url = store_url(*app_id),
            )
        }
        NotifyEvent::FreeGame { app_id, name } => format!(
            "🎁 <b>Free Game!</b>\n\
            <b>{name}</b> is free to keep right now\n\n\
            💡 Limited time — grab it while it lasts\n\
            {url}",
            url = store_url(*app_id),
        ),
        NotifyEvent::PromotionDue {
            name,
            emoji,
            starts_on,
            days_until,
            duration_days,
        } => {
            let when = match days_until {
                0 => "<b>starts today!</b>".to_string(),
                1 => "<b>starts tomorrow!</b>".to_string(),
                n => format!("starts in <b>{n} days</b>"),
            };
            format!(
                "{emoji} <b>Steam {name}</b> {when}\n\
                📅 {starts_on} — runs for {duration_days} days\n\
                💸 Get your wishlist ready!"
            )
        }
    }
}
