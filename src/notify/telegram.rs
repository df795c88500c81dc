// src/notify/telegram.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{NotificationSink, OutgoingMessage};
use crate::config::TelegramConfig;
use crate::error::DeliveryError;

/// Telegram Bot API sink (`sendMessage`, HTML parse mode).
pub struct TelegramSink {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    disable_link_preview: bool,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramSink {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(DeliveryError::NotConfigured(
                "telegram bot token and chat id are required".into(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Http)?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            disable_link_preview: false,
        })
    }

    pub fn from_config(cfg: &TelegramConfig) -> Result<Self, DeliveryError> {
        Ok(Self::new(
            cfg.api_base.clone(),
            cfg.bot_token.clone(),
            cfg.chat_id.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )?
        .with_link_preview_disabled(cfg.disable_link_preview))
    }

    pub fn with_link_preview_disabled(mut self, disabled: bool) -> Self {
        self.disable_link_preview = disabled;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Map an API answer to Ok/Rejected. The URL (and with it the token) is
    /// stripped from transport errors before they reach logs.
    ///
    /// A 2xx whose body cannot be read counts as delivered: the message most
    /// likely went out, and a resend next run would duplicate it.
    async fn check(resp: reqwest::Response) -> Result<(), DeliveryError> {
        let status = resp.status();
        let body: Option<ApiResponse> = resp.json().await.ok();
        match body {
            Some(b) if status.is_success() && b.ok => Ok(()),
            None if status.is_success() => {
                tracing::warn!(status = status.as_u16(), "telegram answered without a readable body");
                Ok(())
            }
            other => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, msg: &OutgoingMessage) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &msg.text,
            parse_mode: "HTML",
            disable_web_page_preview: self.disable_link_preview,
        };
        let resp = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;
        Self::check(resp).await
    }

    async fn probe(&self) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .get(self.endpoint("getMe"))
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;
        Self::check(resp).await?;
        tracing::info!("telegram bot reachable");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
