// src/notify/mod.rs
pub mod console;
pub mod format;
pub mod telegram;

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{NotifierConfig, NotifierKind};
use crate::error::DeliveryError;

pub use console::ConsoleSink;
pub use format::MessageFormatter;
pub use telegram::TelegramSink;

/// A rendered notification ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sink markup (Telegram HTML subset).
    pub text: String,
    /// Plain title, used for logs only.
    pub title: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, msg: &OutgoingMessage) -> Result<(), DeliveryError>;

    /// Connectivity check. Sinks without one report success.
    async fn probe(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Sends one message at a time, spaced by at least `min_interval`.
///
/// Failed sends count towards the spacing too. Nothing is retried here; an
/// undelivered article is simply not marked and comes back next run.
pub struct NotificationDispatcher {
    sink: Box<dyn NotificationSink>,
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Box<dyn NotificationSink>, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            last_sent: Mutex::new(None),
        }
    }

    /// Build the configured sink. An unconfigured Telegram sink degrades to
    /// the console so the pipeline still runs without credentials.
    pub fn from_config(cfg: &NotifierConfig) -> Result<Self, DeliveryError> {
        let sink: Box<dyn NotificationSink> = match cfg.kind {
            NotifierKind::Console => Box::new(ConsoleSink::new()),
            NotifierKind::Telegram if cfg.telegram.is_configured() => {
                Box::new(TelegramSink::from_config(&cfg.telegram)?)
            }
            NotifierKind::Telegram => {
                tracing::warn!(
                    "telegram not configured (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID), using console sink"
                );
                Box::new(ConsoleSink::new())
            }
        };
        Ok(Self::new(sink, Duration::from_millis(cfg.min_interval_ms)))
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    pub async fn probe(&self) -> Result<(), DeliveryError> {
        self.sink.probe().await
    }

    pub async fn send(&self, msg: &OutgoingMessage) -> Result<(), DeliveryError> {
        // Held across the send: sends never overlap.
        let mut last = self.last_sent.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        let res = self.sink.send(msg).await;
        *last = Some(Instant::now());

        match &res {
            Ok(()) => {
                counter!("monitor_notifications_sent_total").increment(1);
                tracing::info!(sink = self.sink.name(), title = %short(&msg.title), "notification sent");
            }
            Err(e) => {
                counter!("monitor_notifications_failed_total").increment(1);
                tracing::warn!(sink = self.sink.name(), error = %e, title = %short(&msg.title), "notification failed");
            }
        }
        res
    }
}

/// Titles in logs are cut to keep lines short.
pub(crate) fn short(s: &str) -> String {
    crate::normalize::cap_chars(s, 50)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use std::sync::atomic::Ordering;

    fn msg(t: &str) -> OutgoingMessage {
        OutgoingMessage {
            text: t.into(),
            title: t.into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_sends_are_spaced() {
        let sink = RecordingSink::default();
        let d = NotificationDispatcher::new(Box::new(sink.clone()), Duration::from_millis(1000));
        d.send(&msg("a")).await.unwrap();
        d.send(&msg("b")).await.unwrap();
        d.send(&msg("c")).await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        for w in sent.windows(2) {
            assert!(w[1].0 - w[0].0 >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_still_counts_for_spacing_and_is_not_retried() {
        let sink = RecordingSink::default();
        sink.fail.store(true, Ordering::SeqCst);
        let d = NotificationDispatcher::new(Box::new(sink.clone()), Duration::from_millis(500));

        let start = Instant::now();
        assert!(d.send(&msg("a")).await.is_err());
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);

        sink.fail.store(false, Ordering::SeqCst);
        d.send(&msg("b")).await.unwrap();
        assert!(Instant::now() - start >= Duration::from_millis(500));
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unconfigured_telegram_falls_back_to_console() {
        let mut cfg = NotifierConfig::default();
        cfg.telegram.bot_token = String::new();
        cfg.telegram.chat_id = String::new();
        let d = NotificationDispatcher::from_config(&cfg).unwrap();
        assert_eq!(d.sink_name(), "console");
        assert!(d.probe().await.is_ok());
    }
}
