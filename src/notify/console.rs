// src/notify/console.rs
use async_trait::async_trait;

use super::{NotificationSink, OutgoingMessage};
use crate::error::DeliveryError;

/// Prints messages to stdout. Used when no real sink is configured.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn send(&self, msg: &OutgoingMessage) -> Result<(), DeliveryError> {
        tracing::debug!(title = %super::short(&msg.title), "console sink");
        println!("{}\n", msg.text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
