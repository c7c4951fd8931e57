//! Channel senders.
//!
//! The worker hands each rendered message to the [`ChannelSender`]
//! registered for its channel. Provider integrations (SMTP, SMS gateway,
//! push service) plug in here. Out of the box e-mail, SMS and push are only
//! logged, and their notifications are flagged `simulated`; webhooks are
//! POSTed for real.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use marches_core::ServiceError;

use crate::context::{AlertContext, ContextError};
use crate::model::Channel;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no sender configured for channel {0}")]
    NoSender(Channel),

    #[error("no recipient configured for channel {0}")]
    NoRecipient(Channel),

    #[error("template: {0}")]
    Template(#[from] ContextError),

    #[error("transport: {0}")]
    Transport(String),

    #[error("rejected by provider: {0}")]
    Rejected(String),
}

/// A message ready for one channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub channel: Channel,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub alerte_code: String,
    pub event_code: String,
    pub context: AlertContext,
}

/// Delivers messages on one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), DeliveryError>;

    /// True when nothing actually leaves the process.
    fn simulated(&self) -> bool {
        false
    }
}

/// Writes the message to the log and reports success. Nothing reaches the
/// recipient.
pub struct LogSender;

#[async_trait]
impl ChannelSender for LogSender {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), DeliveryError> {
        info!(
            channel = %msg.channel,
            recipient = %msg.recipient,
            alerte = %msg.alerte_code,
            "notification: {}",
            msg.body
        );
        Ok(())
    }

    fn simulated(&self) -> bool {
        true
    }
}

/// POSTs the message as JSON to the recipient URL. Non-2xx is a rejection.
pub struct WebhookSender {
    http: reqwest::Client,
}

impl WebhookSender {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("webhook client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), DeliveryError> {
        let resp = self
            .http
            .post(&msg.recipient)
            .json(msg)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected(format!("HTTP {status}")));
        }
        Ok(())
    }
}

/// Channel → sender lookup used by the worker.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging senders for e-mail, SMS and push; HTTP for webhooks.
    ///
    /// Only webhooks are really delivered. Register provider senders over
    /// the other channels for production use.
    pub fn with_defaults(webhook_timeout: Duration) -> Result<Self, ServiceError> {
        let log: Arc<dyn ChannelSender> = Arc::new(LogSender);
        Ok(Self::new()
            .register(Channel::Email, log.clone())
            .register(Channel::Sms, log.clone())
            .register(Channel::Push, log)
            .register(Channel::Webhook, Arc::new(WebhookSender::new(webhook_timeout)?)))
    }

    pub fn register(mut self, channel: Channel, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelSender>> {
        self.senders.get(&channel)
    }

    /// Channels whose registered sender only simulates delivery.
    pub fn simulated_channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some_and(|s| s.simulated()))
            .collect()
    }
}
