use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use marches_core::ServiceError;

use crate::context::AlertContext;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A notification delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
    Webhook,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Sms, Channel::Push, Channel::Webhook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::Webhook => "webhook",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "push" => Some(Self::Push),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertRule
// ---------------------------------------------------------------------------

/// Administrator-defined rule: which channels to notify for an alert code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    /// Unique code referenced by jobs, e.g. `"notif-marche"`.
    pub code: String,
    pub label: String,
    /// Enabled channels, in delivery order, without duplicates.
    pub channels: Vec<Channel>,
    /// Destination per channel: address, phone number, push topic or URL.
    #[serde(default)]
    pub recipients: BTreeMap<Channel, String>,
    /// Subject template (`{{key}}` placeholders). Defaults to the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Body template. Defaults to `"<label> (<eventCode>)"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Body for `POST /rules`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRule {
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub recipients: BTreeMap<Channel, String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Body for `PATCH /rules/{code}`. Absent fields are left untouched; an
/// empty `subject` or `template` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRule {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    #[serde(default)]
    pub recipients: Option<BTreeMap<Channel, String>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Drop repeated channels, keeping first occurrence order.
pub(crate) fn dedup_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let mut out = Vec::with_capacity(channels.len());
    for c in channels {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

pub(crate) fn validate_rule_fields(code: &str, label: &str) -> Result<(), ServiceError> {
    if code.trim().is_empty() {
        return Err(ServiceError::Validation("rule 'code' cannot be empty".into()));
    }
    if code.chars().any(char::is_whitespace) {
        return Err(ServiceError::Validation(format!(
            "rule code '{code}' cannot contain whitespace"
        )));
    }
    if label.trim().is_empty() {
        return Err(ServiceError::Validation("rule 'label' cannot be empty".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AlertJobPayload: what callers enqueue
// ---------------------------------------------------------------------------

/// A business event asking for an alert to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertJobPayload {
    /// The business event that fired, e.g. `"MARCHE_CREATED"`.
    pub event_code: String,
    /// The rule to apply.
    pub alerte_code: String,
    #[serde(default)]
    pub context: AlertContext,
    /// Target user for in-app (push) notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app_user_id: Option<String>,
}

impl AlertJobPayload {
    pub fn new(event_code: impl Into<String>, alerte_code: impl Into<String>) -> Self {
        Self {
            event_code: event_code.into(),
            alerte_code: alerte_code.into(),
            context: AlertContext::default(),
            in_app_user_id: None,
        }
    }

    pub fn with_context(mut self, context: AlertContext) -> Self {
        self.context = context;
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.in_app_user_id = Some(user_id.into());
        self
    }

    /// Caller-side checks, run before any I/O.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.event_code.trim().is_empty() {
            return Err(ServiceError::Validation("'eventCode' cannot be empty".into()));
        }
        if self.alerte_code.trim().is_empty() {
            return Err(ServiceError::Validation("'alerteCode' cannot be empty".into()));
        }
        if let Some(user) = &self.in_app_user_id {
            if user.trim().is_empty() {
                return Err(ServiceError::Validation(
                    "'inAppUserId' cannot be empty when present".into(),
                ));
            }
        }
        self.context
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// AlertJob: a payload once it sits in the queue
// ---------------------------------------------------------------------------

/// Lifecycle of a queued job.
///
/// ```text
/// WAITING → ACTIVE → COMPLETED
///                  → WAITING   (failed attempt, retries left)
///                  → FAILED    (no retries left)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(Self::Waiting),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertJob {
    pub id: String,
    pub queue: String,
    pub payload: AlertJobPayload,
    pub status: JobStatus,
    /// Failed attempts so far.
    #[serde(default)]
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Returned by enqueue: enough to find the job again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: String,
    pub queue: String,
}

/// Query parameters for `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Notification: append-only delivery log
// ---------------------------------------------------------------------------

/// One delivery attempt on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub alerte_code: String,
    pub event_code: String,
    pub channel: Channel,
    /// Empty when no recipient could be resolved.
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    /// Whether the provider accepted the message.
    pub envoyee: bool,
    /// Accepted by a logging sender only; nothing reached the recipient.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
}

/// Query parameters for `GET /notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub alerte_code: Option<String>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub envoyee: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}
